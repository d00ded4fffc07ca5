pub mod slots;
pub mod booking;
