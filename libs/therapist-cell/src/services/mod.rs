pub mod therapist;
pub mod unavailability;
