pub mod baas;
