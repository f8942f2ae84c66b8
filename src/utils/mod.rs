pub mod fare;
pub mod jwt;
