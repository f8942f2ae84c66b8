pub mod auth;
pub mod bookings;
pub mod fare;
pub mod messages;
pub mod notifications;
pub mod profiles;
pub mod ratings;
pub mod rides;
