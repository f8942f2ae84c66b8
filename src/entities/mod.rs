pub mod booking;
pub mod message;
pub mod notification;
pub mod profile;
pub mod rating;
pub mod ride;
