pub mod artifacts;
pub mod health;
pub mod messages;
pub mod uploads;
