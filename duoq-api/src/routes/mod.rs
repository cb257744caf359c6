pub mod auth;
pub mod health;
pub mod matches;
pub mod messages;
pub mod payments;
pub mod profiles;
