pub mod auth;
pub mod breathe;
pub mod checkin;
pub mod config;
pub mod plan;
