pub mod catalog;
pub mod embed;
pub mod health;
pub mod schedule;
pub mod sessions;
