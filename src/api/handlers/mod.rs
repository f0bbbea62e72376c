//! API handlers for Gardi.

pub mod auth;
pub mod health;
