//! HTTP handlers.

pub mod activity;
pub mod check_in;
pub mod health;
pub mod purchases;
