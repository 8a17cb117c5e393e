//! API endpoint handlers, one module per route group.

pub mod health;
pub mod info;
pub mod predict;
pub mod qa;
