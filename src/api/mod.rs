//! API module - REST handlers and response formatting

pub mod rest;
pub mod dto;
pub mod format;

pub use rest::{create_rest_router, AppState};
