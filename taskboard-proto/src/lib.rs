//! Shared wire types for the taskboard HTTP/JSON API.

pub mod auth;
pub mod error;
pub mod task;
