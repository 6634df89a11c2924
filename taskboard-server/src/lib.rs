//! Taskboard server library.
//!
//! Exposes the REST backend for use in tests and embedding. The server
//! owns the user accounts and every user's tasks, issues session tokens on
//! register / login, and scopes every task operation to the token's user.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;
