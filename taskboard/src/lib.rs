//! Taskboard client library.
//!
//! Talks to the taskboard server over HTTP, caches the signed-in user's
//! tasks, lays them out as a three-column board, and derives the filter
//! counts and the seven-day deadline chart from the cached set.

pub mod api;
pub mod board;
pub mod cli;
pub mod config;
pub mod filter;
pub mod notify;
pub mod render;
pub mod repo;
pub mod session;
pub mod stats;
