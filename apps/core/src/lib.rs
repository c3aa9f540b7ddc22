//! University FAQ assistant.
//!
//! `brain` resolves English-normalized utterances into responses; `actors`
//! wraps it with per-session state, translation and interaction logging.

pub mod actors;
pub mod brain;
pub mod config;
pub mod database;
pub mod error;
pub mod fs_manager;
pub mod models;
pub mod telemetry;

#[cfg(test)]
mod tests;
