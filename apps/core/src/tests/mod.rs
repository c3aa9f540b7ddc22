//! Test Module
//!
//! Cross-module suites for the FAQ assistant.
//!
//! ## Test Categories
//! - `brain_tests`: lexicon, knowledge loading, intent classification
//! - `resolver_tests`: rule cascade and dialogue state transitions
//! - `similarity_properties`: property tests for the similarity scorer
//! - `database_tests`: interaction log, feedback and stats
//! - `supervisor_tests`: session actor pipeline with mock collaborators
//! - `config_tests`: environment configuration

pub mod resolver_tests;
pub mod supervisor_tests;
