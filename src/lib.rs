//! El Oráculo IA: sports events cache and AI match predictions.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod odds;
pub mod storage;
pub mod types;
