//! Core types and trait definitions for the CRM admin backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod email;
pub mod error;
pub mod events;
pub mod lead;
pub mod mail;
pub mod person;
pub mod pipeline;
pub mod store;
pub mod template;
pub mod workflow;

pub use error::{Error, Result};
