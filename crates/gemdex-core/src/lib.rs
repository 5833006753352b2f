//! Core types and trait definitions for the gemdex ingestion pipeline.
//!
//! This crate is free of HTTP and database dependencies.
//! Storage backends implement [`store::GemRepository`]; specification
//! sources implement [`source::SpecSource`].

pub mod cache;
pub mod error;
pub mod event;
pub mod model;
pub mod platform;
pub mod requirement;
pub mod retry;
pub mod signal;
pub mod source;
pub mod spec;
pub mod store;

pub use error::{Error, Result};
