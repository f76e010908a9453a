//! Typed Zoom REST client and a bounded-concurrency harness for running
//! integration suites against it.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod suites;

pub use error::ZoomError;
