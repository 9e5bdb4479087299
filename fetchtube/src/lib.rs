//! fetchtube library crate.
//!
//! Exposes the service modules for integration testing.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod ledger;
pub mod utils;
pub mod youtube;

pub use error::{Error, Result};
