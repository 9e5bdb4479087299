//! YouTube-specific helpers: URL classification and the metadata adapter.

pub mod metadata;
pub mod url;
