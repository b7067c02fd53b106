//! Core data models for the file storage service.
//!
//! These types describe stored files, their extracted metadata, and the
//! aggregate statistics surface. They serialize naturally as JSON via
//! `serde` and carry no behavior beyond small key helpers.

pub mod file;
pub mod metadata;
pub mod stats;
