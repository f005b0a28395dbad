//! # Model Layer
//!
//! Persistent entities and the repositories that read and write them.

pub mod store;
