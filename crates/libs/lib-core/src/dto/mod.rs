//! # Data Transfer Objects (DTOs)
//!
//! Wire-level types shared by the WebSocket gateway and the HTTP surface.

pub mod events;
pub mod file_tree;
pub mod project;

pub use events::*;
pub use file_tree::{decode_unbounded, FileNode, FileTree, FileTreeError};
pub use project::*;
