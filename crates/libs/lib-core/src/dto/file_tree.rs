//! # File Tree
//!
//! A project's source files as an explicit recursive structure. The JSON form is
//! the one browser-side containers mount directly:
//!
//! ```json
//! {
//!   "index.js": { "file": { "contents": "console.log(1)" } },
//!   "src": { "directory": { "app.js": { "file": { "contents": "" } } } }
//! }
//! ```
//!
//! Trees have no size or depth bound. Every decode of a stored or submitted
//! tree goes through [`decode_unbounded`], which lifts serde_json's nesting
//! limit and grows the stack as it descends.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One entry of a [`FileTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileNode {
    #[serde(rename = "file")]
    File { contents: String },

    #[serde(rename = "directory")]
    Directory(FileTree),
}

impl FileNode {
    pub fn file(contents: impl Into<String>) -> Self {
        FileNode::File { contents: contents.into() }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileNode::Directory(_))
    }
}

/// Mapping from path-segment name to node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree(BTreeMap<String, FileNode>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileTreeError {
    #[error("File path cannot be empty")]
    EmptyPath,

    #[error("File not found: {0}")]
    NotFound(String),
}

/// Decode JSON without serde_json's default 128-level nesting limit.
pub fn decode_unbounded<T: DeserializeOwned>(raw: &[u8]) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_slice(raw);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        decode_unbounded(raw)
    }

    /// Builder-style insert, handy for literals.
    pub fn with(mut self, name: impl Into<String>, node: FileNode) -> Self {
        self.0.insert(name.into(), node);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, node: FileNode) -> Option<FileNode> {
        self.0.insert(name.into(), node)
    }

    pub fn get(&self, name: &str) -> Option<&FileNode> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileNode)> {
        self.0.iter()
    }

    /// Look up a node by `/`-separated path.
    pub fn lookup(&self, path: &str) -> Option<&FileNode> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;

        let mut current = self;
        for segment in parents {
            match current.0.get(*segment) {
                Some(FileNode::Directory(children)) => current = children,
                _ => return None,
            }
        }
        current.0.get(*last)
    }

    /// Remove the entry at a `/`-separated path and return it.
    ///
    /// Walks one directory per segment; a missing segment, or a file where a
    /// directory is needed, is `NotFound` and the tree is left untouched.
    /// Parents emptied by the removal stay in place.
    pub fn remove_path(&mut self, path: &str) -> Result<FileNode, FileTreeError> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last().ok_or(FileTreeError::EmptyPath)?;

        let mut current = self;
        for segment in parents {
            current = match current.0.get_mut(*segment) {
                Some(FileNode::Directory(children)) => children,
                _ => return Err(FileTreeError::NotFound(path.to_string())),
            };
        }

        current
            .0
            .remove(*last)
            .ok_or_else(|| FileTreeError::NotFound(path.to_string()))
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}
