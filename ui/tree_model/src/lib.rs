//! A small tree model contract for progress views, with an arena-backed
//! implementation and change notifications.

mod arena;
mod model;
mod path;

pub use arena::*;
pub use model::*;
pub use path::*;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("child index {index} is out of range for a node with {count} children")]
    ChildIndexOutOfRange { index: usize, count: usize },
    #[error("the empty path has no parent")]
    EmptyPath,
}
