use crate::node::NodeId;
use psd_data::DecodeError;
use thiserror::Error;

/// Misuse of a [`GeometryBuffer`](crate::geometry::GeometryBuffer).
///
/// Local to the buffer it came from; the buffer is left unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("triangle index {index} is not below vertex count {len}")]
    InvalidIndex { index: u32, len: usize },
    #[error("vertex {index} is out of range (vertex count {len})")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("node {0:?} has been destroyed")]
    NodeDestroyed(NodeId),
    #[error("node {0:?} is not paintable")]
    NotPaintable(NodeId),
    #[error("node {0:?} is not a group")]
    NotGroup(NodeId),
    #[error("mask {mask:?} is not a sibling of {node:?}")]
    MaskNotSibling { node: NodeId, mask: NodeId },
    #[error("moving {node:?} under {parent:?} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("node {0:?} cannot be retyped to {1}")]
    InvalidRetype(NodeId, &'static str),
    #[error("Recursion depth limit exceeded")]
    RecursionLimit,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Failure to load a [`Document`](crate::loader::Document).
///
/// Any of these aborts the whole load; no node is constructed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("response from {url} has no body")]
    EmptyBody { url: String },
    #[error(transparent)]
    Scene(#[from] SceneError),
}
