//! # psd-scene
//!
//! Converts layered PSD documents into a renderer-facing scene graph.
//!
//! This crate re-exports the document model from [`psd_data`] and the
//! conversion engine from [`psd_scene_core`].

pub use psd_data as data;
pub use psd_scene_core as engine;

pub use psd_data::{DecodeError, DocumentDecoder, JsonDecoder, LayerNode};
pub use psd_scene_core::*;
