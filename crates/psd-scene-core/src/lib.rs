//! # PSD Scene Core
//!
//! `psd-scene-core` converts a layered document tree (decoded PSD layers) into a
//! renderer scene graph.
//!
//! It walks the document top-down and produces one scene node per layer. Each
//! node mirrors its properties into a display object created through a
//! pluggable [`DisplayBackend`].
//!
//! ## Core Features
//!
//! *   **Scene Arena**: Nodes live in a generational arena; `parent` and `mask` are non-owning ids.
//! *   **Bound Points**: Equality-gated observable positions that push straight into the display handle.
//! *   **Geometry Buffers**: Editable textured meshes, defaulting to one quad per raster layer.
//! *   **Blend Modes**: The full document blend-mode table, with lossy fallbacks to `normal`.
//! *   **Detached Textures**: Raster payloads decode on the `rayon` pool and attach when drained.
//! *   **Loading**: From bytes or from a URL via any [`ByteFetcher`] (a `reqwest` one is included).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use psd_data::JsonDecoder;
//! use psd_scene_core::{Document, RetainedBackend};
//!
//! let bytes = std::fs::read("layers.json").unwrap();
//! let mut doc = Document::from_buffer(&bytes, &JsonDecoder, RetainedBackend::new()).unwrap();
//! let root = doc.root();
//! doc.scene_mut().finish_textures();
//! println!("{} children", doc.scene().children(root).unwrap().len());
//! ```

/// Change-notifying value cells.
pub mod observable;

/// Two-component observable positions.
pub mod point;

/// Editable triangle meshes.
pub mod geometry;

/// Document to renderer blend-mode mapping.
pub mod blend;

/// The rendering framework seam.
pub mod display;

/// In-memory display backend.
pub mod retained;

/// Detached raster decoding.
pub mod texture;

pub mod config;
pub mod errors;
pub mod node;
pub mod scene;

mod builder;

/// Loading documents from bytes or URLs.
pub mod loader;

pub use blend::{map_blend_mode, DocumentBlendMode, RendererBlendMode};
pub use config::SceneConfig;
pub use display::{Color, DisplayBackend, TextStyleSpec};
pub use errors::{GeometryError, LoadError, SceneError};
pub use geometry::GeometryBuffer;
pub use loader::{ByteFetcher, Document, FetchResponse, ReqwestFetcher};
pub use node::{NodeBody, NodeId, NodeKind, SceneNode};
pub use observable::Observable;
pub use point::BoundPoint;
pub use retained::{DisplayHandle, DisplayKind, DisplayObject, RetainedBackend, RetainedTexture};
pub use scene::Scene;
pub use texture::{TextureError, TextureEvent, TextureState};
