//! # Display Backend
//!
//! The seam between the conversion engine and the rendering framework.
//!
//! The engine never draws. It creates display objects through a
//! [`DisplayBackend`], pushes node properties into them and wires them into a
//! tree that mirrors the scene. Handles are opaque to the engine; each scene
//! node owns exactly one and releases it when destroyed.

use crate::blend::RendererBlendMode;
use crate::geometry::GeometryBuffer;
use psd_data::{Rgba, TextStyle};
use std::fmt::Debug;
use std::hash::Hash;

/// Represents a RGBA color in float format (0.0 - 1.0).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        Self::new(c.r / 255.0, c.g / 255.0, c.b / 255.0, c.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Text style in renderer terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextStyleSpec {
    pub fill: Option<Color>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub stroke: Option<Color>,
}

impl From<&TextStyle> for TextStyleSpec {
    fn from(style: &TextStyle) -> Self {
        Self {
            fill: style.fill_color.map(Color::from),
            font_family: style.font.as_ref().map(|f| f.name.clone()),
            font_size: style.font_size,
            stroke: style.stroke_color.map(Color::from),
        }
    }
}

/// Capabilities the engine needs from a rendering framework.
///
/// All calls happen on the thread that owns the scene.
pub trait DisplayBackend {
    /// Handle to a display object owned by a scene node.
    type Handle: Copy + Eq + Hash + Debug + 'static;
    /// A texture that can be bound to a mesh.
    type Texture: Clone + 'static;

    fn create_container(&mut self) -> Self::Handle;
    fn create_mesh(&mut self, geometry: &GeometryBuffer, texture: Self::Texture) -> Self::Handle;
    fn create_text(&mut self, text: &str, style: &TextStyleSpec) -> Self::Handle;

    /// Labels are optional in most frameworks; the default ignores them.
    fn set_label(&mut self, _handle: Self::Handle, _label: &str) {}

    fn set_position(&mut self, handle: Self::Handle, x: f64, y: f64);
    fn set_opacity(&mut self, handle: Self::Handle, opacity: f32);
    fn set_z_index(&mut self, handle: Self::Handle, z_index: i32);
    fn set_blend_mode(&mut self, handle: Self::Handle, mode: &RendererBlendMode);
    fn set_visible(&mut self, handle: Self::Handle, visible: bool);
    fn set_mask(&mut self, handle: Self::Handle, mask: Option<Self::Handle>);

    /// Inserts `child` into `parent`'s display list at `index` (clamped to
    /// the list length).
    fn attach(&mut self, parent: Self::Handle, child: Self::Handle, index: usize);
    /// Removes `child` from whatever display list holds it.
    fn detach(&mut self, child: Self::Handle);

    fn replace_positions(&mut self, handle: Self::Handle, positions: &[f32]);
    fn replace_uvs(&mut self, handle: Self::Handle, uvs: &[f32]);
    fn replace_indices(&mut self, handle: Self::Handle, indices: &[u32]);

    /// Builds a texture from straight RGBA pixels, or `None` if the framework
    /// rejects the dimensions.
    fn texture_from_pixels(&mut self, width: u32, height: u32, rgba: &[u8])
        -> Option<Self::Texture>;
    /// The blank texture a mesh shows until its real one arrives.
    fn placeholder_texture(&mut self) -> Self::Texture;
    fn set_texture(&mut self, handle: Self::Handle, texture: Self::Texture);

    /// Frees the display object. The handle is never used again.
    fn release(&mut self, handle: Self::Handle);
}

/// Pushes every buffer of `geometry` into the mesh behind `handle`.
pub(crate) fn upload_geometry<B: DisplayBackend>(
    backend: &mut B,
    handle: B::Handle,
    geometry: &GeometryBuffer,
) {
    backend.replace_positions(handle, geometry.flat_positions());
    backend.replace_uvs(handle, geometry.flat_uvs());
    backend.replace_indices(handle, geometry.flat_indices());
}
