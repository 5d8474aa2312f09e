//! # Retained Backend
//!
//! An in-memory [`DisplayBackend`] that records every display object and
//! property the engine pushes.
//!
//! It is the default backend for headless use and the one the tests observe.
//! Textures are premultiplied [`tiny_skia::Pixmap`]s, ready to hand to a
//! rasterizer.

use crate::blend::RendererBlendMode;
use crate::display::{DisplayBackend, TextStyleSpec};
use crate::geometry::GeometryBuffer;
use std::sync::Arc;
use tiny_skia::{ColorU8, Pixmap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayHandle(u32);

#[derive(Clone, Debug)]
pub enum RetainedTexture {
    Placeholder,
    Pixels(Arc<Pixmap>),
}

impl RetainedTexture {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        match self {
            Self::Placeholder => None,
            Self::Pixels(pixmap) => Some(pixmap),
        }
    }
}

#[derive(Clone, Debug)]
pub enum DisplayKind {
    Container,
    Mesh {
        positions: Vec<f32>,
        uvs: Vec<f32>,
        indices: Vec<u32>,
        texture: RetainedTexture,
    },
    Text {
        text: String,
        style: TextStyleSpec,
    },
}

#[derive(Clone, Debug)]
pub struct DisplayObject {
    pub kind: DisplayKind,
    pub label: Option<String>,
    pub position: (f64, f64),
    pub opacity: f32,
    pub z_index: i32,
    pub blend_mode: RendererBlendMode,
    pub visible: bool,
    pub mask: Option<DisplayHandle>,
    pub parent: Option<DisplayHandle>,
    pub children: Vec<DisplayHandle>,
    /// Number of `set_position` calls received.
    pub position_writes: usize,
}

impl DisplayObject {
    fn new(kind: DisplayKind) -> Self {
        Self {
            kind,
            label: None,
            position: (0.0, 0.0),
            opacity: 1.0,
            z_index: 0,
            blend_mode: RendererBlendMode::Normal,
            visible: true,
            mask: None,
            parent: None,
            children: Vec::new(),
            position_writes: 0,
        }
    }

    pub fn texture(&self) -> Option<&RetainedTexture> {
        match &self.kind {
            DisplayKind::Mesh { texture, .. } => Some(texture),
            _ => None,
        }
    }
}

/// Arena of display objects. Slots are never reused, so a released handle
/// stays dead.
#[derive(Clone, Debug, Default)]
pub struct RetainedBackend {
    objects: Vec<Option<DisplayObject>>,
}

impl RetainedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: DisplayHandle) -> Option<&DisplayObject> {
        self.objects.get(handle.0 as usize).and_then(|o| o.as_ref())
    }

    fn get_mut(&mut self, handle: DisplayHandle) -> Option<&mut DisplayObject> {
        self.objects
            .get_mut(handle.0 as usize)
            .and_then(|o| o.as_mut())
    }

    pub fn is_live(&self, handle: DisplayHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    fn insert(&mut self, kind: DisplayKind) -> DisplayHandle {
        let handle = DisplayHandle(self.objects.len() as u32);
        self.objects.push(Some(DisplayObject::new(kind)));
        handle
    }

    fn mesh_buffers(
        &mut self,
        handle: DisplayHandle,
    ) -> Option<(&mut Vec<f32>, &mut Vec<f32>, &mut Vec<u32>)> {
        match self.get_mut(handle).map(|o| &mut o.kind) {
            Some(DisplayKind::Mesh {
                positions,
                uvs,
                indices,
                ..
            }) => Some((positions, uvs, indices)),
            _ => None,
        }
    }
}

impl DisplayBackend for RetainedBackend {
    type Handle = DisplayHandle;
    type Texture = RetainedTexture;

    fn create_container(&mut self) -> DisplayHandle {
        self.insert(DisplayKind::Container)
    }

    fn create_mesh(&mut self, geometry: &GeometryBuffer, texture: RetainedTexture) -> DisplayHandle {
        self.insert(DisplayKind::Mesh {
            positions: geometry.flat_positions().to_vec(),
            uvs: geometry.flat_uvs().to_vec(),
            indices: geometry.flat_indices().to_vec(),
            texture,
        })
    }

    fn create_text(&mut self, text: &str, style: &TextStyleSpec) -> DisplayHandle {
        self.insert(DisplayKind::Text {
            text: text.to_string(),
            style: style.clone(),
        })
    }

    fn set_label(&mut self, handle: DisplayHandle, label: &str) {
        if let Some(object) = self.get_mut(handle) {
            object.label = Some(label.to_string());
        }
    }

    fn set_position(&mut self, handle: DisplayHandle, x: f64, y: f64) {
        if let Some(object) = self.get_mut(handle) {
            object.position = (x, y);
            object.position_writes += 1;
        }
    }

    fn set_opacity(&mut self, handle: DisplayHandle, opacity: f32) {
        if let Some(object) = self.get_mut(handle) {
            object.opacity = opacity;
        }
    }

    fn set_z_index(&mut self, handle: DisplayHandle, z_index: i32) {
        if let Some(object) = self.get_mut(handle) {
            object.z_index = z_index;
        }
    }

    fn set_blend_mode(&mut self, handle: DisplayHandle, mode: &RendererBlendMode) {
        if let Some(object) = self.get_mut(handle) {
            object.blend_mode = mode.clone();
        }
    }

    fn set_visible(&mut self, handle: DisplayHandle, visible: bool) {
        if let Some(object) = self.get_mut(handle) {
            object.visible = visible;
        }
    }

    fn set_mask(&mut self, handle: DisplayHandle, mask: Option<DisplayHandle>) {
        if let Some(object) = self.get_mut(handle) {
            object.mask = mask;
        }
    }

    fn attach(&mut self, parent: DisplayHandle, child: DisplayHandle, index: usize) {
        self.detach(child);
        let Some(parent_object) = self.get_mut(parent) else {
            return;
        };
        let index = index.min(parent_object.children.len());
        parent_object.children.insert(index, child);
        if let Some(child_object) = self.get_mut(child) {
            child_object.parent = Some(parent);
        }
    }

    fn detach(&mut self, child: DisplayHandle) {
        let Some(parent) = self.get_mut(child).and_then(|o| o.parent.take()) else {
            return;
        };
        if let Some(parent_object) = self.get_mut(parent) {
            parent_object.children.retain(|&c| c != child);
        }
    }

    fn replace_positions(&mut self, handle: DisplayHandle, data: &[f32]) {
        if let Some((positions, _, _)) = self.mesh_buffers(handle) {
            positions.clear();
            positions.extend_from_slice(data);
        }
    }

    fn replace_uvs(&mut self, handle: DisplayHandle, data: &[f32]) {
        if let Some((_, uvs, _)) = self.mesh_buffers(handle) {
            uvs.clear();
            uvs.extend_from_slice(data);
        }
    }

    fn replace_indices(&mut self, handle: DisplayHandle, data: &[u32]) {
        if let Some((_, _, indices)) = self.mesh_buffers(handle) {
            indices.clear();
            indices.extend_from_slice(data);
        }
    }

    fn texture_from_pixels(&mut self, width: u32, height: u32, rgba: &[u8]) -> Option<RetainedTexture> {
        if psd_data::rgba_len(width, height) != Some(rgba.len()) {
            return None;
        }
        let mut pixmap = Pixmap::new(width, height)?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Some(RetainedTexture::Pixels(Arc::new(pixmap)))
    }

    fn placeholder_texture(&mut self) -> RetainedTexture {
        RetainedTexture::Placeholder
    }

    fn set_texture(&mut self, handle: DisplayHandle, new_texture: RetainedTexture) {
        if let Some(DisplayKind::Mesh { texture, .. }) = self.get_mut(handle).map(|o| &mut o.kind) {
            *texture = new_texture;
        }
    }

    fn release(&mut self, handle: DisplayHandle) {
        self.detach(handle);
        if let Some(slot) = self.objects.get_mut(handle.0 as usize) {
            *slot = None;
        }
    }
}
