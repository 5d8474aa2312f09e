//! # Tree Builder
//!
//! Converts [`LayerNode`]s into scene nodes, top-down.
//!
//! ## Per node
//! 1. Classify: children → group, text payload → text, otherwise paintable.
//! 2. Create the matching display object (container, textured mesh, text).
//! 3. Build children in document order (groups only).
//! 4. Paintables get the default quad and a detached texture decode.
//! 5. Bind position, opacity, visibility and blend mode.
//! 6. Append to the parent, resolve clipping against the preceding sibling,
//!    then record the parent back-reference.

use crate::blend::{map_blend_mode, RendererBlendMode};
use crate::display::{DisplayBackend, TextStyleSpec};
use crate::errors::SceneError;
use crate::geometry::GeometryBuffer;
use crate::node::{NodeBody, NodeId, NodeKind, SceneNode};
use crate::point::BoundPoint;
use crate::scene::Scene;
use crate::texture::TextureState;
use psd_data::LayerNode;
use tracing::{debug, instrument, warn};

fn classify(doc: &LayerNode) -> NodeKind {
    if doc.has_children() {
        NodeKind::Group
    } else if doc.text.is_some() {
        NodeKind::Text
    } else {
        NodeKind::Paintable
    }
}

/// Local size of a layer's quad: the raster's dimensions, else the layer bounds.
fn raster_size(doc: &LayerNode) -> (f32, f32) {
    match &doc.image_data {
        Some(raster) => (raster.width as f32, raster.height as f32),
        None => (
            doc.width.unwrap_or(0.0) as f32,
            doc.height.unwrap_or(0.0) as f32,
        ),
    }
}

impl<B: DisplayBackend + 'static> Scene<B> {
    /// Converts `doc` (and its subtree) and appends it under `parent`.
    ///
    /// On error nothing of the subtree remains in the scene.
    #[instrument(level = "debug", skip(self, doc), fields(name = doc.name.as_deref().unwrap_or("")))]
    pub fn build(&mut self, doc: &LayerNode, parent: Option<NodeId>) -> Result<NodeId, SceneError> {
        let depth = match parent {
            Some(parent) => {
                if !matches!(self.node(parent)?.body(), NodeBody::Group { .. }) {
                    return Err(SceneError::NotGroup(parent));
                }
                self.depth_of(parent)? + 1
            }
            None => 0,
        };
        self.build_at(doc, parent, depth, false)
    }

    /// Converts a document root. The root is always a group, even when it has
    /// no children.
    pub fn build_root(&mut self, doc: &LayerNode) -> Result<NodeId, SceneError> {
        self.build_at(doc, None, 0, true)
    }

    fn build_at(
        &mut self,
        doc: &LayerNode,
        parent: Option<NodeId>,
        depth: usize,
        force_group: bool,
    ) -> Result<NodeId, SceneError> {
        if depth > self.config.max_depth {
            return Err(SceneError::RecursionLimit);
        }

        let kind = if force_group {
            NodeKind::Group
        } else {
            classify(doc)
        };
        let name = doc
            .name
            .clone()
            .unwrap_or_else(|| self.config.default_name.clone());

        let (body, handle) = self.create_body(kind, doc);
        self.backend.borrow_mut().set_label(handle, &name);

        let (x, y) = (doc.top.unwrap_or(0.0), doc.left.unwrap_or(0.0));
        let position = BoundPoint::new(x, y, Some(self.position_sink(handle)));
        let opacity = doc.fill_opacity.unwrap_or(1.0).clamp(0.0, 1.0) as f32;
        let visible = !doc.hidden.unwrap_or(false);
        let blend_mode = doc
            .blend_mode
            .as_deref()
            .map(map_blend_mode)
            .unwrap_or(RendererBlendMode::Normal);
        let clipping = doc.clipping.unwrap_or(false);
        let knockout = doc.knockout.unwrap_or(false);

        {
            let mut backend = self.backend.borrow_mut();
            backend.set_position(handle, x, y);
            backend.set_opacity(handle, opacity);
            backend.set_visible(handle, visible);
            backend.set_blend_mode(handle, &blend_mode);
            backend.set_z_index(handle, 0);
        }
        if knockout {
            warn!(node = %name, "knockout is not supported by the renderer; the flag is stored but ignored");
        }
        if doc.mask.is_some() {
            warn!(node = %name, "layer masks are not converted; the mask is stored but ignored");
        }

        let id = self.alloc(SceneNode {
            name,
            body,
            position,
            opacity,
            z_index: 0,
            blend_mode,
            visible,
            clipping,
            knockout,
            mask: None,
            parent: None,
            handle,
            source: doc.clone(),
        });

        if kind == NodeKind::Group {
            if let Err(err) = self.build_children(id, doc, depth) {
                self.destroy_subtree(id);
                return Err(err);
            }
        } else if kind == NodeKind::Paintable {
            self.schedule_texture(id, doc)?;
        }

        if let Some(parent) = parent {
            if let Err(err) = self.link(parent, id) {
                self.destroy_subtree(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    fn create_body(&mut self, kind: NodeKind, doc: &LayerNode) -> (NodeBody, B::Handle) {
        let mut backend = self.backend.borrow_mut();
        match kind {
            NodeKind::Group => (
                NodeBody::Group {
                    children: Vec::new(),
                },
                backend.create_container(),
            ),
            NodeKind::Text => {
                let (text, style) = match &doc.text {
                    Some(payload) => (
                        payload.text.clone(),
                        payload
                            .style
                            .as_ref()
                            .map(TextStyleSpec::from)
                            .unwrap_or_default(),
                    ),
                    None => (String::new(), TextStyleSpec::default()),
                };
                let handle = backend.create_text(&text, &style);
                (NodeBody::Text { text, style }, handle)
            }
            NodeKind::Paintable => {
                let (w, h) = raster_size(doc);
                let geometry = GeometryBuffer::quad(w, h);
                let placeholder = backend.placeholder_texture();
                let handle = backend.create_mesh(&geometry, placeholder);
                (
                    NodeBody::Paintable {
                        geometry,
                        texture: TextureState::None,
                        ticket: None,
                    },
                    handle,
                )
            }
        }
    }

    fn build_children(&mut self, id: NodeId, doc: &LayerNode, depth: usize) -> Result<(), SceneError> {
        for child in doc.child_layers() {
            self.build_at(child, Some(id), depth + 1, false)?;
        }
        Ok(())
    }

    /// Issues a fresh ticket and spawns the decode for a paintable node, if it
    /// carries a raster and decoding is enabled.
    fn schedule_texture(&mut self, id: NodeId, doc: &LayerNode) -> Result<(), SceneError> {
        let raster = match &doc.image_data {
            Some(raster) if self.config.decode_textures => raster.clone(),
            _ => return Ok(()),
        };
        let issued = self.textures.schedule(id, raster);
        if let NodeBody::Paintable { texture, ticket, .. } = &mut self.node_mut(id)?.body {
            *texture = TextureState::Pending;
            *ticket = Some(issued);
        }
        Ok(())
    }

    /// Appends `id` to `parent`, resolves clipping, then sets the back-reference.
    fn link(&mut self, parent: NodeId, id: NodeId) -> Result<(), SceneError> {
        let parent_handle = self.node(parent)?.handle;
        let handle = self.node(id)?.handle;

        let index = match &mut self.node_mut(parent)?.body {
            NodeBody::Group { children } => {
                children.push(id);
                children.len() - 1
            }
            _ => return Err(SceneError::NotGroup(parent)),
        };
        self.backend.borrow_mut().attach(parent_handle, handle, index);

        // A clipped layer is masked by the sibling right before it; the first
        // child has nothing to clip against.
        if self.node(id)?.clipping && index > 0 {
            let base = self.node(parent)?.children()[index - 1];
            let base_handle = self.node(base)?.handle;
            self.node_mut(id)?.mask = Some(base);
            self.backend.borrow_mut().set_mask(handle, Some(base_handle));
        }

        self.node_mut(id)?.parent = Some(parent);
        Ok(())
    }

    /// Rebuilds `id` as a group or a paintable.
    ///
    /// The old children, geometry and display object are discarded. A group
    /// rebuilds its children from the stored document node; a paintable gets
    /// an empty geometry buffer and a new texture decode. The new display
    /// object takes the old one's place in the parent, and every property
    /// (name, position, opacity, visibility, blend mode, z-index, mask) is
    /// carried over. Retyping to the current kind rebuilds all the same.
    #[instrument(level = "debug", skip(self))]
    pub fn retype(&mut self, id: NodeId, kind: NodeKind) -> Result<(), SceneError> {
        if kind == NodeKind::Text {
            return Err(SceneError::InvalidRetype(id, kind.as_str()));
        }
        let node = self.node(id)?;
        let old_handle = node.handle;
        let old_children = node.children().to_vec();
        let parent = node.parent;
        let source = node.source.clone();
        let index = self.index_in_parent(id)?;
        let depth = self.depth_of(id)?;

        for child in old_children {
            self.destroy_subtree(child);
        }

        let (body, handle) = {
            let mut backend = self.backend.borrow_mut();
            match kind {
                NodeKind::Group => (
                    NodeBody::Group {
                        children: Vec::new(),
                    },
                    backend.create_container(),
                ),
                _ => {
                    let geometry = GeometryBuffer::new();
                    let placeholder = backend.placeholder_texture();
                    let handle = backend.create_mesh(&geometry, placeholder);
                    (
                        NodeBody::Paintable {
                            geometry,
                            texture: TextureState::None,
                            ticket: None,
                        },
                        handle,
                    )
                }
            }
        };

        let sink = self.position_sink(handle);
        let node = self.node_mut(id)?;
        node.body = body;
        node.handle = handle;
        node.position.set_on_change(Some(sink));
        let (x, y) = node.position.xy();
        let name = node.name.clone();
        let (opacity, visible, z_index) = (node.opacity, node.visible, node.z_index);
        let blend_mode = node.blend_mode.clone();
        let mask = node.mask;

        let mask_handle = match mask {
            Some(mask) => self.node(mask).ok().map(|m| m.handle),
            None => None,
        };
        let parent_handle = match parent {
            Some(parent) => Some(self.node(parent)?.handle),
            None => None,
        };
        {
            let mut backend = self.backend.borrow_mut();
            backend.set_label(handle, &name);
            backend.set_position(handle, x, y);
            backend.set_opacity(handle, opacity);
            backend.set_visible(handle, visible);
            backend.set_z_index(handle, z_index);
            backend.set_blend_mode(handle, &blend_mode);
            backend.set_mask(handle, mask_handle);
            if let (Some(parent_handle), Some(index)) = (parent_handle, index) {
                backend.attach(parent_handle, handle, index);
            }
            backend.release(old_handle);
        }

        // Siblings clipped against this node follow it to the new handle.
        if let Some(parent) = parent {
            let siblings = self.node(parent)?.children().to_vec();
            for sibling in siblings {
                if self.node(sibling)?.mask == Some(id) {
                    let sibling_handle = self.node(sibling)?.handle;
                    self.backend
                        .borrow_mut()
                        .set_mask(sibling_handle, Some(handle));
                }
            }
        }

        match kind {
            NodeKind::Group => {
                if let Err(err) = self.build_children(id, &source, depth) {
                    let built = self.node(id)?.children().to_vec();
                    for child in built {
                        self.destroy_subtree(child);
                    }
                    if let NodeBody::Group { children } = &mut self.node_mut(id)?.body {
                        children.clear();
                    }
                    return Err(err);
                }
            }
            _ => self.schedule_texture(id, &source)?,
        }
        debug!(node = ?id, kind = kind.as_str(), "retyped");
        Ok(())
    }
}
