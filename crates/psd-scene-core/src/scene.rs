use crate::blend::{document_name_for, RendererBlendMode};
use crate::config::SceneConfig;
use crate::display::{upload_geometry, DisplayBackend};
use crate::errors::{GeometryError, SceneError};
use crate::geometry::GeometryBuffer;
use crate::node::{NodeBody, NodeId, SceneNode};
use crate::texture::{TextureEvent, TextureJob, TextureQueue, TextureState};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// The converted tree: an arena of [`SceneNode`]s plus the display backend
/// they are mirrored into.
///
/// Ownership flows only through each group's `children` list. `parent` and
/// `mask` are plain [`NodeId`]s resolved through the arena, so a reference to
/// a destroyed node resolves to nothing instead of dangling.
pub struct Scene<B: DisplayBackend> {
    nodes: Vec<Option<SceneNode<B::Handle>>>,
    generations: Vec<u32>,
    free_indices: Vec<u32>,
    pub(crate) backend: Rc<RefCell<B>>,
    pub(crate) textures: TextureQueue,
    pub(crate) config: SceneConfig,
}

impl<B: DisplayBackend + 'static> Scene<B> {
    pub fn new(backend: B, config: SceneConfig) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_indices: Vec::new(),
            backend: Rc::new(RefCell::new(backend)),
            textures: TextureQueue::new(),
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Shared access to the display backend.
    ///
    /// Do not hold the returned guard across calls that write node
    /// properties; position writes borrow the backend themselves.
    pub fn backend(&self) -> Ref<'_, B> {
        self.backend.borrow()
    }

    pub fn backend_mut(&self) -> RefMut<'_, B> {
        self.backend.borrow_mut()
    }

    // -- Arena --

    pub(crate) fn alloc(&mut self, node: SceneNode<B::Handle>) -> NodeId {
        if let Some(idx) = self.free_indices.pop() {
            self.nodes[idx as usize] = Some(node);
            NodeId {
                idx,
                generation: self.generations[idx as usize],
            }
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Some(node));
            self.generations.push(0);
            NodeId { idx, generation: 0 }
        }
    }

    fn free(&mut self, id: NodeId) -> Option<SceneNode<B::Handle>> {
        if self.generations.get(id.idx as usize) != Some(&id.generation) {
            return None;
        }
        let node = self.nodes.get_mut(id.idx as usize)?.take()?;
        self.generations[id.idx as usize] = self.generations[id.idx as usize].wrapping_add(1);
        self.free_indices.push(id.idx);
        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: NodeId) -> Option<&SceneNode<B::Handle>> {
        if self.generations.get(id.idx as usize) != Some(&id.generation) {
            return None;
        }
        self.nodes.get(id.idx as usize).and_then(|n| n.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode<B::Handle>> {
        if self.generations.get(id.idx as usize) != Some(&id.generation) {
            return None;
        }
        self.nodes.get_mut(id.idx as usize).and_then(|n| n.as_mut())
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode<B::Handle>, SceneError> {
        self.get(id).ok_or(SceneError::NodeDestroyed(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode<B::Handle>, SceneError> {
        self.get_mut(id).ok_or(SceneError::NodeDestroyed(id))
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(self.node(id)?.children())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    /// Position of `id` in its parent's children, `None` for roots.
    pub fn index_in_parent(&self, id: NodeId) -> Result<Option<usize>, SceneError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        Ok(self
            .node(parent)?
            .children()
            .iter()
            .position(|&c| c == id))
    }

    /// `id` and all its descendants, pre-order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.node(next)?;
            out.push(next);
            stack.extend(node.children().iter().rev().copied());
        }
        Ok(out)
    }

    /// Depth of `id` below its root (roots are at depth 0).
    pub(crate) fn depth_of(&self, id: NodeId) -> Result<usize, SceneError> {
        let mut depth = 0;
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent)?.parent;
        }
        Ok(depth)
    }

    pub(crate) fn position_sink(&self, handle: B::Handle) -> Box<dyn FnMut(f64, f64)> {
        let backend = Rc::clone(&self.backend);
        Box::new(move |x, y| backend.borrow_mut().set_position(handle, x, y))
    }

    // -- Properties --

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        let name = name.into();
        let node = self.node_mut(id)?;
        node.source.name = Some(name.clone());
        let handle = node.handle;
        self.backend.borrow_mut().set_label(handle, &name);
        self.node_mut(id)?.name = name;
        Ok(())
    }

    /// Sets the opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) -> Result<(), SceneError> {
        let opacity = opacity.clamp(0.0, 1.0);
        let node = self.node_mut(id)?;
        node.opacity = opacity;
        node.source.fill_opacity = Some(opacity as f64);
        let handle = node.handle;
        self.backend.borrow_mut().set_opacity(handle, opacity);
        Ok(())
    }

    pub fn set_z_index(&mut self, id: NodeId, z_index: i32) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.z_index = z_index;
        let handle = node.handle;
        self.backend.borrow_mut().set_z_index(handle, z_index);
        Ok(())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.visible = visible;
        node.source.hidden = Some(!visible);
        let handle = node.handle;
        self.backend.borrow_mut().set_visible(handle, visible);
        Ok(())
    }

    pub fn set_blend_mode(&mut self, id: NodeId, mode: RendererBlendMode) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.source.blend_mode = Some(document_name_for(&mode));
        let handle = node.handle;
        self.backend.borrow_mut().set_blend_mode(handle, &mode);
        self.node_mut(id)?.blend_mode = mode;
        Ok(())
    }

    /// Knockout has no renderer equivalent: the flag is stored and otherwise
    /// ignored.
    pub fn set_knockout(&mut self, id: NodeId, knockout: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        warn!(
            node = %node.name,
            "knockout is not supported by the renderer; the flag is stored but ignored"
        );
        node.knockout = knockout;
        node.source.knockout = Some(knockout);
        Ok(())
    }

    /// Sets the clipping flag and re-resolves the mask: a clipped node is
    /// masked by the sibling right before it, an unclipped one has no mask.
    pub fn set_clipping(&mut self, id: NodeId, clipping: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.clipping = clipping;
        node.source.clipping = Some(clipping);

        let base = match (clipping, self.index_in_parent(id)?) {
            (true, Some(index)) if index > 0 => match self.node(id)?.parent {
                Some(parent) => Some(self.node(parent)?.children()[index - 1]),
                None => None,
            },
            _ => None,
        };
        self.set_mask(id, base)
    }

    pub fn set_x(&mut self, id: NodeId, x: f64) -> Result<bool, SceneError> {
        let node = self.node_mut(id)?;
        let changed = node.position.set_x(x);
        node.source.top = Some(x);
        Ok(changed)
    }

    pub fn set_y(&mut self, id: NodeId, y: f64) -> Result<bool, SceneError> {
        let node = self.node_mut(id)?;
        let changed = node.position.set_y(y);
        node.source.left = Some(y);
        Ok(changed)
    }

    /// Moves the node; the display handle sees one update even if both
    /// components changed.
    pub fn set_xy(&mut self, id: NodeId, x: f64, y: f64) -> Result<bool, SceneError> {
        let node = self.node_mut(id)?;
        let changed = node.position.set_xy(x, y);
        node.source.top = Some(x);
        node.source.left = Some(y);
        Ok(changed)
    }

    /// Points the node's mask at a sibling, or clears it.
    pub fn set_mask(&mut self, id: NodeId, mask: Option<NodeId>) -> Result<(), SceneError> {
        let node = self.node(id)?;
        let (handle, parent) = (node.handle, node.parent);
        let mask_handle = match mask {
            Some(mask_id) => {
                let mask_node = self.node(mask_id)?;
                if mask_id == id || parent.is_none() || mask_node.parent != parent {
                    return Err(SceneError::MaskNotSibling { node: id, mask: mask_id });
                }
                Some(mask_node.handle)
            }
            None => None,
        };
        self.node_mut(id)?.mask = mask;
        self.backend.borrow_mut().set_mask(handle, mask_handle);
        Ok(())
    }

    /// Moves `id` to the end of `new_parent`'s children.
    ///
    /// Masks that stop being sibling-local (this node's own, and any old
    /// sibling's that pointed at it) are cleared.
    pub fn set_parent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        let handle = self.node(id)?.handle;
        let parent_node = self.node(new_parent)?;
        if !matches!(parent_node.body, NodeBody::Group { .. }) {
            return Err(SceneError::NotGroup(new_parent));
        }
        let parent_handle = parent_node.handle;

        let mut ancestor = Some(new_parent);
        while let Some(current) = ancestor {
            if current == id {
                return Err(SceneError::Cycle { node: id, parent: new_parent });
            }
            ancestor = self.node(current)?.parent;
        }

        let old_parent = self.node(id)?.parent;
        if let Some(old) = old_parent {
            self.unlink_child(old, id)?;
            if old != new_parent {
                self.clear_masks_pointing_at(old, id)?;
                if self.node(id)?.mask.is_some() {
                    self.set_mask(id, None)?;
                }
            }
        }

        let index = match &mut self.node_mut(new_parent)?.body {
            NodeBody::Group { children } => {
                children.push(id);
                children.len() - 1
            }
            _ => return Err(SceneError::NotGroup(new_parent)),
        };
        self.backend.borrow_mut().attach(parent_handle, handle, index);
        self.node_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if let NodeBody::Group { children } = &mut self.node_mut(parent)?.body {
            children.retain(|&c| c != child);
        }
        let handle = self.node(child)?.handle;
        self.backend.borrow_mut().detach(handle);
        Ok(())
    }

    fn clear_masks_pointing_at(&mut self, parent: NodeId, target: NodeId) -> Result<(), SceneError> {
        let siblings = self.node(parent)?.children().to_vec();
        for sibling in siblings {
            let node = self.node_mut(sibling)?;
            if node.mask == Some(target) {
                node.mask = None;
                let handle = node.handle;
                self.backend.borrow_mut().set_mask(handle, None);
            }
        }
        Ok(())
    }

    // -- Geometry --

    /// Runs `edit` against a paintable node's geometry and uploads the
    /// regenerated buffers if anything changed.
    pub fn edit_geometry<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut GeometryBuffer) -> Result<R, GeometryError>,
    ) -> Result<R, SceneError> {
        let backend = Rc::clone(&self.backend);
        let node = self.node_mut(id)?;
        let handle = node.handle;
        let NodeBody::Paintable { geometry, .. } = &mut node.body else {
            return Err(SceneError::NotPaintable(id));
        };
        let before = geometry.revision();
        let result = edit(geometry)?;
        if geometry.revision() != before {
            upload_geometry(&mut *backend.borrow_mut(), handle, geometry);
        }
        Ok(result)
    }

    // -- Destruction --

    /// Destroys `id` and its whole subtree, depth-first.
    ///
    /// Display handles are released, the node is unlinked from its parent,
    /// and siblings that used it as a mask lose the mask. Every id in the
    /// subtree is invalid afterwards.
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.unlink_child(parent, id)?;
            self.clear_masks_pointing_at(parent, id)?;
        }
        self.destroy_subtree(id);
        Ok(())
    }

    pub(crate) fn destroy_subtree(&mut self, id: NodeId) {
        let children = match self.get(id) {
            Some(node) => node.children().to_vec(),
            None => return,
        };
        for child in children {
            self.destroy_subtree(child);
        }
        if let Some(node) = self.free(id) {
            self.backend.borrow_mut().release(node.handle);
        }
    }

    // -- Textures --

    pub fn texture_state(&self, id: NodeId) -> Result<Option<TextureState>, SceneError> {
        Ok(self.node(id)?.texture_state())
    }

    /// Number of decodes whose results have not been drained yet.
    pub fn pending_textures(&self) -> usize {
        self.textures.in_flight()
    }

    /// Applies every decode result that has already arrived. Never blocks.
    pub fn pump_textures(&mut self) -> Vec<TextureEvent> {
        let mut events = Vec::new();
        while let Some(job) = self.textures.try_next() {
            events.push(self.apply_texture(job));
        }
        events
    }

    /// Blocks until every scheduled decode has been applied.
    pub fn finish_textures(&mut self) -> Vec<TextureEvent> {
        let mut events = Vec::new();
        while let Some(job) = self.textures.next_blocking() {
            events.push(self.apply_texture(job));
        }
        events
    }

    fn apply_texture(&mut self, job: TextureJob) -> TextureEvent {
        let handle = match self.get(job.node).map(|n| (&n.body, n.handle)) {
            Some((NodeBody::Paintable { ticket, .. }, handle)) if *ticket == Some(job.ticket) => {
                handle
            }
            _ => {
                debug!(node = ?job.node, "dropping texture for a destroyed or retyped node");
                return TextureEvent::Discarded(job.node);
            }
        };

        let outcome = job.result.and_then(|raster| {
            let texture = self
                .backend
                .borrow_mut()
                .texture_from_pixels(raster.width, raster.height, &raster.pixels);
            texture.ok_or(crate::texture::TextureError::Rejected {
                width: raster.width,
                height: raster.height,
            })
        });

        let (state, event) = match outcome {
            Ok(texture) => {
                self.backend.borrow_mut().set_texture(handle, texture);
                debug!(node = ?job.node, "texture attached");
                (TextureState::Ready, TextureEvent::Ready(job.node))
            }
            Err(err) => {
                warn!(node = ?job.node, error = %err, "texture decode failed, keeping placeholder");
                (
                    TextureState::Failed,
                    TextureEvent::Failed {
                        node: job.node,
                        reason: err.to_string(),
                    },
                )
            }
        };
        if let Some(NodeBody::Paintable { texture, ticket, .. }) =
            self.get_mut(job.node).map(|n| &mut n.body)
        {
            *texture = state;
            *ticket = None;
        }
        event
    }
}
