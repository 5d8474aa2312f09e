use crate::blend::RendererBlendMode;
use crate::display::TextStyleSpec;
use crate::geometry::GeometryBuffer;
use crate::point::BoundPoint;
use crate::texture::TextureState;
use psd_data::LayerNode;
use std::fmt;

/// A handle to a node in a [`Scene`](crate::Scene).
///
/// Contains both a slot index and a generation counter so that stale handles
/// are detected after a node is destroyed and its slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    pub const fn index(self) -> u32 {
        self.idx
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Paintable,
    Text,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Paintable => "paintable",
            NodeKind::Text => "text",
        }
    }
}

/// Kind-specific content. The kind of a node is derived from this, so the
/// kind and the stored children or geometry can never disagree.
#[derive(Debug)]
pub enum NodeBody {
    Group {
        children: Vec<NodeId>,
    },
    Paintable {
        geometry: GeometryBuffer,
        texture: TextureState,
        /// Ticket of the decode whose result this node still accepts.
        ticket: Option<u64>,
    },
    Text {
        text: String,
        style: TextStyleSpec,
    },
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Group { .. } => NodeKind::Group,
            NodeBody::Paintable { .. } => NodeKind::Paintable,
            NodeBody::Text { .. } => NodeKind::Text,
        }
    }
}

/// One converted document node.
///
/// Read access is public; every write goes through the owning
/// [`Scene`](crate::Scene) so the display handle stays in sync.
pub struct SceneNode<H> {
    pub(crate) name: String,
    pub(crate) body: NodeBody,
    pub(crate) position: BoundPoint,
    pub(crate) opacity: f32,
    pub(crate) z_index: i32,
    pub(crate) blend_mode: RendererBlendMode,
    pub(crate) visible: bool,
    pub(crate) clipping: bool,
    pub(crate) knockout: bool,
    /// Non-owning; always a sibling.
    pub(crate) mask: Option<NodeId>,
    /// Non-owning back-reference; `None` only for roots.
    pub(crate) parent: Option<NodeId>,
    pub(crate) handle: H,
    /// The document node this was built from, with property writes applied.
    pub(crate) source: LayerNode,
}

impl<H: Copy> SceneNode<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Children in document (and draw) order; empty unless a group.
    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::Group { children } => children,
            _ => &[],
        }
    }

    pub fn geometry(&self) -> Option<&GeometryBuffer> {
        match &self.body {
            NodeBody::Paintable { geometry, .. } => Some(geometry),
            _ => None,
        }
    }

    pub fn texture_state(&self) -> Option<TextureState> {
        match &self.body {
            NodeBody::Paintable { texture, .. } => Some(*texture),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn position(&self) -> &BoundPoint {
        &self.position
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn blend_mode(&self) -> &RendererBlendMode {
        &self.blend_mode
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn clipping(&self) -> bool {
        self.clipping
    }

    pub fn knockout(&self) -> bool {
        self.knockout
    }

    pub fn mask(&self) -> Option<NodeId> {
        self.mask
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn display_handle(&self) -> H {
        self.handle
    }

    pub fn source(&self) -> &LayerNode {
        &self.source
    }
}

impl<H: fmt::Debug> fmt::Debug for SceneNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("kind", &self.body.kind())
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .field("blend_mode", &self.blend_mode)
            .field("visible", &self.visible)
            .field("mask", &self.mask)
            .field("parent", &self.parent)
            .field("handle", &self.handle)
            .finish()
    }
}
