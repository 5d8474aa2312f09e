//! Node Lifecycle Tests
//!
//! Geometry edits, destruction, retyping, masks and reparenting on built
//! scenes.

use psd_data::LayerNode;
use psd_scene_core::{
    GeometryBuffer, GeometryError, NodeKind, RetainedBackend, Scene, SceneConfig, SceneError,
};

fn scene() -> Scene<RetainedBackend> {
    Scene::new(
        RetainedBackend::new(),
        SceneConfig {
            decode_textures: false,
            ..SceneConfig::default()
        },
    )
}

fn leaf(name: &str) -> LayerNode {
    let mut layer = LayerNode::named(name);
    layer.width = Some(10.0);
    layer.height = Some(10.0);
    layer
}

fn assert_consistent(geometry: &GeometryBuffer) {
    assert_eq!(geometry.positions().len(), geometry.uvs().len());
    let len = geometry.vertex_count() as u32;
    for tri in geometry.triangles() {
        assert!(tri.iter().all(|&i| i < len), "{tri:?} out of range {len}");
    }
    assert_eq!(geometry.flat_positions().len(), geometry.vertex_count() * 2);
    assert_eq!(geometry.flat_uvs().len(), geometry.vertex_count() * 2);
    assert_eq!(geometry.flat_indices().len(), geometry.triangle_count() * 3);
}

/// Removing any vertex of the default quad keeps the buffer consistent.
#[test]
fn remove_vertex_keeps_buffer_consistent() {
    for index in 0..4 {
        let mut geometry = GeometryBuffer::quad(4.0, 2.0);
        geometry.remove_vertex(index).unwrap();
        assert_eq!(geometry.vertex_count(), 3);
        assert_consistent(&geometry);
    }

    // Vertex 1 only belongs to the first triangle; the second is renumbered.
    let mut geometry = GeometryBuffer::quad(4.0, 2.0);
    geometry.remove_vertex(1).unwrap();
    assert_eq!(geometry.triangles(), &[[0, 1, 2]]);

    // Vertex 0 is shared by both triangles.
    let mut geometry = GeometryBuffer::quad(4.0, 2.0);
    geometry.remove_vertex(0).unwrap();
    assert_eq!(geometry.triangle_count(), 0);
    assert_consistent(&geometry);
}

/// Misuse is reported and leaves the buffer untouched.
#[test]
fn geometry_misuse_errors() {
    let mut geometry = GeometryBuffer::new();
    let a = geometry.add_vertex(0.0, 0.0, 0.0, 0.0);
    let b = geometry.add_vertex(1.0, 0.0, 1.0, 0.0);
    assert_eq!((a, b), (0, 1));
    assert_eq!(geometry.triangle_count(), 0);

    assert_eq!(
        geometry.add_triangle(0, 1, 2),
        Err(GeometryError::InvalidIndex { index: 2, len: 2 })
    );
    assert_eq!(
        geometry.set_vertex(5, 1.0, 1.0),
        Err(GeometryError::OutOfRange { index: 5, len: 2 })
    );
    assert_eq!(
        geometry.set_uv(2, 1.0, 1.0),
        Err(GeometryError::OutOfRange { index: 2, len: 2 })
    );
    assert_eq!(
        geometry.remove_vertex(2),
        Err(GeometryError::OutOfRange { index: 2, len: 2 })
    );
    assert_eq!(geometry.triangle_count(), 0);
    assert_consistent(&geometry);
}

/// Geometry edits through the scene reach the display mesh.
#[test]
fn edit_geometry_uploads_buffers() {
    let mut scene = scene();
    let id = scene.build(&leaf("mesh"), None).unwrap();
    let added = scene
        .edit_geometry(id, |g| {
            let v = g.add_vertex(5.0, 15.0, 0.5, 1.0);
            g.add_triangle(2, 3, v)?;
            Ok(v)
        })
        .unwrap();
    assert_eq!(added, 4);

    let handle = scene.node(id).unwrap().display_handle();
    {
        let backend = scene.backend();
        match &backend.get(handle).unwrap().kind {
            psd_scene_core::DisplayKind::Mesh {
                positions, indices, ..
            } => {
                assert_eq!(positions.len(), 10);
                assert_eq!(&indices[6..], &[2, 3, 4]);
            }
            other => panic!("expected a mesh, got {other:?}"),
        }
    }

    let err = scene
        .edit_geometry(id, |g| g.add_triangle(0, 1, 9))
        .unwrap_err();
    assert!(matches!(
        err,
        SceneError::Geometry(GeometryError::InvalidIndex { index: 9, .. })
    ));

    let group = scene.build(&LayerNode::group("g", vec![leaf("x")]), None).unwrap();
    assert!(matches!(
        scene.edit_geometry(group, |g| Ok(g.vertex_count())),
        Err(SceneError::NotPaintable(_))
    ));
}

/// Destroying a group cascades to every descendant and releases every
/// display object.
#[test]
fn destroy_cascades() {
    let doc = LayerNode::group(
        "root",
        vec![
            LayerNode::group("inner", vec![leaf("a"), leaf("b")]),
            leaf("c"),
        ],
    );
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let all = scene.descendants(root).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(scene.backend().live_count(), 5);

    let inner = scene.children(root).unwrap()[0];
    let inner_tree = scene.descendants(inner).unwrap();
    scene.destroy(inner).unwrap();

    for id in &inner_tree {
        assert!(matches!(scene.node(*id), Err(SceneError::NodeDestroyed(_))));
        assert!(matches!(scene.set_opacity(*id, 0.5), Err(SceneError::NodeDestroyed(_))));
    }
    assert_eq!(scene.children(root).unwrap().len(), 1);
    assert_eq!(scene.backend().live_count(), 2);

    scene.destroy(root).unwrap();
    for id in all {
        assert!(!scene.contains(id));
    }
    assert!(scene.is_empty());
    assert_eq!(scene.backend().live_count(), 0);
}

/// A recycled slot does not revive stale ids.
#[test]
fn stale_ids_stay_dead() {
    let mut scene = scene();
    let first = scene.build(&leaf("first"), None).unwrap();
    scene.destroy(first).unwrap();
    let second = scene.build(&leaf("second"), None).unwrap();
    assert_eq!(first.index(), second.index());
    assert_ne!(first, second);
    assert!(scene.node(first).is_err());
    assert_eq!(scene.node(second).unwrap().name(), "second");
    assert!(matches!(scene.destroy(first), Err(SceneError::NodeDestroyed(_))));
}

/// Destroying a node used as a mask clears the mask on its siblings.
#[test]
fn destroying_a_mask_clears_references() {
    let doc = LayerNode::group("g", vec![leaf("base"), leaf("clipped").clipped()]);
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let [base, clipped] = [0, 1].map(|i| scene.children(root).unwrap()[i]);
    assert_eq!(scene.node(clipped).unwrap().mask(), Some(base));

    scene.destroy(base).unwrap();
    assert_eq!(scene.node(clipped).unwrap().mask(), None);
    let handle = scene.node(clipped).unwrap().display_handle();
    assert_eq!(scene.backend().get(handle).unwrap().mask, None);
}

/// Masks must be siblings.
#[test]
fn set_mask_requires_sibling() {
    let doc = LayerNode::group(
        "root",
        vec![LayerNode::group("inner", vec![leaf("deep")]), leaf("a"), leaf("b")],
    );
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let children = scene.children(root).unwrap().to_vec();
    let deep = scene.children(children[0]).unwrap()[0];

    assert!(matches!(
        scene.set_mask(children[1], Some(deep)),
        Err(SceneError::MaskNotSibling { .. })
    ));
    assert!(matches!(
        scene.set_mask(children[1], Some(children[1])),
        Err(SceneError::MaskNotSibling { .. })
    ));
    assert!(matches!(
        scene.set_mask(root, Some(children[1])),
        Err(SceneError::MaskNotSibling { .. })
    ));

    scene.set_mask(children[2], Some(children[0])).unwrap();
    assert_eq!(scene.node(children[2]).unwrap().mask(), Some(children[0]));
    scene.set_mask(children[2], None).unwrap();
    assert_eq!(scene.node(children[2]).unwrap().mask(), None);
}

/// Toggling clipping re-resolves the mask against the preceding sibling.
#[test]
fn set_clipping_resolves_mask() {
    let doc = LayerNode::group("g", vec![leaf("a"), leaf("b")]);
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let [a, b] = [0, 1].map(|i| scene.children(root).unwrap()[i]);

    scene.set_clipping(b, true).unwrap();
    assert_eq!(scene.node(b).unwrap().mask(), Some(a));
    assert_eq!(scene.node(b).unwrap().source().clipping, Some(true));

    scene.set_clipping(a, true).unwrap();
    assert_eq!(scene.node(a).unwrap().mask(), None);

    scene.set_clipping(b, false).unwrap();
    assert_eq!(scene.node(b).unwrap().mask(), None);
}

/// Reparenting moves the node and its display object; cycles are refused.
#[test]
fn reparent_and_cycles() {
    let doc = LayerNode::group(
        "root",
        vec![
            LayerNode::group("left", vec![leaf("x")]),
            LayerNode::group("right", vec![leaf("y")]),
        ],
    );
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let [left, right] = [0, 1].map(|i| scene.children(root).unwrap()[i]);
    let x = scene.children(left).unwrap()[0];

    scene.set_parent(x, right).unwrap();
    assert_eq!(scene.parent(x).unwrap(), Some(right));
    assert!(scene.children(left).unwrap().is_empty());
    assert_eq!(scene.children(right).unwrap().len(), 2);
    assert_eq!(scene.index_in_parent(x).unwrap(), Some(1));

    let right_handle = scene.node(right).unwrap().display_handle();
    let x_handle = scene.node(x).unwrap().display_handle();
    assert_eq!(scene.backend().get(x_handle).unwrap().parent, Some(right_handle));

    assert!(matches!(
        scene.set_parent(root, left),
        Err(SceneError::Cycle { .. })
    ));
    assert!(matches!(
        scene.set_parent(right, right),
        Err(SceneError::Cycle { .. })
    ));
    assert!(matches!(
        scene.set_parent(left, x),
        Err(SceneError::NotGroup(_))
    ));
}

/// A paintable becomes a group rebuilt from its document children, keeping
/// its place and properties.
#[test]
fn retype_paintable_to_group() {
    let mut source = leaf("morph").at(3.0, 4.0);
    source.children = Some(Vec::new());
    let doc = LayerNode::group("root", vec![leaf("before"), source, leaf("after")]);
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let morph = scene.children(root).unwrap()[1];
    assert_eq!(scene.node(morph).unwrap().kind(), NodeKind::Paintable);
    scene.set_opacity(morph, 0.5).unwrap();
    let old_handle = scene.node(morph).unwrap().display_handle();

    scene.retype(morph, NodeKind::Group).unwrap();

    let node = scene.node(morph).unwrap();
    assert_eq!(node.kind(), NodeKind::Group);
    assert!(node.geometry().is_none());
    assert_eq!(node.parent(), Some(root));
    assert_eq!(node.opacity(), 0.5);
    assert_eq!(node.position().xy(), (3.0, 4.0));
    assert_eq!(scene.index_in_parent(morph).unwrap(), Some(1));

    let new_handle = node.display_handle();
    assert_ne!(new_handle, old_handle);
    let backend = scene.backend();
    assert!(!backend.is_live(old_handle));
    let root_display = backend.get(scene.node(root).unwrap().display_handle()).unwrap();
    assert_eq!(root_display.children[1], new_handle);
    assert_eq!(root_display.children.len(), 3);
    let display = backend.get(new_handle).unwrap();
    assert_eq!(display.opacity, 0.5);
    assert_eq!(display.position, (3.0, 4.0));
}

/// A group becomes a paintable with an empty geometry buffer; its old
/// subtree is destroyed.
#[test]
fn retype_group_to_paintable() {
    let doc = LayerNode::group(
        "root",
        vec![LayerNode::group("g", vec![leaf("a"), leaf("b")])],
    );
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let g = scene.children(root).unwrap()[0];
    let old_children = scene.children(g).unwrap().to_vec();

    scene.retype(g, NodeKind::Paintable).unwrap();

    let node = scene.node(g).unwrap();
    assert_eq!(node.kind(), NodeKind::Paintable);
    assert!(node.children().is_empty());
    assert_eq!(node.geometry().unwrap().vertex_count(), 0);
    for child in old_children {
        assert!(!scene.contains(child));
    }
    assert_eq!(scene.backend().live_count(), 2);

    // Position writes reach the new display object.
    scene.set_xy(g, 9.0, 9.0).unwrap();
    let handle = scene.node(g).unwrap().display_handle();
    assert_eq!(scene.backend().get(handle).unwrap().position, (9.0, 9.0));

    // Back again: children come from the document node.
    scene.retype(g, NodeKind::Group).unwrap();
    assert_eq!(scene.children(g).unwrap().len(), 2);
    assert_eq!(scene.backend().live_count(), 4);

    assert!(matches!(
        scene.retype(g, NodeKind::Text),
        Err(SceneError::InvalidRetype(_, "text"))
    ));
}

/// Siblings clipped against a retyped node follow it to its new display
/// object.
#[test]
fn retype_repoints_sibling_masks() {
    let doc = LayerNode::group("root", vec![leaf("base"), leaf("clipped").clipped()]);
    let mut scene = scene();
    let root = scene.build(&doc, None).unwrap();
    let [base, clipped] = [0, 1].map(|i| scene.children(root).unwrap()[i]);

    scene.retype(base, NodeKind::Group).unwrap();

    assert_eq!(scene.node(clipped).unwrap().mask(), Some(base));
    let base_handle = scene.node(base).unwrap().display_handle();
    let clipped_handle = scene.node(clipped).unwrap().display_handle();
    assert_eq!(
        scene.backend().get(clipped_handle).unwrap().mask,
        Some(base_handle)
    );
}

/// Renaming and blend-mode writes land in the stored document node.
#[test]
fn property_writes_reach_source() {
    let mut scene = scene();
    let id = scene.build(&leaf("old"), None).unwrap();
    scene.set_name(id, "new").unwrap();
    scene
        .set_blend_mode(id, psd_scene_core::RendererBlendMode::ColorDodge)
        .unwrap();
    scene.set_z_index(id, 4).unwrap();

    let node = scene.node(id).unwrap();
    assert_eq!(node.name(), "new");
    assert_eq!(node.z_index(), 4);
    assert_eq!(node.source().name.as_deref(), Some("new"));
    assert_eq!(node.source().blend_mode.as_deref(), Some("color dodge"));
    let backend = scene.backend();
    let display = backend.get(node.display_handle()).unwrap();
    assert_eq!(display.label.as_deref(), Some("new"));
    assert_eq!(display.z_index, 4);
}

/// A wireframe has one closed subpath per triangle.
#[test]
fn wireframe_outlines_triangles() {
    let geometry = GeometryBuffer::quad(2.0, 2.0);
    let path = geometry.wireframe();
    let closes = path
        .elements()
        .iter()
        .filter(|el| matches!(el, kurbo::PathEl::ClosePath))
        .count();
    assert_eq!(closes, 2);
}
