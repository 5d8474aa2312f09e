//! Texture Attach Tests
//!
//! Raster payloads decode off-thread; these tests drain the results and check
//! what reaches the display meshes.

use psd_data::LayerNode;
use psd_scene_core::{
    NodeKind, RetainedBackend, Scene, SceneConfig, TextureEvent, TextureState,
};

fn red_pixels(width: u32, height: u32) -> Vec<u8> {
    [255u8, 0, 0, 255].repeat((width * height) as usize)
}

/// Construction does not wait for textures; draining attaches them.
#[test]
fn texture_attaches_after_drain() {
    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let id = scene
        .build(&LayerNode::raster("red", 2, 2, red_pixels(2, 2)), None)
        .unwrap();

    assert_eq!(scene.texture_state(id).unwrap(), Some(TextureState::Pending));
    let handle = scene.node(id).unwrap().display_handle();

    let events = scene.finish_textures();
    assert_eq!(events, vec![TextureEvent::Ready(id)]);
    assert_eq!(scene.texture_state(id).unwrap(), Some(TextureState::Ready));
    assert_eq!(scene.pending_textures(), 0);

    let backend = scene.backend();
    let texture = backend.get(handle).unwrap().texture().unwrap();
    let pixmap = texture.pixmap().expect("decoded texture");
    assert_eq!((pixmap.width(), pixmap.height()), (2, 2));
    let px = pixmap.pixel(0, 0).unwrap();
    assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (255, 0, 0, 255));
}

/// A pixel buffer that does not match its dimensions fails, and the mesh
/// keeps its placeholder.
#[test]
fn malformed_pixels_fail() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let id = scene
        .build(&LayerNode::raster("broken", 4, 4, vec![0u8; 7]), None)
        .unwrap();

    let events = scene.finish_textures();
    assert!(matches!(events.as_slice(), [TextureEvent::Failed { node, .. }] if *node == id));
    assert_eq!(scene.texture_state(id).unwrap(), Some(TextureState::Failed));

    let handle = scene.node(id).unwrap().display_handle();
    let backend = scene.backend();
    assert!(backend.get(handle).unwrap().texture().unwrap().is_placeholder());
}

/// Dimensions whose byte size overflows fail the decode instead of
/// aborting the worker.
#[test]
fn overflowing_dimensions_fail() {
    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let id = scene
        .build(&LayerNode::raster("huge", u32::MAX, u32::MAX, vec![0u8; 4]), None)
        .unwrap();

    let events = scene.finish_textures();
    match events.as_slice() {
        [TextureEvent::Failed { node, reason }] => {
            assert_eq!(*node, id);
            assert!(reason.contains("does not fit"), "{reason}");
        }
        other => panic!("expected one failure, got {other:?}"),
    }
    assert_eq!(scene.texture_state(id).unwrap(), Some(TextureState::Failed));
    assert_eq!(scene.pending_textures(), 0);
}

/// Results for destroyed nodes are dropped without touching any handle.
#[test]
fn destroyed_node_discards_texture() {
    let doc = LayerNode::group(
        "root",
        vec![
            LayerNode::raster("gone", 1, 1, red_pixels(1, 1)),
            LayerNode::raster("kept", 1, 1, red_pixels(1, 1)),
        ],
    );
    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let root = scene.build(&doc, None).unwrap();
    let [gone, kept] = [0, 1].map(|i| scene.children(root).unwrap()[i]);
    let gone_handle = scene.node(gone).unwrap().display_handle();

    scene.destroy(gone).unwrap();
    let events = scene.finish_textures();

    assert_eq!(events.len(), 2);
    assert!(events.contains(&TextureEvent::Discarded(gone)));
    assert!(events.contains(&TextureEvent::Ready(kept)));
    assert!(!scene.backend().is_live(gone_handle));
}

/// Retyping invalidates the decode issued for the old body.
#[test]
fn retyped_node_discards_stale_texture() {
    let doc = LayerNode::group("root", vec![LayerNode::raster("r", 1, 1, red_pixels(1, 1))]);
    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let root = scene.build(&doc, None).unwrap();
    let r = scene.children(root).unwrap()[0];

    scene.retype(r, NodeKind::Group).unwrap();
    let events = scene.finish_textures();
    assert_eq!(events, vec![TextureEvent::Discarded(r)]);
    assert_eq!(scene.texture_state(r).unwrap(), None);

    // Back to paintable: a fresh decode is issued for the stored raster.
    scene.retype(r, NodeKind::Paintable).unwrap();
    assert_eq!(scene.texture_state(r).unwrap(), Some(TextureState::Pending));
    assert_eq!(scene.finish_textures(), vec![TextureEvent::Ready(r)]);
}

/// With decoding disabled no task is scheduled.
#[test]
fn decoding_can_be_disabled() {
    let config = SceneConfig {
        decode_textures: false,
        ..SceneConfig::default()
    };
    let mut scene = Scene::new(RetainedBackend::new(), config);
    let id = scene
        .build(&LayerNode::raster("r", 1, 1, red_pixels(1, 1)), None)
        .unwrap();
    assert_eq!(scene.texture_state(id).unwrap(), Some(TextureState::None));
    assert_eq!(scene.pending_textures(), 0);
    assert!(scene.pump_textures().is_empty());
    assert!(scene.finish_textures().is_empty());
}

/// Pumping never blocks and eventually drains everything.
#[test]
fn pump_drains_without_blocking() {
    let mut scene = Scene::new(RetainedBackend::new(), SceneConfig::default());
    let id = scene
        .build(&LayerNode::raster("r", 3, 1, red_pixels(3, 1)), None)
        .unwrap();

    let mut events = Vec::new();
    while scene.pending_textures() > 0 {
        events.extend(scene.pump_textures());
        std::thread::yield_now();
    }
    assert_eq!(events, vec![TextureEvent::Ready(id)]);
}
