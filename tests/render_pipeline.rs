use std::sync::Arc;
use std::time::Duration;

use pagepinch::render::{
    DocumentRenderer, RenderCompletion, RenderService, Surface, SurfaceSize,
};
use pagepinch::test_utils::{MOCK_PAGE_SIZE, MockRenderer};
use pagepinch::viewport::Transform;
use pagepinch::{Viewer, ViewerConfig};

const WAIT: Duration = Duration::from_secs(5);
const DISPLAY: SurfaceSize = SurfaceSize::new(16, 12);
const BLANK: [u8; 4] = [0, 0, 0, 0];

#[test]
fn gestures_during_a_render_collapse_into_one_follow_up() {
    let (renderer, handle) = MockRenderer::gated();
    let mut viewer = Viewer::new(renderer, ViewerConfig::default(), DISPLAY);
    viewer.init(&b"document"[..]).unwrap();

    assert!(viewer.tick().dispatched);

    viewer.on_contact_start(1, 0.0, 0.0);
    for step in 1..=10 {
        viewer.on_contact_move(1, f64::from(step) * 3.0, 0.0);
        let outcome = viewer.tick();
        assert!(!outcome.dispatched);
        assert!(outcome.in_flight);
    }
    assert!(viewer.is_dirty());
    assert_eq!(handle.render_count(), 1);

    handle.release();
    assert!(viewer.settle(WAIT));
    assert!(viewer.tick().dispatched);
    handle.release();
    assert!(viewer.settle(WAIT));

    let rendered = handle.rendered();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0], Transform::identity());
    assert_eq!(rendered[1].offset_x, 30.0);
}

#[test]
fn front_is_untouched_until_render_completes() {
    let (renderer, handle) = MockRenderer::gated();
    let mut viewer = Viewer::new(renderer, ViewerConfig::default(), DISPLAY);
    viewer.init(&b"document"[..]).unwrap();

    viewer.tick();
    for _ in 0..5 {
        assert!(!viewer.tick().swapped);
        assert_eq!(viewer.front().pixel(0, 0), Some(BLANK));
    }

    handle.release();
    // Poll through ticks rather than blocking
    let mut swapped = false;
    for _ in 0..500 {
        if viewer.tick().swapped {
            swapped = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(swapped);
    assert_eq!(viewer.front().pixel(15, 11), Some(MockRenderer::COLOR));
    assert_eq!(viewer.render_loop().frame_buffer().generation(), 1);
}

#[test]
fn render_failure_is_recovered_on_next_change() {
    let (renderer, handle) = MockRenderer::new();
    let mut viewer = Viewer::new(renderer, ViewerConfig::default(), DISPLAY);
    viewer.init(&b"document"[..]).unwrap();
    handle.fail_next(1);

    assert!(viewer.tick().dispatched);
    assert!(!viewer.settle(WAIT));
    assert_eq!(viewer.render_loop().failed_renders(), 1);
    assert_eq!(viewer.front().pixel(0, 0), Some(BLANK));

    // Failure does not re-arm the dirty flag
    assert!(!viewer.is_dirty());
    assert!(!viewer.tick().dispatched);
    assert!(viewer.is_running());

    viewer.recenter();
    assert!(viewer.tick().dispatched);
    assert!(viewer.settle(WAIT));
    assert_eq!(viewer.front().pixel(0, 0), Some(MockRenderer::COLOR));
}

#[test]
fn resize_follows_display_on_next_frame() {
    let (renderer, _handle) = MockRenderer::new();
    let mut viewer = Viewer::new(renderer, ViewerConfig::default(), DISPLAY);
    viewer.init(&b"document"[..]).unwrap();
    viewer.tick();
    viewer.settle(WAIT);
    assert_eq!(viewer.front().size(), DISPLAY);

    viewer.resize(SurfaceSize::new(30, 20));
    assert_eq!(viewer.front().size(), DISPLAY);
    assert!(viewer.tick().dispatched);
    assert!(viewer.settle(WAIT));
    assert_eq!(viewer.front().size(), SurfaceSize::new(30, 20));
}

#[test]
fn empty_display_fails_softly() {
    let (renderer, _handle) = MockRenderer::new();
    let mut viewer = Viewer::new(renderer, ViewerConfig::default(), SurfaceSize::new(0, 0));
    viewer.init(&b"document"[..]).unwrap();

    assert!(viewer.tick().dispatched);
    assert!(!viewer.settle(WAIT));
    assert_eq!(viewer.render_loop().failed_renders(), 1);
    assert!(viewer.is_running());
}

#[test]
fn service_refuses_second_render() {
    let (renderer, handle) = MockRenderer::gated();
    let mut service = RenderService::spawn(renderer);
    service
        .load_blocking(Arc::from(&b"document"[..]), 0)
        .unwrap();

    let first = service
        .dispatch(Transform::identity(), Surface::new(DISPLAY))
        .unwrap();
    let refused = service
        .dispatch(Transform::identity(), Surface::new(SurfaceSize::new(3, 3)))
        .unwrap_err();
    assert_eq!(refused.size(), SurfaceSize::new(3, 3));
    assert_eq!(service.in_flight(), Some(first));

    handle.release();
    match service.wait(WAIT) {
        Some(RenderCompletion::Rendered { id, target }) => {
            assert_eq!(id, first);
            assert_eq!(target.pixel(0, 0), Some(MockRenderer::COLOR));
        }
        other => panic!("unexpected completion: {other:?}"),
    }
    assert_eq!(service.in_flight(), None);
}

#[test]
fn mock_viewport_fits_page_width() {
    let (mut renderer, _handle) = MockRenderer::new();
    let transform = Transform {
        scale: 2.0,
        offset_x: 4.0,
        offset_y: -6.0,
    };
    let document = renderer.load(b"document").unwrap();
    let page = renderer.page(&document, 0).unwrap();
    let viewport = renderer
        .compute_viewport(&page, SurfaceSize::new(200, 100), &transform)
        .unwrap();
    let fit = 200.0 / MOCK_PAGE_SIZE.0;
    assert_eq!(viewport.scale, fit * 2.0);
    assert_eq!((viewport.offset_x, viewport.offset_y), (4.0, -6.0));
}
