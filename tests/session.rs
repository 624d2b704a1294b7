#![cfg(feature = "session")]

use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use text_watermark::{BlockGlyphs, Compositor, PlacementSpec, Preview, RenderSession};

const WAIT: Duration = Duration::from_secs(5);

fn session() -> RenderSession {
    RenderSession::spawn(
        Compositor::new(Arc::new(BlockGlyphs)),
        Duration::from_millis(20),
    )
}

fn base() -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(120, 80, Rgba([10, 10, 10, 255])))
}

async fn next_settled(rx: &mut tokio::sync::watch::Receiver<Preview>) -> Preview {
    tokio::time::timeout(WAIT, rx.wait_for(|p| !matches!(p, Preview::Idle)))
        .await
        .expect("preview timed out")
        .expect("session stopped")
        .clone()
}

#[tokio::test]
async fn renders_the_latest_inputs() {
    let session = session();
    let mut rx = session.subscribe();
    let generation = session.update(base(), PlacementSpec::with_text("preview"));

    match next_settled(&mut rx).await {
        Preview::Ready {
            generation: got,
            image,
        } => {
            assert_eq!(got, generation);
            assert_eq!(image.dimensions(), (120, 80));
            assert_ne!(*image, *base());
        }
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[tokio::test]
async fn rapid_updates_only_publish_the_last_generation() {
    let session = session();
    let mut rx = session.subscribe();
    session.update(base(), PlacementSpec::with_text("one"));
    session.update(base(), PlacementSpec::with_text("two"));
    let last = session.update(base(), PlacementSpec::with_text("three"));

    let first = next_settled(&mut rx).await;
    assert_eq!(first.generation(), Some(last));

    let expected = Compositor::new(Arc::new(BlockGlyphs))
        .render(&base(), &PlacementSpec::with_text("three"))
        .unwrap();
    match first {
        Preview::Ready { image, .. } => assert_eq!(*image, expected),
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_inputs_are_reported_as_rejected() {
    let session = session();
    let mut rx = session.subscribe();
    let spec = PlacementSpec {
        opacity: 1.5,
        ..PlacementSpec::with_text("bad")
    };
    let generation = session.update(base(), spec);

    match next_settled(&mut rx).await {
        Preview::Rejected {
            generation: got,
            reason,
        } => {
            assert_eq!(got, generation);
            assert!(reason.contains("opacity"));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert!(matches!(session.latest(), Preview::Rejected { .. }));
}

#[tokio::test]
async fn a_later_update_replaces_an_earlier_frame() {
    let session = session();
    let mut rx = session.subscribe();
    let first = session.update(base(), PlacementSpec::with_text("first"));
    assert_eq!(next_settled(&mut rx).await.generation(), Some(first));

    let second = session.update(base(), PlacementSpec::default());
    let frame = tokio::time::timeout(WAIT, rx.wait_for(|p| p.generation() == Some(second)))
        .await
        .expect("preview timed out")
        .expect("session stopped")
        .clone();
    match frame {
        Preview::Ready { image, .. } => assert_eq!(*image, *base()),
        other => panic!("expected a frame, got {other:?}"),
    }
}
