//! Debounced preview driver.
//!
//! A [`RenderSession`] re-renders whenever its inputs change and exposes the
//! latest frame through a [`tokio::sync::watch`] channel. Updates that arrive
//! within the debounce window restart it, and a render whose inputs were
//! superseded while it ran is dropped instead of published: the display only
//! ever sees the frame for the newest inputs.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::compositor::Compositor;
use crate::spec::PlacementSpec;

/// Latest preview state published by a [`RenderSession`].
#[derive(Debug, Clone, Default)]
pub enum Preview {
    /// Nothing has been rendered yet.
    #[default]
    Idle,
    /// Rendered frame for the given input generation.
    Ready {
        /// Input generation the frame was rendered from.
        generation: u64,
        /// The rendered image.
        image: Arc<RgbaImage>,
    },
    /// The inputs of the given generation were rejected.
    Rejected {
        /// Input generation that failed.
        generation: u64,
        /// Why the render was rejected.
        reason: String,
    },
}

impl Preview {
    /// Input generation this state belongs to, if any.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        match self {
            Preview::Idle => None,
            Preview::Ready { generation, .. } | Preview::Rejected { generation, .. } => {
                Some(*generation)
            }
        }
    }
}

#[derive(Clone)]
struct Inputs {
    generation: u64,
    base: Arc<RgbaImage>,
    spec: PlacementSpec,
}

/// Interactive preview driver around a [`Compositor`].
///
/// Must be created inside a tokio runtime. Dropping the session stops its
/// background task.
pub struct RenderSession {
    inputs: watch::Sender<Option<Inputs>>,
    output: watch::Receiver<Preview>,
    task: JoinHandle<()>,
}

impl RenderSession {
    /// Start a session rendering with `compositor`, waiting `debounce` after
    /// the last change before rendering.
    #[must_use]
    pub fn spawn(compositor: Compositor, debounce: Duration) -> Self {
        let (inputs_tx, inputs_rx) = watch::channel(None);
        let (output_tx, output_rx) = watch::channel(Preview::Idle);
        let task = tokio::spawn(run(compositor, debounce, inputs_rx, output_tx));

        Self {
            inputs: inputs_tx,
            output: output_rx,
            task,
        }
    }

    /// Replace the inputs and schedule a re-render. Returns the new generation.
    ///
    /// The generation is assigned under the channel's write lock, so the stored
    /// inputs always carry the highest generation handed out.
    pub fn update(&self, base: Arc<RgbaImage>, spec: PlacementSpec) -> u64 {
        let mut generation = 0;
        self.inputs.send_modify(|slot| {
            generation = slot.as_ref().map_or(0, |prev| prev.generation) + 1;
            *slot = Some(Inputs {
                generation,
                base,
                spec,
            });
        });
        generation
    }

    /// Receiver notified whenever a new preview is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Preview> {
        self.output.clone()
    }

    /// Snapshot of the latest published preview.
    #[must_use]
    pub fn latest(&self) -> Preview {
        self.output.borrow().clone()
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    compositor: Compositor,
    debounce: Duration,
    mut inputs: watch::Receiver<Option<Inputs>>,
    output: watch::Sender<Preview>,
) {
    while inputs.changed().await.is_ok() {
        // Restart the debounce window on every newer change.
        loop {
            tokio::select! {
                changed = inputs.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = tokio::time::sleep(debounce) => break,
            }
        }

        let Some(request) = inputs.borrow_and_update().clone() else {
            continue;
        };
        let generation = request.generation;
        tracing::trace!(generation, "preview render started");

        let renderer = compositor.clone();
        let rendered =
            tokio::task::spawn_blocking(move || renderer.render(&request.base, &request.spec))
                .await;

        let superseded = inputs
            .borrow()
            .as_ref()
            .is_some_and(|latest| latest.generation != generation);
        if superseded {
            tracing::trace!(generation, "preview render superseded");
            continue;
        }

        let preview = match rendered {
            Ok(Ok(image)) => Preview::Ready {
                generation,
                image: Arc::new(image),
            },
            Ok(Err(e)) => Preview::Rejected {
                generation,
                reason: e.to_string(),
            },
            Err(e) => Preview::Rejected {
                generation,
                reason: format!("render task failed: {e}"),
            },
        };
        output.send_replace(preview);
    }
}
