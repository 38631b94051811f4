pub mod busy;
pub mod smoothing;

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
    camera::traits::VideoSource,
    capture::surface::CaptureSurface,
    config::AppConfig,
    core::{
        errors::CycleError,
        state::{DisplayBoard, StatusMessage},
    },
    predict::{Prediction, PredictionClient},
};

use self::{busy::BusyFlag, smoothing::EmotionVote};

#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub poll_interval: Duration,
    pub jpeg_quality: u8,
    pub smoothing_window: usize,
}

impl SamplerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            jpeg_quality: config.jpeg_quality,
            smoothing_window: config.smoothing_window,
        }
    }
}

struct Shared<V, P> {
    source: V,
    client: P,
    display: Arc<DisplayBoard>,
    surface: Mutex<CaptureSurface>,
    vote: tokio::sync::Mutex<EmotionVote>,
    jpeg_quality: u8,
}

/// Periodically turns the current camera frame into an emotion label.
///
/// At most one capture-and-upload cycle is in flight; ticks that land while
/// one is running are dropped, never queued. In-flight cycles are not
/// cancelled or timed out here (the client may carry its own timeout).
pub struct FrameSampler<V, P> {
    shared: Arc<Shared<V, P>>,
    busy: BusyFlag,
    poll_interval: Duration,
}

impl<V: VideoSource, P: PredictionClient> FrameSampler<V, P> {
    pub fn new(source: V, client: P, display: Arc<DisplayBoard>, settings: SamplerSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                client,
                display,
                surface: Mutex::new(CaptureSurface::new()),
                vote: tokio::sync::Mutex::new(EmotionVote::new(settings.smoothing_window)),
                jpeg_quality: settings.jpeg_quality,
            }),
            busy: BusyFlag::new(),
            poll_interval: settings.poll_interval,
        }
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Ticks every poll interval, starting one interval from now. Never returns.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("sampling camera every {:?}", self.poll_interval);

        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// Starts a cycle unless one is in flight or the camera has no frame.
    /// Returns the cycle's task when one was started.
    pub fn tick(&self) -> Option<JoinHandle<()>> {
        if self.shared.source.video_width() == 0 {
            return None;
        }
        let guard = self.busy.try_acquire()?;

        let shared = self.shared.clone();
        Some(tokio::spawn(async move {
            let outcome = run_cycle(&shared).await;
            shared.apply(outcome).await;
            drop(guard);
        }))
    }
}

impl<V: VideoSource, P: PredictionClient> Shared<V, P> {
    async fn apply(&self, outcome: Result<Prediction, CycleError>) {
        match outcome {
            Ok(prediction) => {
                let label = self.vote.lock().await.push(prediction.emotion);
                debug!("emotion: {label}");
                self.display.show_emotion(label).await;
            }
            Err(err) => {
                warn!("sampling cycle failed: {err}");
                self.display
                    .set_status(StatusMessage::BackendUnreachable)
                    .await;
            }
        }
    }
}

async fn run_cycle<V, P>(shared: &Arc<Shared<V, P>>) -> Result<Prediction, CycleError>
where
    V: VideoSource,
    P: PredictionClient,
{
    let worker = shared.clone();
    let image = tokio::task::spawn_blocking(move || {
        capture_frame(&worker.source, &worker.surface, worker.jpeg_quality)
    })
    .await??;

    shared.client.predict(image).await
}

fn capture_frame<V: VideoSource>(
    source: &V,
    surface: &Mutex<CaptureSurface>,
    quality: u8,
) -> Result<Vec<u8>, CycleError> {
    let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
    source.draw_frame(&mut surface)?;
    let (width, height) = surface.dimensions();
    debug!("captured {width}x{height} frame");
    surface.encode_jpeg(quality)
}
