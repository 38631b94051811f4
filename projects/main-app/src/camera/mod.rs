pub mod ffmpeg_backend;
pub mod jpeg;
pub mod live_view;
pub mod traits;

use anyhow::Context;
use tracing::{info, warn};

use crate::core::state::{DisplayBoard, StatusMessage};

use self::{live_view::FrameFeed, traits::CameraBackend};

/// Asks for the camera and attaches its stream to `feed`. A refusal is final
/// for the session: the feed's view never produces a frame.
pub async fn start_camera<B: CameraBackend>(backend: &B, display: &DisplayBoard, feed: FrameFeed) {
    let stream = match backend.request_access().await {
        Ok(()) => backend.spawn_stream().await.and_then(|mut child| {
            let stdout = child
                .stdout
                .take()
                .context("missing ffmpeg stdout pipe for capture")?;
            Ok((child, stdout))
        }),
        Err(err) => Err(err),
    };

    match stream {
        Ok((child, stdout)) => {
            feed.attach_child(child, stdout);
            info!("camera stream attached");
            display.set_status(StatusMessage::CameraReady).await;
        }
        Err(err) => {
            warn!("camera access denied: {err:#}");
            feed.deny();
            display.set_status(StatusMessage::CameraDenied).await;
        }
    }
}
