use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Child;

use crate::capture::surface::CaptureSurface;
use crate::core::errors::CycleError;

#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Fails when the device is missing or the process lacks permission to read it.
    async fn request_access(&self) -> Result<()>;
    /// Spawns a capture process writing MJPEG to its stdout.
    async fn spawn_stream(&self) -> Result<Child>;
}

/// Something the sampler can copy the current picture from.
pub trait VideoSource: Send + Sync + 'static {
    /// Native width of the current frame, 0 while no frame is available.
    fn video_width(&self) -> u32;
    /// Resizes `surface` to the current frame's native size and draws the
    /// frame into it. Size and pixels come from the same frame.
    fn draw_frame(&self, surface: &mut CaptureSurface) -> Result<(), CycleError>;
}
