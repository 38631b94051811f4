use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, ChildStdout},
    sync::watch,
};
use tracing::{debug, info, warn};

use crate::{
    capture::surface::CaptureSurface,
    core::{errors::CycleError, state::CameraState},
};

use super::{
    jpeg::{JpegFrameAccumulator, jpeg_dimensions},
    traits::VideoSource,
};

#[derive(Debug)]
pub struct VideoFrame {
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
}

pub type FrameSlot = Option<Arc<VideoFrame>>;

/// Cloneable view of the camera: the most recent frame plus the stream state.
#[derive(Clone)]
pub struct LiveView {
    frames: watch::Receiver<FrameSlot>,
    state: watch::Receiver<CameraState>,
}

/// Producer side of a [`LiveView`]. Whoever resolves camera access either
/// attaches a stream to it or marks it denied.
pub struct FrameFeed {
    frames: watch::Sender<FrameSlot>,
    state: watch::Sender<CameraState>,
}

impl LiveView {
    /// A view in `Pending` state, plus the feed that will fill it.
    pub fn pending() -> (Self, FrameFeed) {
        let (frame_tx, frames) = watch::channel(None);
        let (state_tx, state) = watch::channel(CameraState::Pending);
        (
            Self { frames, state },
            FrameFeed {
                frames: frame_tx,
                state: state_tx,
            },
        )
    }

    /// A view that never produces frames.
    pub fn detached(state: CameraState) -> Self {
        let (view, feed) = Self::pending();
        feed.state.send_replace(state);
        view
    }

    #[cfg(test)]
    pub fn attach<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (view, feed) = Self::pending();
        feed.attach(reader);
        view
    }

    pub fn latest_frame(&self) -> FrameSlot {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FrameSlot> {
        self.frames.clone()
    }

    pub fn camera_state(&self) -> CameraState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<CameraState> {
        self.state.clone()
    }
}

impl FrameFeed {
    pub fn deny(self) {
        self.state.send_replace(CameraState::Denied);
    }

    /// Starts reading MJPEG from `reader`. The view reports `Ready` until the
    /// reader hits EOF or an error, then `Ended` with no frame.
    pub fn attach<R>(self, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.state.send_replace(CameraState::Ready);
        tokio::spawn(async move {
            pump_frames(reader, &self.frames).await;
            self.frames.send_replace(None);
            self.state.send_replace(CameraState::Ended);
        });
    }

    /// Attaches a capture process's stdout and reaps the process once the
    /// stream ends.
    pub fn attach_child(self, mut child: Child, stdout: ChildStdout) {
        let mut state = self.state.subscribe();
        self.attach(stdout);

        tokio::spawn(async move {
            let _ = state.wait_for(|s| *s == CameraState::Ended).await;
            if let Err(err) = child.kill().await {
                warn!("failed to kill ffmpeg capture child: {err}");
            }
            match child.wait().await {
                Ok(status) => info!("ffmpeg capture exited with {status}"),
                Err(err) => warn!("failed to wait ffmpeg capture child: {err}"),
            }
        });
    }
}

async fn pump_frames<R>(mut reader: R, frames: &watch::Sender<FrameSlot>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0_u8; 16 * 1024];
    let mut accumulator = JpegFrameAccumulator::new();
    let mut first_frame = true;

    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => {
                info!("camera stream closed");
                return;
            }
            Ok(n) => n,
            Err(err) => {
                warn!("camera stream read failed: {err}");
                return;
            }
        };

        let Some(jpeg) = accumulator.push_chunk(&buffer[..n]) else {
            continue;
        };
        let Some((width, height)) = jpeg_dimensions(&jpeg) else {
            debug!("dropping camera frame with unreadable header");
            continue;
        };
        if first_frame {
            info!("first camera frame {width}x{height}");
            first_frame = false;
        }
        frames.send_replace(Some(Arc::new(VideoFrame {
            jpeg,
            width,
            height,
        })));
    }
}

impl VideoSource for LiveView {
    fn video_width(&self) -> u32 {
        self.frames.borrow().as_ref().map_or(0, |frame| frame.width)
    }

    fn draw_frame(&self, surface: &mut CaptureSurface) -> Result<(), CycleError> {
        // One snapshot for both the size and the pixels; the slot may be
        // replaced by the reader task at any time.
        let frame = self.latest_frame().ok_or(CycleError::EmptyFrame)?;
        let decoded = image::load_from_memory_with_format(&frame.jpeg, ImageFormat::Jpeg)
            .map_err(CycleError::Decode)?
            .to_rgb8();
        surface.resize(frame.width, frame.height);
        surface.draw(&decoded);
        Ok(())
    }
}
