use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    fs::OpenOptions,
    process::{Child, Command},
};

use super::traits::CameraBackend;

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    device: String,
    input_format: String,
}

impl FfmpegBackend {
    pub fn new(device: String, input_format: String) -> Self {
        Self {
            device,
            input_format,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    async fn request_access(&self) -> Result<()> {
        OpenOptions::new()
            .read(true)
            .open(&self.device)
            .await
            .with_context(|| format!("cannot open camera device {}", self.device))?;
        Ok(())
    }

    async fn spawn_stream(&self) -> Result<Child> {
        let child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-input_format",
                &self.input_format,
                "-i",
                &self.device,
                "-an",
                "-f",
                "mpjpeg",
                "-boundary_tag",
                "emocam",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn ffmpeg capture process")?;

        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use crate::camera::traits::CameraBackend;

    use super::FfmpegBackend;

    #[tokio::test]
    async fn missing_device_is_refused() {
        let backend = FfmpegBackend::new(
            "/dev/emocam-no-such-device".to_string(),
            "mjpeg".to_string(),
        );

        let err = backend
            .request_access()
            .await
            .expect_err("missing device should be refused");
        assert!(err.to_string().contains("/dev/emocam-no-such-device"));
    }
}
