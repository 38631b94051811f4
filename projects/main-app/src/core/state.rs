use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

pub const UNKNOWN_EMOTION: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Pending,
    Ready,
    Denied,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMessage {
    RequestingCamera,
    CameraReady,
    CameraDenied,
    BackendUnreachable,
}

impl StatusMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::RequestingCamera => "Requesting camera access…",
            Self::CameraReady => "Camera ready. Detecting emotion…",
            Self::CameraDenied => "Camera access denied.",
            Self::BackendUnreachable => "Backend not reachable.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplaySnapshot {
    pub status: StatusMessage,
    pub status_text: &'static str,
    pub emotion_text: String,
    pub last_emotion: String,
}

struct DisplayText {
    status: StatusMessage,
    last_emotion: String,
    emotion_text: String,
}

/// The two text regions the user sees: a status line and the current emotion.
pub struct DisplayBoard {
    text: Mutex<DisplayText>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        Self {
            text: Mutex::new(DisplayText {
                status: StatusMessage::RequestingCamera,
                last_emotion: UNKNOWN_EMOTION.to_owned(),
                emotion_text: emotion_text(UNKNOWN_EMOTION),
            }),
        }
    }

    pub async fn set_status(&self, status: StatusMessage) {
        let mut text = self.text.lock().await;
        if text.status != status {
            info!("status: {}", status.text());
        }
        text.status = status;
    }

    pub async fn show_emotion(&self, label: impl Into<String>) {
        let label = label.into();
        let mut text = self.text.lock().await;
        text.emotion_text = emotion_text(&label);
        text.last_emotion = label;
    }

    pub async fn emotion_text(&self) -> String {
        self.text.lock().await.emotion_text.clone()
    }

    pub async fn snapshot(&self) -> DisplaySnapshot {
        let text = self.text.lock().await;
        DisplaySnapshot {
            status: text.status,
            status_text: text.status.text(),
            emotion_text: text.emotion_text.clone(),
            last_emotion: text.last_emotion.clone(),
        }
    }
}

impl Default for DisplayBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn emotion_text(label: &str) -> String {
    format!("Emotion: {label}")
}
