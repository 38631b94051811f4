use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::info;

use crate::{
    app_state::AppState,
    camera::live_view::VideoFrame,
    core::{
        errors::AppError,
        state::{CameraState, DisplaySnapshot, StatusMessage},
    },
};

const STREAM_BOUNDARY: &str = "emocam";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    display: DisplaySnapshot,
    camera: CameraState,
    busy: bool,
    frame_width: u32,
    frame_height: u32,
}

pub async fn root() -> Redirect {
    Redirect::to("/static/index.html")
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = state.display.snapshot().await;
    let color = match snapshot.status {
        StatusMessage::RequestingCamera => "is-info",
        StatusMessage::CameraReady => "is-success",
        StatusMessage::CameraDenied => "is-danger",
        StatusMessage::BackendUnreachable => "is-warning",
    };

    Html(format!(
        "<span class=\"tag {color} is-medium\">{}</span>",
        escape_html(snapshot.status_text)
    ))
}

pub async fn emotion(State(state): State<Arc<AppState>>) -> Html<String> {
    let text = state.display.emotion_text().await;
    Html(format!(
        "<span class=\"title is-3\">{}</span>",
        escape_html(&text)
    ))
}

pub async fn state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let frame = state.live_view.latest_frame();
    Json(StateResponse {
        display: state.display.snapshot().await,
        camera: state.live_view.camera_state(),
        busy: state.busy.is_busy(),
        frame_width: frame.as_ref().map_or(0, |f| f.width),
        frame_height: frame.as_ref().map_or(0, |f| f.height),
    })
}

pub async fn frame(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let frame = state
        .live_view
        .latest_frame()
        .ok_or_else(|| AppError::conflict("no camera frame yet; wait a moment and retry"))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((StatusCode::OK, headers, frame.jpeg.clone()).into_response())
}

pub async fn stream(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let camera = state.live_view.camera_state();
    if matches!(camera, CameraState::Denied | CameraState::Ended) {
        return Err(AppError::conflict(format!(
            "camera is not streaming ({camera:?})"
        )));
    }

    let parts = WatchStream::new(state.live_view.subscribe()).filter_map(|slot| {
        slot.map(|frame| Ok::<Bytes, Infallible>(mjpeg_part(&frame)))
    });
    info!("live view client attached");

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("multipart/x-mixed-replace; boundary=emocam"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((StatusCode::OK, headers, Body::from_stream(parts)).into_response())
}

fn mjpeg_part(frame: &VideoFrame) -> Bytes {
    let header = format!(
        "--{STREAM_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.jpeg.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + frame.jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(&frame.jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
