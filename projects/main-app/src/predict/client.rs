use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use tracing::debug;

use crate::core::errors::CycleError;

use super::{Prediction, PredictionClient};

pub const UPLOAD_FIELD: &str = "file";

/// Posts frames as `multipart/form-data` and reads `{"emotion": ...}` back.
#[derive(Clone)]
pub struct HttpPredictionClient {
    url: String,
    client: Client,
}

impl HttpPredictionClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("failed to build prediction http client")?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, image: Vec<u8>) -> Result<Prediction, CycleError> {
        let size = image.len();
        let part = Part::bytes(image)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let body = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("prediction for {size} byte frame: {} byte response", body.len());

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        Json, Router,
        extract::Multipart,
        http::StatusCode,
        response::IntoResponse,
        routing::post,
    };
    use serde_json::json;

    use crate::{
        core::errors::CycleError,
        predict::{Prediction, PredictionClient},
    };

    use super::{HttpPredictionClient, UPLOAD_FIELD};

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    async fn echo_field_size(mut multipart: Multipart) -> impl IntoResponse {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some(UPLOAD_FIELD) {
                let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
                return (StatusCode::OK, Json(json!({ "emotion": format!("seen-{size}") })))
                    .into_response();
            }
        }
        (StatusCode::UNPROCESSABLE_ENTITY, "missing file field").into_response()
    }

    #[tokio::test]
    async fn uploads_image_under_file_field() {
        let addr = serve(Router::new().route("/api/predict", post(echo_field_size))).await;
        let client = HttpPredictionClient::new(format!("http://{addr}/api/predict"), None)
            .expect("client should build");

        let prediction = client
            .predict(vec![1, 2, 3, 4])
            .await
            .expect("prediction should succeed");
        assert_eq!(
            prediction,
            Prediction {
                emotion: "seen-4".to_string()
            }
        );
    }

    #[tokio::test]
    async fn server_error_is_a_failure() {
        let app = Router::new().route(
            "/api/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "boom" }))) }),
        );
        let addr = serve(app).await;
        let client = HttpPredictionClient::new(format!("http://{addr}/api/predict"), None)
            .expect("client should build");

        let err = client.predict(vec![0]).await.expect_err("500 should fail");
        assert!(matches!(err, CycleError::Request(_)));
    }

    #[tokio::test]
    async fn body_without_emotion_is_a_failure() {
        let app = Router::new().route(
            "/api/predict",
            post(|| async { Json(json!({ "status": "API running" })) }),
        );
        let addr = serve(app).await;
        let client = HttpPredictionClient::new(format!("http://{addr}/api/predict"), None)
            .expect("client should build");

        let err = client
            .predict(vec![0])
            .await
            .expect_err("missing emotion should fail");
        assert!(matches!(err, CycleError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have addr");
        drop(listener);

        let client = HttpPredictionClient::new(format!("http://{addr}/api/predict"), None)
            .expect("client should build");
        let err = client
            .predict(vec![0])
            .await
            .expect_err("closed port should fail");
        assert!(matches!(err, CycleError::Request(_)));
    }
}
