//! Image identification handler

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::{AppState, AppResult};
use crate::classifier::{ClassifierError, IdentifyResponse, Upload};

/// Identify a Pokémon from an uploaded image
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<IdentifyResponse>> {
    // Not a multipart body at all: same answer as a form without `file`
    let multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        ClassifierError::NoFile
    })?;
    let upload = Upload::from_multipart(multipart).await?;

    let response = state.identifier.clone()
        .handle(upload, state.directory.as_ref())
        .await?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::util::ServiceExt;

    use crate::classifier::service::tests::{starters, StaticDirectory};
    use crate::classifier::IdentificationService;
    use crate::config::Config;
    use crate::{create_router, AppState};

    const BOUNDARY: &str = "pokedex-test-boundary";

    fn test_state(upload_dir: &Path) -> AppState {
        let mut config = Config::from_env();
        config.upload_dir = upload_dir.to_path_buf();

        // Never connected: the directory stands in for the database
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();

        AppState {
            pool,
            identifier: Arc::new(IdentificationService::new(starters(), None, upload_dir.to_path_buf())),
            directory: Arc::new(StaticDirectory::with(&["Bulbasaur", "Charmander", "Squirtle"])),
            config,
        }
    }

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        ).as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn extract_json(body: Body) -> Value {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_text_file_rejected_before_persist() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let app = create_router(test_state(&uploads));

        let response = app.oneshot(multipart_request("file", "notes.txt", b"hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Invalid file type");
        assert!(!uploads.exists());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app.oneshot(multipart_request("image", "pika.png", b"png")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_json_no_file() {
        let dir = tempfile::tempdir().unwrap();

        for content_type in [None, Some("application/x-www-form-urlencoded")] {
            let app = create_router(test_state(dir.path()));
            let mut request = Request::builder().method("POST").uri("/predict");
            if let Some(content_type) = content_type {
                request = request.header(CONTENT_TYPE, content_type);
            }

            let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = extract_json(response.into_body()).await;
            assert_eq!(body["error"], "No file provided");
            assert_eq!(body["status"], 400);
        }
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let mut state = test_state(&uploads);
        state.config.max_upload_bytes = 1024;
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request("file", "big.png", &[7u8; 4096]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "File too large");
        assert!(!uploads.exists());
    }

    #[tokio::test]
    async fn test_fallback_prediction_response() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let app = create_router(test_state(&uploads));

        let response = app
            .oneshot(multipart_request("file", "Mystery.PNG", b"\x89PNG\r\n\x1a\nsome pixels"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;

        let confidence = body["confidence"].as_f64().unwrap();
        assert!((65.0..90.0).contains(&confidence));
        assert_eq!(body["top_3"].as_array().unwrap().len(), 3);
        assert_eq!(body["top_3"][0]["name"], body["name"]);
        assert_eq!(body["pokemon"]["name"], body["name"]);
        assert_eq!(body["method"], "fallback");

        // Scoped upload file is gone once the response exists
        assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_classifier_status_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let request = Request::builder()
            .uri("/api/classifier/status")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["labels"], 3);
    }
}
