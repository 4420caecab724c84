//! Identification Service
//!
//! Owns the label catalog and the (optional) model. Built once at startup
//! and shared through `AppState`; nothing here is mutated afterwards.
//!
//! Per request: validate -> persist -> classify -> enrich -> respond.
//! The persisted upload is a scoped temp file, removed on every path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{fallback, Candidate, ClassifierError, Identification, LabelCatalog, Method, ModelClassifier, ALLOWED_EXTENSIONS};
use crate::config::Config;
use crate::models::{PokemonDetail, PokemonDirectory};
use crate::{AppError, AppResult};

/// A validated upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub name: String,
    pub confidence: f64,
    pub top_3: Vec<Candidate>,
    pub pokemon: Option<PokemonDetail>,
    pub method: Method,
}

/// Classifier state for operators
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierStatus {
    pub model_loaded: bool,
    pub method: Method,
    pub labels: usize,
    pub input_size: Option<(u32, u32)>,
}

#[derive(Debug)]
pub struct IdentificationService {
    catalog: LabelCatalog,
    model: Option<ModelClassifier>,
    upload_dir: PathBuf,
}

/// Accept only `<name>.<allowed ext>`; extension is case-insensitive
pub fn validate_filename(filename: Option<&str>) -> Result<&str, ClassifierError> {
    let filename = filename.ok_or(ClassifierError::NoFile)?;
    if filename.is_empty() {
        return Err(ClassifierError::EmptyFilename);
    }

    let allowed = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));

    if !allowed {
        return Err(ClassifierError::UnsupportedExtension(filename.to_string()));
    }
    Ok(filename)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge("File too large".to_string());
    }
    AppError::ValidationError(err.body_text())
}

impl Upload {
    /// Pull the `file` field out of a multipart body. The filename is
    /// checked before the body of the field is read.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            if field.name() != Some("file") {
                continue;
            }

            let filename = validate_filename(field.file_name())?.to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(multipart_error)?;

            return Ok(Upload { filename, bytes: bytes.to_vec() });
        }

        Err(ClassifierError::NoFile.into())
    }
}

impl IdentificationService {
    /// Load the catalog and try the model once. A model that fails to
    /// load leaves the fallback in charge until restart.
    pub fn initialize(config: &Config) -> Self {
        let catalog = LabelCatalog::load(&config.class_indices_path);

        let model = match ModelClassifier::load(&config.model_path) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!("Model unavailable ({}), using fallback prediction mode", e);
                None
            }
        };

        Self::new(catalog, model, config.upload_dir.clone())
    }

    pub fn new(catalog: LabelCatalog, model: Option<ModelClassifier>, upload_dir: PathBuf) -> Self {
        let service = Self { catalog, model, upload_dir };
        let status = service.status();
        tracing::info!(
            "Identification service ready: method={:?}, labels={}",
            status.method, status.labels
        );
        service
    }

    pub fn is_model_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn status(&self) -> ClassifierStatus {
        ClassifierStatus {
            model_loaded: self.is_model_available(),
            method: if self.is_model_available() { Method::Model } else { Method::Fallback },
            labels: self.catalog().len(),
            input_size: self.model.as_ref().map(ModelClassifier::input_size),
        }
    }

    /// Persist, classify and clean up. Blocking; run off the async runtime.
    pub fn identify(&self, bytes: &[u8]) -> Result<Identification, ClassifierError> {
        let upload = self.persist(bytes)?;
        let result = self.classify(upload.path());

        if let Err(e) = upload.close() {
            tracing::warn!("Failed to remove upload file: {}", e);
        }
        result
    }

    fn persist(&self, bytes: &[u8]) -> Result<NamedTempFile, ClassifierError> {
        std::fs::create_dir_all(&self.upload_dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.upload_dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(file)
    }

    fn classify(&self, path: &Path) -> Result<Identification, ClassifierError> {
        match &self.model {
            Some(model) => {
                tracing::debug!("Using ML model for prediction");
                model.classify(path, &self.catalog)
            }
            None => {
                tracing::debug!("Using fallback prediction mode");
                let bytes = std::fs::read(path)?;
                fallback::select(&bytes, &self.catalog)
            }
        }
    }

    /// Full request flow for a validated upload
    pub async fn handle(
        self: Arc<Self>,
        upload: Upload,
        directory: &dyn PokemonDirectory,
    ) -> AppResult<IdentifyResponse> {
        let filename = upload.filename;
        let bytes = upload.bytes;

        let identification = tokio::task::spawn_blocking(move || self.identify(&bytes))
            .await
            .map_err(|e| AppError::InternalError(format!("Identification task failed: {}", e)))??;

        tracing::info!(
            "Identified {} as {} ({:.2}%, {:?})",
            filename, identification.label, identification.confidence, identification.method
        );

        let pokemon = directory.find_by_name(&identification.label).await?;

        Ok(IdentifyResponse {
            name: identification.label,
            confidence: round_2(identification.confidence),
            top_3: identification.top_3,
            pokemon,
            method: identification.method,
        })
    }
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::pokemon::sample;

    /// In-memory stand-in for the database
    pub struct StaticDirectory(pub HashMap<String, PokemonDetail>);

    impl StaticDirectory {
        pub fn with(names: &[&str]) -> Self {
            let entries = names.iter().enumerate().map(|(i, name)| {
                let id = i as i32 + 1;
                let detail = sample(id, id, name, "Normal", None).into_detail(Vec::new());
                (name.to_lowercase(), detail)
            });
            Self(entries.collect())
        }
    }

    #[axum::async_trait]
    impl PokemonDirectory for StaticDirectory {
        async fn find_by_name(&self, name: &str) -> AppResult<Option<PokemonDetail>> {
            Ok(self.0.get(&name.to_lowercase()).cloned())
        }
    }

    pub fn starters() -> LabelCatalog {
        [(0, "Bulbasaur"), (1, "Charmander"), (2, "Squirtle")].into_iter().collect()
    }

    fn leftover_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_validate_filename() {
        assert!(matches!(validate_filename(None), Err(ClassifierError::NoFile)));
        assert!(matches!(validate_filename(Some("")), Err(ClassifierError::EmptyFilename)));
        assert!(matches!(validate_filename(Some("notes.txt")), Err(ClassifierError::UnsupportedExtension(_))));
        assert!(matches!(validate_filename(Some("png")), Err(ClassifierError::UnsupportedExtension(_))));

        for ok in ["pika.png", "PIKA.JPG", "a.b.jpeg", "x.gif", "y.WebP"] {
            assert_eq!(validate_filename(Some(ok)).unwrap(), ok);
        }
    }

    #[test]
    fn test_identify_without_model_uses_fallback_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let service = IdentificationService::new(starters(), None, uploads.clone());

        let bytes = b"not really a png".to_vec();
        let first = service.identify(&bytes).unwrap();
        let second = service.identify(&bytes).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, fallback::select(&bytes, &starters()).unwrap());
        assert_eq!(leftover_files(&uploads), 0);
    }

    #[test]
    fn test_identify_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let service = IdentificationService::new(LabelCatalog::default(), None, dir.path().to_path_buf());

        let err = service.identify(b"bytes").unwrap_err();

        assert!(matches!(err, ClassifierError::EmptyCatalog));
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[test]
    fn test_status_reports_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let service = IdentificationService::new(starters(), None, dir.path().to_path_buf());
        let status = service.status();

        assert!(!status.model_loaded);
        assert_eq!(status.method, Method::Fallback);
        assert_eq!(status.labels, 3);
        assert_eq!(status.input_size, None);
    }

    #[test]
    fn test_initialize_with_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_env();
        config.model_path = dir.path().join("missing.onnx");
        config.class_indices_path = dir.path().join("missing.json");
        config.upload_dir = dir.path().join("uploads");

        let service = IdentificationService::initialize(&config);

        assert!(!service.is_model_available());
        assert!(service.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_handle_enriches_and_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(IdentificationService::new(starters(), None, dir.path().to_path_buf()));
        let directory = StaticDirectory::with(&["Bulbasaur", "Charmander", "Squirtle"]);

        let upload = Upload { filename: "mystery.png".to_string(), bytes: vec![1, 2, 3, 4] };
        let expected = fallback::select(&upload.bytes, &starters()).unwrap();

        let response = service.handle(upload, &directory).await.unwrap();

        assert_eq!(response.name, expected.label);
        assert_eq!(response.confidence, round_2(expected.confidence));
        assert_eq!(response.top_3.len(), 3);
        assert_eq!(response.method, Method::Fallback);
        assert_eq!(response.pokemon.unwrap().pokemon.name, expected.label);
    }

    #[tokio::test]
    async fn test_handle_unknown_species_has_null_pokemon() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(IdentificationService::new(starters(), None, dir.path().to_path_buf()));
        let directory = StaticDirectory::with(&[]);

        let upload = Upload { filename: "mystery.jpg".to_string(), bytes: vec![9; 64] };
        let response = service.handle(upload, &directory).await.unwrap();

        assert!(response.pokemon.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["pokemon"].is_null());
        assert_eq!(json["method"], "fallback");
    }

    #[test]
    fn test_round_2() {
        assert_eq!(round_2(87.123456), 87.12);
        assert_eq!(round_2(65.0), 65.0);
    }
}
