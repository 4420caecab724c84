//! Classifier Module - Pokémon identification from uploaded images
//!
//! Two interchangeable strategies sit behind `IdentificationService`:
//! an ONNX model when the artifact loads, and a content-hash fallback
//! that keeps the feature usable without one.

pub mod catalog;
pub mod model;
pub mod fallback;
pub mod service;

use serde::Serialize;
use thiserror::Error;

// Re-export common types
pub use catalog::LabelCatalog;
pub use model::ModelClassifier;
pub use service::{IdentificationService, IdentifyResponse, ClassifierStatus, Upload};

/// Extensions accepted by the upload endpoint
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("No file provided")]
    NoFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type")]
    UnsupportedExtension(String),

    #[error("Failed to process image: {0}")]
    ImageDecode(String),

    #[error("No class labels loaded")]
    EmptyCatalog,

    #[error("Model not found: {0}")]
    ModelMissing(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Upload I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which strategy produced an identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Model,
    Fallback,
}

/// A single `{name, confidence}` entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub confidence: f64,
}

/// Raw strategy output before enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub label: String,
    pub confidence: f64,
    pub top_3: Vec<Candidate>,
    pub method: Method,
}
