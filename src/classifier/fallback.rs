//! Deterministic fallback selection
//!
//! Used when no model is available. Output is a pure function of the
//! uploaded bytes and the catalog, so the same file always gets the same
//! answer.

use md5::{Digest, Md5};

use super::{Candidate, ClassifierError, Identification, LabelCatalog, Method};

const BASE_CONFIDENCE: f64 = 65.0;
const CONFIDENCE_SPREAD: u128 = 25;

/// MD5 of `bytes` read as a big-endian 128-bit integer
pub fn content_hash(bytes: &[u8]) -> u128 {
    let digest = Md5::digest(bytes);
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&digest);
    u128::from_be_bytes(buf)
}

/// Pick a label for `bytes` without a model
pub fn select(bytes: &[u8], catalog: &LabelCatalog) -> Result<Identification, ClassifierError> {
    select_by_hash(content_hash(bytes), catalog)
}

pub fn select_by_hash(hash: u128, catalog: &LabelCatalog) -> Result<Identification, ClassifierError> {
    let labels = catalog.labels();
    if labels.is_empty() {
        return Err(ClassifierError::EmptyCatalog);
    }

    let count = labels.len();
    let selected = (hash % count as u128) as usize;
    let confidence = BASE_CONFIDENCE + (hash % CONFIDENCE_SPREAD) as f64;

    // Neighbours in catalog order, not hash-derived
    let alt_1 = (selected + 1) % count;
    let alt_2 = (selected + 2) % count;

    let label = labels[selected].clone();
    let top_3 = vec![
        Candidate { name: label.clone(), confidence },
        Candidate { name: labels[alt_1].clone(), confidence: (80.0 - confidence).max(30.0) },
        Candidate { name: labels[alt_2].clone(), confidence: (70.0 - confidence).max(20.0) },
    ];

    Ok(Identification {
        label,
        confidence,
        top_3,
        method: Method::Fallback,
    })
}
