//! Model-backed classifier - ONNX Runtime integration
//!
//! Loads an exported image classifier and turns its softmax output into
//! an `Identification`.

use std::path::Path;

use image::imageops::FilterType;
use ndarray::Array4;
use parking_lot::Mutex;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{Value, ValueType};

use super::{Candidate, ClassifierError, Identification, LabelCatalog, Method};

/// Input size when the model does not declare one
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (224, 224);

pub struct ModelClassifier {
    // Session::run needs &mut
    session: Mutex<Session>,
    output_name: String,
    input_size: (u32, u32),
}

impl std::fmt::Debug for ModelClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClassifier")
            .field("output_name", &self.output_name)
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl ModelClassifier {
    /// Load an ONNX model from file
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        tracing::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ClassifierError::ModelMissing(model_path.display().to_string()));
        }

        let session = Session::builder()
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to load model: {}", e)))?;

        let output_name = session.outputs.first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ClassifierError::ModelLoad("No output defined".to_string()))?;

        // NHWC: [batch, height, width, channels]
        let input_size = session.inputs.first()
            .and_then(|input| match &input.input_type {
                ValueType::Tensor { shape, .. } if shape.len() == 4 && shape[1] > 0 && shape[2] > 0 => {
                    Some((shape[2] as u32, shape[1] as u32))
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        tracing::info!("Model loaded successfully. Input size: {}x{}", input_size.0, input_size.1);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            input_size,
        })
    }

    /// (width, height) fed to the network
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Run the model on an image file and rank the result
    pub fn classify(&self, image_path: &Path, catalog: &LabelCatalog) -> Result<Identification, ClassifierError> {
        let tensor = self.preprocess(image_path)?;
        let probabilities = self.infer(tensor)?;
        Ok(rank(&probabilities, catalog))
    }

    fn preprocess(&self, image_path: &Path) -> Result<Array4<f32>, ClassifierError> {
        let (width, height) = self.input_size;

        let img = image::ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| ClassifierError::ImageDecode(e.to_string()))?
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(tensor)
    }

    fn infer(&self, tensor: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let input_tensor = Value::from_array(tensor)
            .map_err(|e| ClassifierError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = outputs.get(&self.output_name)
            .ok_or_else(|| ClassifierError::Inference("No output".to_string()))?;

        let output_tensor = output.try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Extract error: {}", e)))?;

        Ok(output_tensor.1.to_vec())
    }
}

/// Turn a probability vector into label, confidence and top 3.
/// Top entries whose index is not in the catalog are dropped.
pub fn rank(probabilities: &[f32], catalog: &LabelCatalog) -> Identification {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    let (label, confidence) = match order.first() {
        Some(&best) => (
            catalog.get(best).unwrap_or("Unknown").to_string(),
            probabilities[best] as f64 * 100.0,
        ),
        None => ("Unknown".to_string(), 0.0),
    };

    let top_3 = order.iter()
        .take(3)
        .filter_map(|&idx| {
            catalog.get(idx).map(|name| Candidate {
                name: name.to_string(),
                confidence: probabilities[idx] as f64 * 100.0,
            })
        })
        .collect();

    Identification {
        label,
        confidence,
        top_3,
        method: Method::Model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LabelCatalog {
        [(0, "Bulbasaur"), (1, "Charmander"), (2, "Squirtle"), (3, "Pikachu")].into_iter().collect()
    }

    #[test]
    fn test_rank_picks_argmax() {
        let result = rank(&[0.1, 0.6, 0.2, 0.1], &catalog());

        assert_eq!(result.label, "Charmander");
        assert!((result.confidence - 60.0).abs() < 1e-4);
        assert_eq!(result.method, Method::Model);
    }

    #[test]
    fn test_rank_top_3_descending() {
        let result = rank(&[0.05, 0.15, 0.5, 0.3], &catalog());
        let names: Vec<&str> = result.top_3.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, ["Squirtle", "Pikachu", "Charmander"]);
        assert!(result.top_3.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_rank_skips_unknown_indices() {
        // index 4 has no label
        let result = rank(&[0.1, 0.05, 0.05, 0.2, 0.6], &catalog());

        assert_eq!(result.label, "Unknown");
        assert_eq!(result.top_3.len(), 2);
        assert_eq!(result.top_3[0].name, "Pikachu");
    }

    #[test]
    fn test_missing_artifact_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelClassifier::load(&dir.path().join("absent.onnx")).unwrap_err();

        assert!(matches!(err, ClassifierError::ModelMissing(_)));
    }
}
