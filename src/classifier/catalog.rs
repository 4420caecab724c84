//! Label Catalog - index -> species name
//!
//! Built from the training-time `class_indices.json` (name -> index)
//! and inverted once at startup.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    by_index: BTreeMap<usize, String>,
    // Values in ascending index order, for positional selection
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Load the catalog from disk. A missing or malformed file yields an
    /// empty catalog.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Class indices not read from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<HashMap<String, usize>>(&raw) {
            Ok(indices) => {
                let catalog = Self::from_indices(indices);
                tracing::info!("Loaded {} class labels", catalog.len());
                catalog
            }
            Err(e) => {
                tracing::warn!("Invalid class indices file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Invert a name -> index table
    pub fn from_indices(indices: HashMap<String, usize>) -> Self {
        let by_index: BTreeMap<usize, String> = indices
            .into_iter()
            .map(|(name, index)| (index, name))
            .collect();
        let labels = by_index.values().cloned().collect();

        Self { by_index, labels }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for LabelCatalog {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self::from_indices(iter.into_iter().map(|(i, name)| (name.into(), i)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_inverts_name_to_index() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Squirtle": 2, "Bulbasaur": 0, "Charmander": 1}}"#).unwrap();

        let catalog = LabelCatalog::load(file.path());

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(0), Some("Bulbasaur"));
        assert_eq!(catalog.get(2), Some("Squirtle"));
        assert_eq!(catalog.labels(), ["Bulbasaur", "Charmander", "Squirtle"]);
    }

    #[test]
    fn test_missing_file_gives_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LabelCatalog::load(&dir.path().join("class_indices.json"));

        assert!(catalog.is_empty());
        assert_eq!(catalog.get(0), None);
    }

    #[test]
    fn test_malformed_file_gives_empty_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();

        assert!(LabelCatalog::load(file.path()).is_empty());
    }

    #[test]
    fn test_labels_follow_index_order_with_gaps() {
        let catalog: LabelCatalog = [(10, "Mew"), (3, "Pikachu")].into_iter().collect();

        assert_eq!(catalog.labels(), ["Pikachu", "Mew"]);
        assert_eq!(catalog.get(1), None);
    }
}
