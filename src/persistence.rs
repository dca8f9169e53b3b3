//! Model serialization and persistence
//!
//! Trained density trees and FastMKS models are saved as JSON together with
//! metadata identifying the model kind, so the CLI can reload a model
//! without rebuilding it from raw data.

use crate::core::{Result, TreeError};
use crate::det::DensityTree;
use crate::fastmks::FastMksModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A model that can be written to and read from a model file
pub trait PersistentModel: Serialize + DeserializeOwned {
    /// Identifier stored in the file metadata
    const MODEL_TYPE: &'static str;

    /// Human-readable `(label, value)` lines for [`ModelFile::print_summary`]
    fn summary(&self) -> Vec<(String, String)>;
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Kind of model stored in the file
    pub model_type: String,
    /// Creation timestamp
    pub created_at: String,
}

/// On-disk representation: metadata plus the model itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile<M> {
    pub metadata: ModelMetadata,
    pub model: M,
}

impl<M: PersistentModel> ModelFile<M> {
    /// Wrap a model with fresh metadata
    pub fn new(model: M) -> Self {
        Self {
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                model_type: M::MODEL_TYPE.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            model,
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(TreeError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)
            .map_err(|e| TreeError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file, checking that it holds the expected kind of model
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(TreeError::IoError)?;
        let reader = BufReader::new(file);

        // Check the kind before decoding the model body
        let raw: ModelFile<serde_json::Value> = serde_json::from_reader(reader)
            .map_err(|e| TreeError::SerializationError(e.to_string()))?;
        if raw.metadata.model_type != M::MODEL_TYPE {
            return Err(TreeError::SerializationError(format!(
                "Expected a {} model, found {}",
                M::MODEL_TYPE,
                raw.metadata.model_type
            )));
        }

        let model = serde_json::from_value(raw.model)
            .map_err(|e| TreeError::SerializationError(e.to_string()))?;
        Ok(Self {
            metadata: raw.metadata,
            model,
        })
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== {} Model Summary ===", self.metadata.model_type);
        for (label, value) in self.model.summary() {
            println!("{}: {}", label, value);
        }
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}

impl PersistentModel for DensityTree {
    const MODEL_TYPE: &'static str = "det";

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Dimensions".to_string(), self.n_dims().to_string()),
            ("Training Points".to_string(), self.total_points().to_string()),
            ("Leaves".to_string(), self.num_leaves().to_string()),
            (
                "Volume Regularization".to_string(),
                self.uses_volume_reg().to_string(),
            ),
        ]
    }
}

impl PersistentModel for FastMksModel {
    const MODEL_TYPE: &'static str = "fastmks";

    fn summary(&self) -> Vec<(String, String)> {
        let mode = if self.naive() {
            "naive"
        } else if self.single_mode() {
            "single-tree"
        } else {
            "dual-tree"
        };
        let reference = self.reference();
        vec![
            ("Kernel".to_string(), self.kernel().to_string()),
            ("Reference Points".to_string(), reference.ncols().to_string()),
            ("Dimensions".to_string(), reference.nrows().to_string()),
            ("Search Mode".to_string(), mode.to_string()),
            ("Base".to_string(), self.base().to_string()),
        ]
    }
}
