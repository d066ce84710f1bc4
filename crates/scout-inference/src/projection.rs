//! Versioned linear projection from model embeddings to index vectors.
//!
//! The artifact is a JSON file holding a PCA mean and component matrix:
//!
//! ```json
//! { "version": "pca-1000-v1", "input_dim": 3072, "output_dim": 1000,
//!   "mean": [..3072..], "components": [[..3072..], ..1000 rows..] }
//! ```
//!
//! The version string must match the version recorded next to the stored
//! vectors. That check runs once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use scout_core::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectionArtifact {
    version: String,
    input_dim: usize,
    output_dim: usize,
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Transform {
    Identity,
    Linear {
        mean: Vec<f32>,
        components: Vec<Vec<f32>>,
    },
}

/// Fixed linear map applied to every query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    version: String,
    input_dim: usize,
    output_dim: usize,
    transform: Transform,
}

impl Projection {
    /// Pass vectors through unchanged. For indexes built without reduction.
    pub fn identity(dimension: usize, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            input_dim: dimension,
            output_dim: dimension,
            transform: Transform::Identity,
        }
    }

    /// Build from an explicit mean and row-major component matrix.
    pub fn linear(
        version: impl Into<String>,
        mean: Vec<f32>,
        components: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let artifact = ProjectionArtifact {
            version: version.into(),
            input_dim: mean.len(),
            output_dim: components.len(),
            mean,
            components,
        };
        Self::from_artifact(artifact)
    }

    /// Load and validate an artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Cannot read projection artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        let artifact: ProjectionArtifact = serde_json::from_str(&raw)?;
        let projection = Self::from_artifact(artifact)?;
        info!(
            subsystem = "inference",
            component = "projection",
            version = %projection.version,
            input_dim = projection.input_dim,
            output_dim = projection.output_dim,
            "Loaded projection artifact"
        );
        Ok(projection)
    }

    fn from_artifact(artifact: ProjectionArtifact) -> Result<Self> {
        if artifact.version.trim().is_empty() {
            return Err(Error::Config("Projection version must not be empty".into()));
        }
        if artifact.input_dim == 0 || artifact.output_dim == 0 {
            return Err(Error::Config("Projection dimensions must be positive".into()));
        }
        if artifact.mean.len() != artifact.input_dim {
            return Err(Error::Config(format!(
                "Projection mean has {} values, expected {}",
                artifact.mean.len(),
                artifact.input_dim
            )));
        }
        if artifact.components.len() != artifact.output_dim {
            return Err(Error::Config(format!(
                "Projection has {} components, expected {}",
                artifact.components.len(),
                artifact.output_dim
            )));
        }
        if let Some(row) = artifact
            .components
            .iter()
            .position(|r| r.len() != artifact.input_dim)
        {
            return Err(Error::Config(format!(
                "Projection component {} has wrong width",
                row
            )));
        }
        Ok(Self {
            version: artifact.version,
            input_dim: artifact.input_dim,
            output_dim: artifact.output_dim,
            transform: Transform::Linear {
                mean: artifact.mean,
                components: artifact.components,
            },
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Project a raw model embedding into index space.
    pub fn project(&self, raw: &[f32]) -> Result<Vec<f32>> {
        if raw.len() != self.input_dim {
            return Err(Error::EmbeddingFailure(format!(
                "Embedding has {} dimensions, projection '{}' expects {}",
                raw.len(),
                self.version,
                self.input_dim
            )));
        }
        match &self.transform {
            Transform::Identity => Ok(raw.to_vec()),
            Transform::Linear { mean, components } => Ok(components
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(raw.iter().zip(mean.iter()))
                        .map(|(c, (x, m))| c * (x - m))
                        .sum::<f32>()
                })
                .collect()),
        }
    }

    /// Fail unless `index_version` matches this projection.
    pub fn ensure_compatible(&self, index_version: &str) -> Result<()> {
        if self.version != index_version {
            return Err(Error::ProjectionVersionMismatch {
                expected: self.version.clone(),
                found: index_version.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_linear_projection_centers_and_reduces() {
        let p = Projection::linear(
            "v1",
            vec![1.0, 1.0, 1.0],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]],
        )
        .unwrap();
        assert_eq!(p.output_dim(), 2);
        let out = p.project(&[2.0, 3.0, 1.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn test_identity_projection() {
        let p = Projection::identity(3, "none");
        assert_eq!(p.project(&[0.1, 0.2, 0.3]).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_wrong_input_width_is_embedding_failure() {
        let p = Projection::identity(3, "none");
        assert!(matches!(p.project(&[1.0]), Err(Error::EmbeddingFailure(_))));
    }

    #[test]
    fn test_rejects_ragged_components() {
        let err = Projection::linear("v1", vec![0.0, 0.0], vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_version_check() {
        let p = Projection::identity(2, "pca-v2");
        assert!(p.ensure_compatible("pca-v2").is_ok());
        assert!(matches!(
            p.ensure_compatible("pca-v1"),
            Err(Error::ProjectionVersionMismatch { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"pca-2-v1","input_dim":2,"output_dim":1,"mean":[0.0,0.0],"components":[[0.5,0.5]]}}"#
        )
        .unwrap();
        let p = Projection::load(file.path()).unwrap();
        assert_eq!(p.version(), "pca-2-v1");
        assert_eq!(p.project(&[2.0, 4.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        assert!(matches!(
            Projection::load("/nonexistent/projection.json"),
            Err(Error::Config(_))
        ));
    }
}
