//! One-shot batch generation of `[[artifacts]]`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::config::{ArtifactConfig, ConfigController};
use crate::convert::{ConvertContext, ConvertError, Converter, Endpoint, CONVERTER_CONTENT_TYPE};
use crate::routing::{Request, Response};

#[derive(Debug, thiserror::Error)]
enum GenerateError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("converter answered {0}")]
    Status(StatusCode),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the converter for each artifact profile and writes the results.
pub struct Generator {
    converter: Arc<dyn Converter>,
    controller: Arc<ConfigController>,
}

impl Generator {
    pub fn new(converter: Arc<dyn Converter>, controller: Arc<ConfigController>) -> Self {
        Self {
            converter,
            controller,
        }
    }

    /// Generate every artifact, or only `only`. Returns the process exit code.
    pub async fn run(&self, only: Option<&str>) -> i32 {
        let mut state = self.controller.state();
        if state.update_ruleset_on_request {
            self.controller.refresh_rulesets().await;
            state = self.controller.state();
        }

        let artifacts: Vec<&ArtifactConfig> = state
            .preferences
            .artifacts
            .iter()
            .filter(|a| only.is_none_or(|name| a.name == name))
            .collect();

        if let (Some(name), true) = (only, artifacts.is_empty()) {
            tracing::error!(artifact = name, "Artifact not found in preferences");
            return 1;
        }
        if artifacts.is_empty() {
            tracing::warn!("No artifacts configured, nothing to generate");
            return 0;
        }

        let mut failed = 0;
        for artifact in &artifacts {
            match self.generate(artifact).await {
                Ok(bytes) => tracing::info!(
                    artifact = %artifact.name,
                    path = %artifact.path,
                    bytes,
                    "Artifact generated"
                ),
                Err(e) => {
                    failed += 1;
                    tracing::error!(artifact = %artifact.name, error = %e, "Artifact generation failed");
                }
            }
        }

        tracing::info!(total = artifacts.len(), failed, "Generation finished");
        if failed == 0 {
            0
        } else {
            1
        }
    }

    async fn generate(&self, artifact: &ArtifactConfig) -> Result<usize, GenerateError> {
        let query = {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("target", &artifact.target);
            if !artifact.url.is_empty() {
                query.append_pair("url", &artifact.url);
            }
            for (key, value) in &artifact.args {
                query.append_pair(key, value);
            }
            query.finish()
        };

        let request = Request::new(Method::GET, Endpoint::Sub.path()).with_argument(query);
        let mut response = Response::new(CONVERTER_CONTENT_TYPE);
        let ctx = ConvertContext::snapshot(&request, &self.controller);
        self.converter
            .convert(Endpoint::Sub, ctx, &mut response)
            .await?;

        if !response.status.is_success() {
            return Err(GenerateError::Status(response.status));
        }

        let path = Path::new(&artifact.path);
        let io_err = |source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, &response.body).await.map_err(io_err)?;

        Ok(response.body.len())
    }
}
