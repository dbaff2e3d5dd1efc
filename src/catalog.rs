// Catalog module - selectable models and prompt templates
//
// The catalog is read-only reference data fetched exactly once at startup.
// Loading happens on a spawned task so the TUI comes up immediately; the
// result arrives in the event loop as an AppEvent. A load failure is
// non-fatal: the session continues with empty catalogs and the user is told.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// A selectable model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Context ceiling for this model, informational in the UI
    pub max_tokens: u32,
}

/// A prompt template; applying one overwrites the current draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub content: String,
    pub category: String,
}

/// The full catalog of models and templates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Catalog {
    /// Look up a model by id
    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Look up a template by id
    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Built-in catalog used when no catalog file is configured
    pub fn bundled() -> Self {
        Self {
            models: vec![
                Model {
                    id: "gpt-4".into(),
                    name: "GPT-4".into(),
                    provider: "OpenAI".into(),
                    max_tokens: 8192,
                },
                Model {
                    id: "gpt-3.5-turbo".into(),
                    name: "GPT-3.5 Turbo".into(),
                    provider: "OpenAI".into(),
                    max_tokens: 4096,
                },
                Model {
                    id: "claude-3-opus".into(),
                    name: "Claude 3 Opus".into(),
                    provider: "Anthropic".into(),
                    max_tokens: 4096,
                },
                Model {
                    id: "claude-3-sonnet".into(),
                    name: "Claude 3 Sonnet".into(),
                    provider: "Anthropic".into(),
                    max_tokens: 4096,
                },
                Model {
                    id: "custom".into(),
                    name: "Custom Model".into(),
                    provider: "Custom".into(),
                    max_tokens: 2048,
                },
            ],
            templates: vec![
                Template {
                    id: "1".into(),
                    name: "Code Review".into(),
                    content:
                        "Review the following code and provide suggestions for improvement:\n\n"
                            .into(),
                    category: "Development".into(),
                },
                Template {
                    id: "2".into(),
                    name: "Creative Writing".into(),
                    content: "Write a creative story about:\n\n".into(),
                    category: "Writing".into(),
                },
                Template {
                    id: "3".into(),
                    name: "Data Analysis".into(),
                    content: "Analyze this data and provide insights:\n\n".into(),
                    category: "Analysis".into(),
                },
                Template {
                    id: "4".into(),
                    name: "Translation".into(),
                    content: "Translate the following text to [target language]:\n\n".into(),
                    category: "Language".into(),
                },
            ],
        }
    }
}

/// Errors from catalog loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Supplies the catalog; called exactly once at startup
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn load(&self) -> Result<Catalog, LoadError>;
}

/// Static catalog with a short simulated fetch latency
pub struct BundledCatalog {
    pub latency: Duration,
}

impl Default for BundledCatalog {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(300),
        }
    }
}

#[async_trait]
impl CatalogProvider for BundledCatalog {
    async fn load(&self) -> Result<Catalog, LoadError> {
        sleep(self.latency).await;
        Ok(Catalog::bundled())
    }
}

/// Catalog loaded from a TOML file
///
/// The file holds `[[models]]` and `[[templates]]` tables, letting users
/// define their own model list without rebuilding.
pub struct FileCatalog {
    pub path: PathBuf,
}

#[async_trait]
impl CatalogProvider for FileCatalog {
    async fn load(&self) -> Result<Catalog, LoadError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;

        toml::from_str(&raw).map_err(|source| LoadError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_has_expected_entries() {
        let catalog = Catalog::bundled();
        assert_eq!(catalog.models.len(), 5);
        assert_eq!(catalog.templates.len(), 4);
        assert!(catalog.model("gpt-4").is_some());
        assert_eq!(catalog.template("2").unwrap().name, "Creative Writing");
    }

    #[test]
    fn lookup_misses_return_none() {
        let catalog = Catalog::bundled();
        assert!(catalog.model("nonexistent").is_none());
        assert!(catalog.template("99").is_none());
    }

    #[tokio::test]
    async fn file_catalog_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[[models]]
id = "llama3"
name = "Llama 3"
provider = "Meta"
max_tokens = 8192

[[templates]]
id = "t1"
name = "Summarize"
content = "Summarize the following:\n\n"
category = "Writing"
"#,
        )
        .unwrap();

        let catalog = FileCatalog { path }.load().await.unwrap();
        assert_eq!(catalog.models.len(), 1);
        assert_eq!(catalog.models[0].id, "llama3");
        assert_eq!(catalog.templates[0].name, "Summarize");
    }

    #[tokio::test]
    async fn file_catalog_missing_file_is_io_error() {
        let provider = FileCatalog {
            path: PathBuf::from("/nonexistent/catalog.toml"),
        };
        let err = provider.load().await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
