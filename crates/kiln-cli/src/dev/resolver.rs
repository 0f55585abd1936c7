//! Module resolution behind the public directory.
//!
//! Anything the public directory does not answer is handed to a
//! [`ModuleResolver`]. The bundler proper lives outside this crate; the
//! default [`PipelineResolver`] drives the configured plugin hooks and falls
//! back to files under the project root.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use kiln_config::{BuildConfig, PluginError, PluginPipeline};
use thiserror::Error;
use tracing::{debug, trace};

/// A module ready to be sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Module id after `resolveId`.
    pub id: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Module-resolution hook used by the dev server.
///
/// `path` is the percent-decoded request path with the base stripped and no
/// leading slash (`""` for the base itself). `Ok(None)` means "not found".
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<Option<ResolvedModule>, ResolveError>;
}

/// Runs `resolveId -> load -> transform` through the plugin pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResolver {
    root: PathBuf,
    pipeline: PluginPipeline,
}

impl PipelineResolver {
    pub fn new(root: impl Into<PathBuf>, pipeline: PluginPipeline) -> Self {
        Self {
            root: root.into(),
            pipeline,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.root(), config.plugins().clone())
    }

    async fn read_source(&self, id: &str) -> Result<Option<Vec<u8>>, ResolveError> {
        let path = Path::new(id);
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
                Ok(None)
            }
            Err(source) => {
                if path.is_dir() {
                    return Ok(None);
                }
                Err(ResolveError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl ModuleResolver for PipelineResolver {
    async fn resolve(&self, path: &str) -> Result<Option<ResolvedModule>, ResolveError> {
        let request = if path.is_empty() || path.ends_with('/') {
            format!("{path}index.html")
        } else {
            path.to_string()
        };

        if !is_contained(&request) {
            debug!(path = %request, "rejected path outside the project root");
            return Ok(None);
        }

        let specifier = format!("/{request}");
        let id = self
            .pipeline
            .resolve_id(&specifier)
            .unwrap_or_else(|| self.root.join(&request).to_string_lossy().into_owned());

        let content_type = determine_content_type(&id);

        let source = match self.pipeline.load(&id)? {
            Some(code) => code.into_bytes(),
            None => match self.read_source(&id).await? {
                Some(bytes) => bytes,
                None => return Ok(None),
            },
        };

        let body = if is_text(content_type) {
            match String::from_utf8(source) {
                Ok(code) => self.pipeline.transform(code, &id)?.into_bytes(),
                Err(e) => e.into_bytes(),
            }
        } else {
            source
        };

        trace!(id = %id, content_type, "resolved module");
        Ok(Some(ResolvedModule {
            id,
            content_type,
            body,
        }))
    }
}

/// Only plain relative segments; `..`, roots and prefixes are refused.
fn is_contained(request: &str) -> bool {
    !request.contains('\0')
        && Path::new(request)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn is_text(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.starts_with("application/javascript")
        || content_type.starts_with("application/json")
        || content_type.starts_with("image/svg+xml")
}

/// Determine content type from file extension.
pub fn determine_content_type(path: &str) -> &'static str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" | "cjs" | "jsx" | "ts" | "mts" | "tsx" => "application/javascript",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{Hook, Plugin};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Virtual;

    impl Plugin for Virtual {
        fn name(&self) -> &str {
            "virtual"
        }

        fn hooks(&self) -> &[Hook] {
            &[Hook::ResolveId, Hook::Load]
        }

        fn resolve_id(&self, specifier: &str) -> Option<String> {
            (specifier == "/@env.js").then(|| "virtual:env.js".to_string())
        }

        fn load(&self, id: &str) -> Result<Option<String>, PluginError> {
            Ok((id == "virtual:env.js").then(|| "export const mode = 'dev';".to_string()))
        }
    }

    fn resolver(root: &Path, plugins: Vec<Arc<dyn Plugin>>) -> PipelineResolver {
        PipelineResolver::new(root, PluginPipeline::new(plugins).unwrap())
    }

    #[test]
    fn content_types() {
        assert_eq!(determine_content_type("a/b.js"), "application/javascript");
        assert_eq!(determine_content_type("main.ts?v=2"), "application/javascript");
        assert_eq!(determine_content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(determine_content_type("blob"), "application/octet-stream");
    }

    #[test]
    fn containment() {
        assert!(is_contained("src/main.ts"));
        assert!(!is_contained("../secret"));
        assert!(!is_contained("src/../../secret"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained("src/a\0.js"));
    }

    #[tokio::test]
    async fn reads_files_under_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.js"), "console.log(1)").unwrap();

        let module = resolver(dir.path(), vec![])
            .resolve("src/main.js")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(module.content_type, "application/javascript");
        assert_eq!(module.body, b"console.log(1)");
    }

    #[tokio::test]
    async fn base_root_serves_index_html() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let module = resolver(dir.path(), vec![]).resolve("").await.unwrap().unwrap();
        assert!(module.id.ends_with("index.html"));
        assert_eq!(module.content_type, "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn plugins_resolve_and_load_virtual_modules() {
        let dir = TempDir::new().unwrap();

        let module = resolver(dir.path(), vec![Arc::new(Virtual)])
            .resolve("@env.js")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(module.id, "virtual:env.js");
        assert_eq!(module.body, b"export const mode = 'dev';");
    }

    #[tokio::test]
    async fn missing_files_and_directories_are_not_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();

        let resolver = resolver(dir.path(), vec![]);
        assert!(resolver.resolve("nope.js").await.unwrap().is_none());
        assert!(resolver.resolve("src").await.unwrap().is_none());
        assert!(resolver.resolve("../outside.js").await.unwrap().is_none());
    }
}
