//! Document rendering from disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use inkpost_cache::{Cache, FileCache};
use inkpost_config::Config;
use inkpost_math::{HttpTypesetter, RawTexTypesetter};
use inkpost_renderer::{
    DocumentMeta, IconProvider, IconizeExtension, ImageExtension, LinksExtension, MathExtension,
    MathTypesetter, Pipeline, PipelineError, TocExtension,
};
use rayon::prelude::*;

use crate::assets::VaultResolver;
use crate::icons::DirectoryIconProvider;

/// Version stamp for the on-disk formula cache.
const CACHE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result of rendering a document.
#[derive(Clone, Debug)]
pub struct PageRenderResult {
    pub html: String,
    /// Front matter of the document.
    pub meta: DocumentMeta,
    /// Non-fatal problems found while rendering.
    pub warnings: Vec<String>,
}

/// Error returned when a document cannot be rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Source file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Renders Markdown files through a configured pipeline.
///
/// Extensions run in this order: math, iconize, links, image, auto-TOC.
/// Links and the TOC can be switched off in the config.
pub struct DocumentRenderer {
    pipeline: Pipeline,
}

impl DocumentRenderer {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let typesetter = create_typesetter(config);
        let icons = config
            .icons_resolved
            .dir
            .clone()
            .map(|dir| Arc::new(DirectoryIconProvider::new(dir)) as Arc<dyn IconProvider>);
        let resolver = Arc::new(VaultResolver::new(config.assets_resolved.vault_dir.clone()));

        let mut pipeline = Pipeline::new()
            .with_extension(MathExtension::new(typesetter))
            .with_extension(IconizeExtension::new(icons));
        if config.links.footnotes {
            pipeline = pipeline.with_extension(LinksExtension);
        }
        pipeline = pipeline.with_extension(
            ImageExtension::new()
                .with_resolver(resolver)
                .with_captions(config.images.captions),
        );
        if config.toc.enabled {
            pipeline = pipeline.with_extension(
                TocExtension::new()
                    .with_title(config.toc.title.clone())
                    .with_max_level(config.toc.max_level),
            );
        }

        tracing::debug!(extensions = ?pipeline.extension_names(), "pipeline assembled");
        Self { pipeline }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Render the document at `path` to HTML.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::FileNotFound` if the file doesn't exist,
    /// `RenderError::Io` if it cannot be read, and
    /// `RenderError::Pipeline` if a postprocess stage fails.
    pub fn render(&self, path: &Path) -> Result<String, RenderError> {
        Ok(self.render_page(path)?.html)
    }

    /// Render the document at `path`, keeping its metadata and warnings.
    pub fn render_page(&self, path: &Path) -> Result<PageRenderResult, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RenderError::FileNotFound(path.to_path_buf()),
            _ => RenderError::Io(e),
        })?;

        let output = self.pipeline.render_document(&text, Some(path))?;
        for warning in &output.warnings {
            tracing::warn!(path = %path.display(), "{warning}");
        }
        tracing::info!(path = %path.display(), bytes = output.html.len(), "rendered");

        Ok(PageRenderResult {
            html: output.html,
            meta: output.meta,
            warnings: output.warnings,
        })
    }

    /// Render many documents in parallel. Results keep the input order.
    pub fn render_all(&self, paths: &[PathBuf]) -> Vec<Result<PageRenderResult, RenderError>> {
        paths.par_iter().map(|path| self.render_page(path)).collect()
    }
}

fn create_typesetter(config: &Config) -> Arc<dyn MathTypesetter> {
    let Some(url) = &config.math.server_url else {
        return Arc::new(RawTexTypesetter);
    };
    let mut typesetter =
        HttpTypesetter::new(url.as_str()).timeout(Duration::from_secs(config.math.timeout_secs));
    if config.math.cache {
        let cache = FileCache::new(config.cache_dir(), CACHE_VERSION);
        typesetter = typesetter.with_cache(cache.bucket("math"));
    }
    Arc::new(typesetter)
}
