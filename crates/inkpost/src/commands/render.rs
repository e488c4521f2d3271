//! `inkpost render` command implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Args;
use inkpost_config::{CliSettings, Config};
use inkpost_publish::DocumentRenderer;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown files to render.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output file for a single input, or output directory for several
    /// (default: stdout for one file, `<name>.html` next to each input
    /// otherwise).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover inkpost.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Math typesetting server URL (overrides config).
    #[arg(long, env = "INKPOST_MATH_URL")]
    math_url: Option<String>,

    /// Directory to search for images (overrides config).
    #[arg(long)]
    vault_dir: Option<PathBuf>,

    /// Do not insert a table of contents.
    #[arg(long)]
    no_toc: bool,

    /// Disable the formula cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Where a rendered document goes.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Destination {
    Stdout,
    File(PathBuf),
}

/// Output destination for each input, in input order.
///
/// Fails when two inputs would be written to the same file.
pub(crate) fn plan_destinations(
    files: &[PathBuf],
    output: Option<&Path>,
) -> Result<Vec<Destination>, CliError> {
    let destinations: Vec<Destination> = match (files, output) {
        ([_], None) => vec![Destination::Stdout],
        ([_], Some(out)) => vec![Destination::File(out.to_path_buf())],
        (_, None) => files
            .iter()
            .map(|f| Destination::File(f.with_extension("html")))
            .collect(),
        (_, Some(dir)) => files
            .iter()
            .map(|f| {
                let name = f.file_stem().unwrap_or(f.as_os_str());
                Destination::File(dir.join(name).with_extension("html"))
            })
            .collect(),
    };

    let mut seen: HashMap<&Path, &Path> = HashMap::new();
    for (file, destination) in files.iter().zip(&destinations) {
        let Destination::File(target) = destination else {
            continue;
        };
        if let Some(previous) = seen.insert(target.as_path(), file.as_path()) {
            return Err(CliError::Validation(format!(
                "{} and {} would both be written to {}",
                previous.display(),
                file.display(),
                target.display()
            )));
        }
    }
    Ok(destinations)
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            math_url: self.math_url.clone(),
            toc_enabled: self.no_toc.then_some(false),
            cache_enabled: self.no_cache.then_some(false),
            vault_dir: self.vault_dir.clone(),
        };
        let destinations = plan_destinations(&self.files, self.output.as_deref())?;
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let renderer = DocumentRenderer::new(&config);

        if self.files.len() > 1
            && let Some(dir) = &self.output
        {
            std::fs::create_dir_all(dir)?;
        }

        let results = renderer.render_all(&self.files);
        let mut failed = 0;
        for ((path, destination), result) in self.files.iter().zip(destinations).zip(results) {
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    output.error(&format!("{}: {e}", path.display()));
                    failed += 1;
                    continue;
                }
            };
            for warning in &page.warnings {
                output.warning(&format!("{}: {warning}", path.display()));
            }
            match destination {
                Destination::Stdout => output.document(&page.html)?,
                Destination::File(target) => {
                    std::fs::write(&target, &page.html)?;
                    if self.verbose {
                        output.info(&format!("{} -> {}", path.display(), target.display()));
                    }
                }
            }
        }

        if failed > 0 {
            return Err(CliError::Validation(format!(
                "{failed} of {} documents failed to render",
                self.files.len()
            )));
        }
        if self.files.len() > 1 || self.output.is_some() {
            output.success(&format!("Rendered {} documents", self.files.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_file_defaults_to_stdout() {
        let files = vec![PathBuf::from("a.md")];
        assert_eq!(plan_destinations(&files, None).unwrap(), vec![Destination::Stdout]);
        assert_eq!(
            plan_destinations(&files, Some(Path::new("out.html"))).unwrap(),
            vec![Destination::File(PathBuf::from("out.html"))]
        );
    }

    #[test]
    fn test_many_files_next_to_sources() {
        let files = vec![PathBuf::from("docs/a.md"), PathBuf::from("b.markdown")];
        assert_eq!(
            plan_destinations(&files, None).unwrap(),
            vec![
                Destination::File(PathBuf::from("docs/a.html")),
                Destination::File(PathBuf::from("b.html")),
            ]
        );
    }

    #[test]
    fn test_many_files_into_directory() {
        let files = vec![PathBuf::from("docs/a.md"), PathBuf::from("notes/b.md")];
        assert_eq!(
            plan_destinations(&files, Some(Path::new("site"))).unwrap(),
            vec![
                Destination::File(PathBuf::from("site/a.html")),
                Destination::File(PathBuf::from("site/b.html")),
            ]
        );
    }

    #[test]
    fn test_same_stem_into_directory_is_rejected() {
        let files = vec![PathBuf::from("docs/a.md"), PathBuf::from("notes/a.md")];
        let err = plan_destinations(&files, Some(Path::new("site"))).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
        assert!(err.to_string().contains("docs/a.md and notes/a.md"));
    }

    #[test]
    fn test_same_stem_next_to_sources_is_rejected() {
        let files = vec![PathBuf::from("a.md"), PathBuf::from("a.markdown")];
        assert!(plan_destinations(&files, None).is_err());
    }
}
