//! `inkpost headings` command implementation.

use std::path::PathBuf;

use clap::Args;
use inkpost_config::{CliSettings, Config};
use inkpost_publish::DocumentRenderer;
use inkpost_renderer::{HeadingRecord, extract_headings};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the headings command.
#[derive(Args)]
pub(crate) struct HeadingsArgs {
    /// Markdown file to inspect.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover inkpost.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl HeadingsArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        // Heading text does not need typeset SVG, so skip the typesetting server.
        let cli_settings = CliSettings {
            toc_enabled: Some(false),
            ..CliSettings::default()
        };
        let mut config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        config.math.server_url = None;

        let html = DocumentRenderer::new(&config).render(&self.file)?;
        let headings = extract_headings(&html);
        Output::new().document(&to_json(&headings)?)?;
        Ok(())
    }
}

fn to_json(headings: &[HeadingRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(headings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_shape() {
        let headings = vec![HeadingRecord {
            level: 2,
            text: "Setup".to_owned(),
            id: "setup".to_owned(),
        }];
        let json: serde_json::Value = serde_json::from_str(&to_json(&headings).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "level": 2, "text": "Setup", "id": "setup" }])
        );
    }
}
