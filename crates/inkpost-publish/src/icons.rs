use std::path::PathBuf;

use inkpost_renderer::IconProvider;

/// Icons stored as `{dir}/{name}.svg`.
#[derive(Debug)]
pub struct DirectoryIconProvider {
    dir: PathBuf,
}

impl DirectoryIconProvider {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl IconProvider for DirectoryIconProvider {
    fn icon_svg(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains(['/', '\\', '.']) {
            return None;
        }
        let path = self.dir.join(format!("{name}.svg"));
        match std::fs::read_to_string(&path) {
            Ok(svg) => Some(svg.trim().to_owned()),
            Err(e) => {
                tracing::debug!(icon = name, path = %path.display(), error = %e, "icon not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_svg_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("star.svg"), "<svg>*</svg>\n").unwrap();
        let provider = DirectoryIconProvider::new(dir.path().to_path_buf());

        assert_eq!(provider.icon_svg("star").as_deref(), Some("<svg>*</svg>"));
        assert_eq!(provider.icon_svg("moon"), None);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.svg"), "<svg/>").unwrap();
        let provider = DirectoryIconProvider::new(dir.path().join("sub"));

        assert_eq!(provider.icon_svg("../x"), None);
    }
}
