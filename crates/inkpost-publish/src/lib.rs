//! Document rendering for inkpost.
//!
//! [`DocumentRenderer`] assembles the extension pipeline from an
//! [`inkpost_config::Config`] and renders Markdown files from disk.
//! Image paths are resolved against the document's directory and a vault
//! ([`VaultResolver`]); icon shortcodes are looked up in a directory of SVG
//! files ([`DirectoryIconProvider`]).

mod assets;
mod icons;
mod renderer;

pub use assets::VaultResolver;
pub use icons::DirectoryIconProvider;
pub use renderer::{DocumentRenderer, PageRenderResult, RenderError};
