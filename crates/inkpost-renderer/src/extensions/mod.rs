//! Built-in extensions.

mod iconize;
mod image;
mod links;
mod math;
mod toc;

pub use iconize::{IconProvider, IconizeExtension};
pub use image::{AssetResolver, ImageExtension, is_passthrough_url};
pub use links::{LinkRegistry, LinksExtension};
pub use math::{MathExtension, MathTypesetter};
pub use toc::{HeadingRecord, TocExtension, extract_headings, number_headings};
