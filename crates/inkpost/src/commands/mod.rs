//! CLI command implementations.

pub(crate) mod headings;
pub(crate) mod render;

pub(crate) use headings::HeadingsArgs;
pub(crate) use render::RenderArgs;
