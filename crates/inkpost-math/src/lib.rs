//! TeX typesetting for the inkpost math extension.
//!
//! Two [`MathTypesetter`](inkpost_renderer::MathTypesetter) implementations:
//!
//! - [`HttpTypesetter`]: posts formulas to a typesetting service and returns
//!   the SVG it answers with, caching results by content hash
//! - [`RawTexTypesetter`]: no service; emits the escaped TeX source so a
//!   client-side renderer can pick it up

mod cache;
mod error;
mod http;
mod raw;

pub use cache::FormulaKey;
pub use error::TypesetError;
pub use http::{DEFAULT_TIMEOUT, HttpTypesetter, create_agent};
pub use raw::RawTexTypesetter;
