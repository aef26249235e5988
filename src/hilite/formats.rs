//! Renderers for the token tree
//!
//! The scanner only builds a tree; turning it into output is a separate walk:
//! - html: `<span>`-wrapped, escaped markup (the `value` of a highlight result)
//! - treeviz: one line per node, for eyeballing what a grammar produced
//! - json: the tree itself

pub mod html;
pub mod json;
pub mod registry;
pub mod treeviz;

pub use html::{escape_html, render_html, HtmlFormatter, DEFAULT_CLASS_PREFIX};
pub use json::JsonFormatter;
pub use registry::{FormatError, FormatRegistry, Formatter};
pub use treeviz::{to_treeviz_str, TreevizFormatter};
