//! Destination naming.
//!
//! - [`template`]: parsing and rendering `%Y/%m/{file}`-style templates
//! - [`resolver`]: choosing a destination for a file from its metadata

pub mod resolver;
pub mod template;

pub use resolver::{parent_marker, template_values, PathResolver, ResolveError, PARENT_MARKERS};
pub use template::{Template, TemplateError, TemplateValues, Variable};
