//! # forge_templates
//!
//! Jinja-style template rendering for benchforge.
//!
//! Templates are parsed once, up front, so malformed syntax is reported
//! before any render is attempted. Rendering is a pure function of the parsed
//! template and a [`Context`], and a [`Template`] can be shared across threads.
//!
//! Supported syntax:
//!
//! - `{{ expr }}` substitution, with `{{ var['key'] }}` and `{{ var.key }}` lookups
//! - `{% if %}` / `{% elif %}` / `{% else %}` / `{% endif %}`
//! - `{% for x in seq %}` / `{% else %}` / `{% endfor %}`, including `loop.*`
//! - `{% set name = expr %}` and `{# comments #}`
//! - `is defined` / `is not defined` tests, kept distinct from truthiness
//! - `-` whitespace control markers, plus `trim_blocks` / `lstrip_blocks`
//!
//! ## Example
//!
//! ```rust
//! use forge_templates::{Context, Template, TemplateOptions};
//!
//! let template = Template::parse(
//!     "greeting",
//!     "{% for name in names %}hello {{ name }}\n{% endfor %}",
//!     TemplateOptions::new(),
//! )
//! .unwrap();
//!
//! let ctx = Context::new().with("names", vec!["a", "b"]);
//! assert_eq!(template.render(&ctx).unwrap(), "hello a\nhello b\n");
//! ```

pub mod context;
pub mod error;
mod expr;
pub mod loader;
mod parser;
pub mod renderer;
pub mod syntax;
pub mod value;

pub use context::Context;
pub use error::{TemplateError, TemplateResult};
pub use loader::{TemplateSet, TEMPLATE_EXTENSION};
pub use renderer::{Template, TemplateOptions, UndefinedPolicy};
pub use syntax::WhitespaceOptions;
pub use value::Value;
