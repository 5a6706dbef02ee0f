#![doc(html_root_url = "https://docs.rs/statetree-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod change;
pub mod dom;
mod engine;
pub mod error;
pub mod node;
pub mod template;
pub mod tree;
pub mod web;

pub use change::{Change, ChangeKind};
pub use engine::Engine;
pub use error::{BatchError, ChangeError, DecodeError};
pub use node::{NodeId, Scalar, Value};
pub use template::{Template, TemplateId, TemplateKind};
