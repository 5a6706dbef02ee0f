use crate::{
	node::{NodeId, Scalar},
	template::TemplateId,
};
use thiserror::Error;

/// A change batch or template map could not be decoded from JSON.
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("malformed JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("`{change_type}` change for node {id} is missing its `{field}` field")]
	MissingField { id: NodeId, change_type: String, field: &'static str },
	#[error("`{change_type}` change for node {id} has an invalid `{field}` field: {found}")]
	InvalidField {
		id: NodeId,
		change_type: String,
		field: &'static str,
		found: serde_json::Value,
	},
}

/// A single change record could not be applied or dispatched.
#[derive(Debug, Error)]
pub enum ChangeError {
	#[error("index {index} is out of bounds for list `{key}` of length {len}")]
	IndexOutOfBounds { key: String, index: usize, len: usize },
	#[error("value at `{key}` is not a list")]
	NotAList { key: String },
	#[error("no value at `{key}` to remove")]
	MissingKey { key: String },
	#[error("{binding} binding does not support `{change_type}` for key `{key}`")]
	Unsupported {
		binding: &'static str,
		change_type: String,
		key: String,
	},
	#[error("class part `{key}` can't be toggled by {value:?}")]
	NotAToggle { key: String, value: Scalar },
	#[error("template {0} is not registered")]
	UnknownTemplate(TemplateId),
	#[error("node {0} has neither a `TEMPLATE` nor a `TAG`")]
	MissingTag(NodeId),
	#[error("node {0} is not present in the node store")]
	UnknownNode(NodeId),
	#[error("DOM node instantiated from template {0} is neither an element nor a text node")]
	UnknownDomNode(TemplateId),
	#[error("DOM child index {index} is out of bounds for {len} child node(s)")]
	DomIndexOutOfBounds { index: usize, len: u32 },
	#[error("DOM operation failed: {0}")]
	Dom(String),
}

impl ChangeError {
	pub(crate) fn dom(error: wasm_bindgen::JsValue) -> Self {
		Self::Dom(format!("{:?}", error))
	}
}

/// A change batch was aborted. Records before the failing one keep their effects.
#[derive(Debug, Error)]
pub enum BatchError {
	#[error("change #{index} could not be applied to the node store: {source}")]
	Update { index: usize, source: ChangeError },
	#[error("body node {body} could not be mounted: {source}")]
	Mount { body: NodeId, source: ChangeError },
	#[error("change #{index} could not be dispatched to its listeners: {source}")]
	Notify { index: usize, source: ChangeError },
}
