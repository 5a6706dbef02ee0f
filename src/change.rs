//! Change records as delivered by the server, one batch at a time.

use crate::{
	error::DecodeError,
	node::{NodeId, Scalar},
	template::TemplateId,
};
use core::convert::TryFrom;
use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
	/// The node the change is addressed to.
	pub id: NodeId,
	pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
	Put { key: String, value: Scalar },
	PutNode { key: String, value: NodeId },
	/// Redirects the slot created from `template` to the node `value`.
	PutOverride { template: TemplateId, value: NodeId },
	Remove { key: String },
	ListInsert { key: String, index: usize, value: Scalar },
	ListInsertNode { key: String, index: usize, value: NodeId },
	ListRemove { key: String, index: usize },
	/// A change type this client doesn't know. Skipped with a warning.
	Unsupported(String),
}

impl ChangeKind {
	/// The wire name of this change type.
	#[must_use]
	pub fn type_name(&self) -> &str {
		match self {
			ChangeKind::Put { .. } => "put",
			ChangeKind::PutNode { .. } => "putNode",
			ChangeKind::PutOverride { .. } => "putOverride",
			ChangeKind::Remove { .. } => "remove",
			ChangeKind::ListInsert { .. } => "listInsert",
			ChangeKind::ListInsertNode { .. } => "listInsertNode",
			ChangeKind::ListRemove { .. } => "listRemove",
			ChangeKind::Unsupported(change_type) => change_type,
		}
	}

	/// The attribute key, for change types that have one.
	#[must_use]
	pub fn key(&self) -> Option<&str> {
		match self {
			ChangeKind::Put { key, .. }
			| ChangeKind::PutNode { key, .. }
			| ChangeKind::Remove { key }
			| ChangeKind::ListInsert { key, .. }
			| ChangeKind::ListInsertNode { key, .. }
			| ChangeKind::ListRemove { key, .. } => Some(key),
			ChangeKind::PutOverride { .. } | ChangeKind::Unsupported(_) => None,
		}
	}
}

#[derive(Deserialize)]
struct Record {
	id: NodeId,
	#[serde(rename = "type")]
	change_type: String,
	key: Option<Json>,
	value: Option<Json>,
	index: Option<usize>,
}

impl Change {
	/// Decodes a JSON array of `{ id, type, key, value?, index? }` records.
	///
	/// # Errors
	///
	/// Iff the JSON is malformed or a record of a known type lacks or mistypes a field it needs.
	pub fn decode_batch(json: &str) -> Result<Vec<Change>, DecodeError> {
		let records: Vec<Record> = serde_json::from_str(json)?;
		records.into_iter().map(Record::decode).collect()
	}
}

impl Record {
	fn decode(self) -> Result<Change, DecodeError> {
		let kind = match self.change_type.as_str() {
			"put" => ChangeKind::Put {
				key: self.string_key()?,
				value: self.scalar_value()?,
			},
			"putNode" => ChangeKind::PutNode {
				key: self.string_key()?,
				value: self.node_value()?,
			},
			"putOverride" => ChangeKind::PutOverride {
				template: self.template_key()?,
				value: self.node_value()?,
			},
			"remove" => ChangeKind::Remove { key: self.string_key()? },
			"listInsert" => ChangeKind::ListInsert {
				key: self.string_key()?,
				index: self.index()?,
				value: self.scalar_value()?,
			},
			"listInsertNode" => ChangeKind::ListInsertNode {
				key: self.string_key()?,
				index: self.index()?,
				value: self.node_value()?,
			},
			"listRemove" => ChangeKind::ListRemove {
				key: self.string_key()?,
				index: self.index()?,
			},
			_ => ChangeKind::Unsupported(self.change_type.clone()),
		};
		Ok(Change { id: self.id, kind })
	}

	fn missing(&self, field: &'static str) -> DecodeError {
		DecodeError::MissingField {
			id: self.id,
			change_type: self.change_type.clone(),
			field,
		}
	}

	fn invalid(&self, field: &'static str, found: &Json) -> DecodeError {
		DecodeError::InvalidField {
			id: self.id,
			change_type: self.change_type.clone(),
			field,
			found: found.clone(),
		}
	}

	fn string_key(&self) -> Result<String, DecodeError> {
		match &self.key {
			Some(Json::String(key)) => Ok(key.clone()),
			Some(other) => Err(self.invalid("key", other)),
			None => Err(self.missing("key")),
		}
	}

	/// `putOverride` keys are template ids, sent either as numbers or as numeric strings.
	fn template_key(&self) -> Result<TemplateId, DecodeError> {
		let key = self.key.as_ref().ok_or_else(|| self.missing("key"))?;
		let id = match key {
			Json::Number(number) => number.as_u64(),
			Json::String(string) => string.parse().ok(),
			_ => None,
		};
		id.and_then(|id| u32::try_from(id).ok()).map(TemplateId).ok_or_else(|| self.invalid("key", key))
	}

	fn node_value(&self) -> Result<NodeId, DecodeError> {
		let value = self.value.as_ref().ok_or_else(|| self.missing("value"))?;
		value
			.as_u64()
			.and_then(|id| u32::try_from(id).ok())
			.map(NodeId)
			.ok_or_else(|| self.invalid("value", value))
	}

	fn scalar_value(&self) -> Result<Scalar, DecodeError> {
		match &self.value {
			None | Some(Json::Null) => Ok(Scalar::Null),
			Some(Json::Bool(value)) => Ok(Scalar::Bool(*value)),
			Some(Json::Number(number)) => number.as_f64().map(Scalar::Number).ok_or_else(|| self.invalid("value", &Json::Number(number.clone()))),
			Some(Json::String(value)) => Ok(Scalar::String(value.clone())),
			Some(other) => Err(self.invalid("value", other)),
		}
	}

	fn index(&self) -> Result<usize, DecodeError> {
		self.index.ok_or_else(|| self.missing("index"))
	}
}
