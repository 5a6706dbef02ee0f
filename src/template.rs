//! Static element templates, registered ahead of the nodes that reference them.

use crate::{error::DecodeError, node::TEXT_TAG};
use core::fmt::{self, Display, Formatter};
use hashbrown::HashMap;
use serde::Deserialize;
use std::rc::Rc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u32);
impl Display for TemplateId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
	pub id: TemplateId,
	/// Element tag name, [`TEXT_TAG`] for the text kinds.
	pub tag: String,
	/// Applied once when the template is instantiated.
	pub default_attributes: HashMap<String, String>,
	/// Node key → DOM attribute name.
	pub attribute_bindings: HashMap<String, String>,
	/// Node key → CSS class toggled by that key's truthiness.
	pub class_part_bindings: HashMap<String, String>,
	/// DOM event type → `EVENT_DATA`-style keys extracted when it fires.
	pub events: HashMap<String, Vec<String>>,
	pub kind: TemplateKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateKind {
	/// Attributes driven through [`Template::attribute_bindings`] only.
	Bound,
	/// Child templates instantiated once, in order, for the same node.
	StaticChildren { children: Vec<TemplateId> },
	/// One `child_template` instance per entry of the node list at `model_key`.
	For { model_key: String, child_template: TemplateId },
	/// A text node with fixed content.
	StaticText { content: String },
	/// A text node showing the node's `binding` key.
	DynamicText { binding: String },
}

impl Template {
	/// The DOM attribute `key` is bound to, if any.
	#[must_use]
	pub fn target_attribute(&self, key: &str) -> Option<&str> {
		self.attribute_bindings.get(key).map(String::as_str)
	}

	/// The CSS class `key` toggles, if any.
	#[must_use]
	pub fn class_part(&self, key: &str) -> Option<&str> {
		self.class_part_bindings.get(key).map(String::as_str)
	}

	#[must_use]
	pub fn is_text(&self) -> bool {
		matches!(self.kind, TemplateKind::StaticText { .. } | TemplateKind::DynamicText { .. })
	}
}

#[derive(Debug, Default)]
pub struct TemplateRegistry {
	templates: HashMap<TemplateId, Rc<Template>>,
}
impl TemplateRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces templates by id. Instances created from a replaced template keep their old descriptor.
	#[instrument(skip(self, templates))]
	pub fn register_all(&mut self, templates: impl IntoIterator<Item = Template>) {
		for template in templates {
			debug!("Registering template {} <{}>.", template.id, template.tag);
			self.templates.insert(template.id, Rc::new(template));
		}
	}

	#[must_use]
	pub fn get(&self, id: TemplateId) -> Option<&Rc<Template>> {
		self.templates.get(&id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.templates.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.templates.is_empty()
	}
}

/// Fields shared by both element description types.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementFields {
	tag: String,
	#[serde(default)]
	default_attributes: HashMap<String, String>,
	#[serde(default)]
	attribute_bindings: HashMap<String, String>,
	#[serde(default)]
	class_part_bindings: HashMap<String, String>,
	#[serde(default)]
	events: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Description {
	#[serde(rename = "BoundElementTemplate")]
	Bound {
		#[serde(flatten)]
		element: ElementFields,
		#[serde(default)]
		children: Vec<TemplateId>,
	},
	#[serde(rename = "ForElementTemplate", rename_all = "camelCase")]
	For {
		#[serde(flatten)]
		element: ElementFields,
		model_key: String,
		child_template: TemplateId,
	},
	#[serde(rename = "StaticTextTemplate")]
	StaticText { content: String },
	#[serde(rename = "DynamicTextTemplate")]
	DynamicText { binding: String },
}
impl Description {
	fn into_template(self, id: TemplateId) -> Template {
		let (element, kind) = match self {
			Description::Bound { element, children } => (
				element,
				if children.is_empty() {
					TemplateKind::Bound
				} else {
					TemplateKind::StaticChildren { children }
				},
			),
			Description::For {
				element,
				model_key,
				child_template,
			} => (element, TemplateKind::For { model_key, child_template }),
			Description::StaticText { content } => return Template::text(id, TemplateKind::StaticText { content }),
			Description::DynamicText { binding } => return Template::text(id, TemplateKind::DynamicText { binding }),
		};
		Template {
			id,
			tag: element.tag,
			default_attributes: element.default_attributes,
			attribute_bindings: element.attribute_bindings,
			class_part_bindings: element.class_part_bindings,
			events: element.events,
			kind,
		}
	}
}

impl Template {
	fn text(id: TemplateId, kind: TemplateKind) -> Self {
		Self {
			id,
			tag: TEXT_TAG.to_owned(),
			default_attributes: HashMap::new(),
			attribute_bindings: HashMap::new(),
			class_part_bindings: HashMap::new(),
			events: HashMap::new(),
			kind,
		}
	}
}

/// Decodes a JSON object mapping template ids to template descriptions.
///
/// The result is sorted by id.
///
/// # Errors
///
/// Iff the JSON is malformed or a description has an unknown `type` or lacks a required field.
pub fn decode_templates(json: &str) -> Result<Vec<Template>, DecodeError> {
	let descriptions: HashMap<TemplateId, Description> = serde_json::from_str(json)?;
	let mut templates: Vec<_> = descriptions.into_iter().map(|(id, description)| description.into_template(id)).collect();
	templates.sort_by_key(|template| template.id);
	Ok(templates)
}
