//! The client-side mirror of the server's state tree.

use crate::{error::ChangeError, template::TemplateId};
use core::fmt::{self, Display, Formatter};
use hashbrown::{hash_map::Entry, HashMap, HashSet};
use serde::Deserialize;
use tracing::trace;

/// Opaque node identifier assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);
impl NodeId {
	/// The state tree root. Its `body` child is what gets mounted into the container.
	pub const ROOT: NodeId = NodeId(1);
}
impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Attribute key naming the template a node is instantiated from.
pub const TEMPLATE: &str = "TEMPLATE";
/// Attribute key naming the tag of a template-less node.
pub const TAG: &str = "TAG";
/// [`TAG`] value of text nodes.
pub const TEXT_TAG: &str = "#text";
/// Child list of basic element nodes.
pub const CHILDREN: &str = "CHILDREN";
/// Event type list of basic element nodes.
pub const LISTENERS: &str = "LISTENERS";
/// Child node of basic element nodes mapping event types to the data keys sent along with them.
pub const EVENT_DATA: &str = "EVENT_DATA";
/// Text node content.
pub const CONTENT: &str = "content";
/// Key on the root node referencing the body node.
pub const BODY: &str = "body";

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
}
impl Scalar {
	/// Renders the value the way it is written into the DOM.
	#[must_use]
	pub fn to_dom_string(&self) -> String {
		match self {
			Scalar::Null => String::new(),
			Scalar::Bool(value) => value.to_string(),
			#[allow(clippy::cast_possible_truncation)]
			Scalar::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => (*value as i64).to_string(),
			Scalar::Number(value) => value.to_string(),
			Scalar::String(value) => value.clone(),
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Scalar::String(value) => Some(value),
			_ => None,
		}
	}
}

/// An attribute value: a scalar, a child node reference or an ordered list of either.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Scalar(Scalar),
	Node(NodeId),
	List(Vec<Value>),
}
impl Value {
	#[must_use]
	pub fn as_scalar(&self) -> Option<&Scalar> {
		match self {
			Value::Scalar(scalar) => Some(scalar),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_node(&self) -> Option<NodeId> {
		match *self {
			Value::Node(id) => Some(id),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(list) => Some(list),
			_ => None,
		}
	}
}

#[derive(Debug)]
pub struct Node {
	id: NodeId,
	serial: u64,
	attributes: HashMap<String, Value>,
	overrides: HashMap<TemplateId, NodeId>,
}
impl Node {
	#[must_use]
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Store-wide creation counter. A node re-created under a reused id gets a new serial.
	#[must_use]
	pub fn serial(&self) -> u64 {
		self.serial
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.attributes.get(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.attributes.keys().map(String::as_str)
	}

	#[must_use]
	pub fn child(&self, key: &str) -> Option<NodeId> {
		self.get(key).and_then(Value::as_node)
	}

	#[must_use]
	pub fn list(&self, key: &str) -> Option<&[Value]> {
		self.get(key).and_then(Value::as_list)
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		self.get(TAG).and_then(Value::as_scalar).and_then(Scalar::as_str)
	}

	/// The `TEMPLATE` id, if it is set to an integral number that fits a [`TemplateId`].
	#[must_use]
	pub fn template(&self) -> Option<TemplateId> {
		match self.get(TEMPLATE).and_then(Value::as_scalar) {
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			Some(&Scalar::Number(id)) if id.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&id) => Some(TemplateId(id as u32)),
			_ => None,
		}
	}

	#[must_use]
	pub fn override_for(&self, template: TemplateId) -> Option<NodeId> {
		self.overrides.get(&template).copied()
	}

	pub(crate) fn put(&mut self, key: &str, value: Value) {
		self.attributes.insert(key.to_owned(), value);
	}

	pub(crate) fn take(&mut self, key: &str) -> Result<Value, ChangeError> {
		self.attributes.remove(key).ok_or_else(|| ChangeError::MissingKey { key: key.to_owned() })
	}

	pub(crate) fn put_override(&mut self, template: TemplateId, node: NodeId) {
		self.overrides.insert(template, node);
	}

	/// Inserts into the list at `key`, creating an empty list first if there is none.
	pub(crate) fn list_insert(&mut self, key: &str, index: usize, value: Value) -> Result<(), ChangeError> {
		let list = match self.attributes.entry(key.to_owned()).or_insert_with(|| Value::List(Vec::new())) {
			Value::List(list) => list,
			_ => return Err(ChangeError::NotAList { key: key.to_owned() }),
		};
		if index > list.len() {
			return Err(ChangeError::IndexOutOfBounds {
				key: key.to_owned(),
				index,
				len: list.len(),
			});
		}
		list.insert(index, value);
		Ok(())
	}

	pub(crate) fn list_remove(&mut self, key: &str, index: usize) -> Result<Value, ChangeError> {
		let list = match self.attributes.get_mut(key) {
			Some(Value::List(list)) => list,
			Some(_) => return Err(ChangeError::NotAList { key: key.to_owned() }),
			None => return Err(ChangeError::MissingKey { key: key.to_owned() }),
		};
		if index >= list.len() {
			return Err(ChangeError::IndexOutOfBounds {
				key: key.to_owned(),
				index,
				len: list.len(),
			});
		}
		Ok(list.remove(index))
	}
}

/// Arena of all live nodes, keyed by their server-assigned ids.
#[derive(Debug, Default)]
pub struct NodeStore {
	nodes: HashMap<NodeId, Node>,
	next_serial: u64,
}
impl NodeStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the node for `id`, creating an empty one on first access.
	pub fn ensure(&mut self, id: NodeId) -> &mut Node {
		match self.nodes.entry(id) {
			Entry::Occupied(occupied) => occupied.into_mut(),
			Entry::Vacant(vacant) => {
				let serial = self.next_serial;
				self.next_serial += 1;
				trace!("Created node {} (serial {}).", id, serial);
				vacant.insert(Node {
					id,
					serial,
					attributes: HashMap::new(),
					overrides: HashMap::new(),
				})
			}
		}
	}

	#[must_use]
	pub fn get(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	#[must_use]
	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.contains_key(&id)
	}

	/// Forgets `id`. Unknown ids are ignored.
	pub fn remove(&mut self, id: NodeId) -> Option<Node> {
		let removed = self.nodes.remove(&id);
		if removed.is_some() {
			trace!("Removed node {}.", id);
		}
		removed
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Collects every node reachable from `value` through node references, lists and overrides, `value`'s own references included.
	pub(crate) fn collect_detached(&self, value: &Value, detached: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>) {
		match value {
			Value::Scalar(_) => (),
			Value::Node(id) => {
				if !seen.insert(*id) {
					return;
				}
				detached.push(*id);
				if let Some(node) = self.get(*id) {
					for value in node.attributes.values() {
						self.collect_detached(value, detached, seen);
					}
					for &target in node.overrides.values() {
						self.collect_detached(&Value::Node(target), detached, seen);
					}
				}
			}
			Value::List(list) => {
				for value in list {
					self.collect_detached(value, detached, seen);
				}
			}
		}
	}
}
