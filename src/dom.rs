//! Node listeners that turn structural changes into DOM mutations.
//!
//! Which binding a node gets is decided once, by [`create_child`], from the node's shape:
//! a `TEMPLATE` attribute instantiates that template,
//! a [`TEXT_TAG`] `TAG` creates a text node,
//! and any other `TAG` creates a basic element driven directly by the node's attributes, `CHILDREN` and `LISTENERS`.

use crate::{
	change::ChangeKind,
	error::ChangeError,
	node::{NodeId, Scalar, Value, CHILDREN, CONTENT, EVENT_DATA, LISTENERS, TAG, TEMPLATE, TEXT_TAG},
	template::{Template, TemplateId, TemplateKind},
	tree::{NodeListener, Notification, Tree},
};
use core::{
	cell::{Cell, RefCell},
	convert::TryFrom,
	fmt::Debug,
};
use hashbrown::HashMap;
use js_sys::{Function, Reflect};
use std::rc::Rc;
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

type EventClosure = Closure<dyn Fn(web_sys::Event)>;

/// Receives the DOM events the server subscribed to.
pub trait EventSink {
	/// An event type listed in a basic element node's `LISTENERS` fired.
	fn notify_event(&self, node: NodeId, event_type: &str, data: &EventData);

	/// An event declared in `template`'s `events` fired on an element instantiated for `node`.
	///
	/// Forwarded to [`EventSink::notify_event`] unless overridden.
	fn notify_template_event(&self, node: NodeId, _template: TemplateId, event_type: &str, data: &EventData) {
		self.notify_event(node, event_type, data);
	}
}
impl<F: Fn(NodeId, &str, &EventData)> EventSink for F {
	fn notify_event(&self, node: NodeId, event_type: &str, data: &EventData) {
		self(node, event_type, data)
	}
}

/// Values read from a DOM event and its element, keyed by data keys like `event.clientX` or `element.value`.
#[derive(Debug, Clone, Default)]
pub struct EventData(Vec<(String, JsValue)>);
impl EventData {
	fn extract(event: &web_sys::Event, element: &web_sys::Element, keys: &[String]) -> Self {
		let mut values = Vec::with_capacity(keys.len());
		for key in keys {
			let (source, property) = if let Some(property) = key.strip_prefix("event.") {
				(AsRef::<JsValue>::as_ref(event), property)
			} else if let Some(property) = key.strip_prefix("element.") {
				(AsRef::<JsValue>::as_ref(element), property)
			} else {
				warn!("Skipping unsupported event data key {:?}.", key);
				continue;
			};
			match Reflect::get(source, &JsValue::from_str(property)) {
				Ok(value) => values.push((key.clone(), value)),
				Err(error) => error!("Failed to read event data {:?}: {:?}", key, error),
			}
		}
		Self(values)
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&JsValue> {
		self.0.iter().find(|(candidate, _)| candidate == key).map(|(_, value)| value)
	}

	/// In the order the data keys were declared.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &JsValue)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// DOM state shared by all bindings of one [`Engine`](`crate::Engine`).
pub struct Dom {
	pub(crate) document: web_sys::Document,
	pub(crate) container: web_sys::Element,
	sink: Rc<dyn EventSink>,
	rendered: HashMap<NodeId, web_sys::Node>,
}
impl Debug for Dom {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Dom")
			.field("container", &self.container)
			.field("rendered", &self.rendered.len())
			.finish_non_exhaustive()
	}
}
impl Dom {
	#[must_use]
	pub fn new(document: web_sys::Document, container: web_sys::Element, sink: Rc<dyn EventSink>) -> Self {
		Self {
			document,
			container,
			sink,
			rendered: HashMap::new(),
		}
	}

	#[must_use]
	pub fn container(&self) -> &web_sys::Element {
		&self.container
	}

	/// The DOM node created for `node`, while `node` is alive.
	#[must_use]
	pub fn rendered(&self, node: NodeId) -> Option<&web_sys::Node> {
		self.rendered.get(&node)
	}

	/// Drops the DOM nodes of released nodes.
	pub(crate) fn forget(&mut self, released: &[NodeId]) {
		for node in released {
			self.rendered.remove(node);
		}
	}
}

/// Hides page content from logs unless the `"dangerous-logging"` feature is enabled.
fn redact<T: Debug>(value: &T) -> &dyn Debug {
	if cfg!(feature = "dangerous-logging") {
		value
	} else {
		&"<redacted>"
	}
}

fn unsupported(binding: &'static str, kind: &ChangeKind) -> ChangeError {
	ChangeError::Unsupported {
		binding,
		change_type: kind.type_name().to_owned(),
		key: match kind {
			ChangeKind::PutOverride { template, .. } => template.to_string(),
			kind => kind.key().unwrap_or_default().to_owned(),
		},
	}
}

fn detach_event_listener(element: &web_sys::Element, event_type: &str, closure: &EventClosure) {
	if let Err(error) = element.remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref::<Function>()) {
		error!("Failed to remove event listener {:?}: {:?}", event_type, error);
	}
}

/// Creates the DOM node for `node` and registers the matching binding on it.
///
/// The binding observes all records dispatched after the current one, including those of the same batch.
/// A node detached and reattached within one batch keeps its DOM node and binding.
///
/// # Errors
///
/// Iff `node` is unknown, references an unregistered template, has no `TAG`, or the DOM rejects the tag name.
#[instrument(skip(tree, dom))]
pub fn create_child(tree: &mut Tree<Dom>, dom: &mut Dom, node: NodeId) -> Result<web_sys::Node, ChangeError> {
	render(tree, dom, node, |tree, dom| {
		let (template, tag) = {
			let record = tree.nodes().get(node).ok_or(ChangeError::UnknownNode(node))?;
			(record.template(), record.tag().map(str::to_owned))
		};

		if let Some(template) = template {
			let template = Rc::clone(tree.templates().get(template).ok_or(ChangeError::UnknownTemplate(template))?);
			return instantiate(tree, dom, node, &template);
		}

		match tag.as_deref() {
			Some(TEXT_TAG) => {
				let text = dom.document.create_text_node("");
				tree.add_listener(node, Rc::new(TextBinding { text: text.clone() }));
				trace!("Created text node for node {}.", node);
				Ok(text.into())
			}
			Some(tag) => {
				let element = dom.document.create_element(tag).map_err(ChangeError::dom)?;
				tree.add_listener(node, Rc::new(BasicBinding::new(node, element.clone())));
				trace!("Created <{}> for node {}.", tag, node);
				Ok(element.into())
			}
			None => Err(ChangeError::MissingTag(node)),
		}
	})
}

fn render(
	tree: &mut Tree<Dom>,
	dom: &mut Dom,
	node: NodeId,
	create: impl FnOnce(&mut Tree<Dom>, &mut Dom) -> Result<web_sys::Node, ChangeError>,
) -> Result<web_sys::Node, ChangeError> {
	if let Some(existing) = dom.rendered.get(&node) {
		trace!("Reusing the DOM node of reattached node {}.", node);
		return Ok(existing.clone());
	}
	let created = create(tree, dom)?;
	dom.rendered.insert(node, created.clone());
	Ok(created)
}

/// Instantiates `template` (including its static children) for `node`, binding all of it to `node`.
///
/// # Errors
///
/// Iff a static child template is unregistered or the DOM rejects a tag, default attribute or event listener.
pub fn instantiate(tree: &mut Tree<Dom>, dom: &mut Dom, node: NodeId, template: &Rc<Template>) -> Result<web_sys::Node, ChangeError> {
	let span = trace_span!("Instantiating template", template = %template.id, tag = %template.tag, node = %node);
	let _enter = span.enter();

	let mut slots = Vec::new();
	let root = build_slot(tree, dom, node, template, &mut slots);
	// Registered even on failure, so the listeners attached so far are detached on release.
	tree.add_listener(node, Rc::new(TemplateBinding { slots }));
	root
}

fn build_slot(tree: &Tree<Dom>, dom: &Dom, node: NodeId, template: &Rc<Template>, slots: &mut Vec<Slot>) -> Result<web_sys::Node, ChangeError> {
	let content = match &template.kind {
		TemplateKind::StaticText { content } => Some(content.as_str()),
		TemplateKind::DynamicText { .. } => Some(""),
		_ => None,
	};
	if let Some(content) = content {
		let text: web_sys::Node = dom.document.create_text_node(content).into();
		slots.push(Slot {
			template: Rc::clone(template),
			dom_node: text.clone(),
			event_listeners: Vec::new(),
		});
		return Ok(text);
	}

	let element = dom.document.create_element(&template.tag).map_err(ChangeError::dom)?;
	for (name, value) in &template.default_attributes {
		element.set_attribute(name, value).map_err(ChangeError::dom)?;
	}
	slots.push(Slot {
		template: Rc::clone(template),
		dom_node: element.clone().into(),
		event_listeners: Vec::new(),
	});

	for (event_type, keys) in &template.events {
		let closure = {
			let sink = Rc::clone(&dom.sink);
			let element = element.clone();
			let template = template.id;
			let event_type = event_type.clone();
			let keys = keys.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let span = trace_span!("Forwarding template event", node = %node, template = %template, event_type = %event_type);
				let _enter = span.enter();
				let data = EventData::extract(&event, &element, &keys);
				sink.notify_template_event(node, template, &event_type, &data);
			}) as Box<dyn Fn(web_sys::Event)>)
		};
		let added = element.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref::<Function>());
		if let Some(slot) = slots.last_mut() {
			slot.event_listeners.push((event_type.clone(), closure));
		}
		added.map_err(ChangeError::dom)?;
	}

	if let TemplateKind::StaticChildren { children } = &template.kind {
		for &child in children {
			let child = Rc::clone(tree.templates().get(child).ok_or(ChangeError::UnknownTemplate(child))?);
			let child = build_slot(tree, dom, node, &child, slots)?;
			element.append_child(&child).map_err(ChangeError::dom)?;
		}
	}
	Ok(element.into())
}

/// Inserts `child` so that it ends up at `index` among `parent`'s child nodes.
///
/// # Errors
///
/// Iff `index` is greater than the current child count or the DOM rejects the insertion.
pub fn insert_node_at_index(parent: &web_sys::Node, child: &web_sys::Node, index: usize) -> Result<(), ChangeError> {
	let child_nodes = parent.child_nodes();
	let len = child_nodes.length();
	let out_of_bounds = || ChangeError::DomIndexOutOfBounds { index, len };
	let index_u32 = u32::try_from(index).map_err(|_| out_of_bounds())?;
	if index_u32 == len {
		parent.append_child(child).map_err(ChangeError::dom)?;
		trace!("Appended child node at index {}.", index);
	} else {
		let reference = child_nodes.get(index_u32).ok_or_else(out_of_bounds)?;
		parent.insert_before(child, Some(&reference)).map_err(ChangeError::dom)?;
		trace!("Inserted child node at index {}.", index);
	}
	Ok(())
}

/// # Errors
///
/// Iff there is no child node at `index` or the DOM rejects the removal.
pub fn remove_child_at_index(parent: &web_sys::Node, index: usize) -> Result<(), ChangeError> {
	let child_nodes = parent.child_nodes();
	let len = child_nodes.length();
	let child = u32::try_from(index)
		.ok()
		.and_then(|index| child_nodes.get(index))
		.ok_or(ChangeError::DomIndexOutOfBounds { index, len })?;
	parent.remove_child(&child).map_err(ChangeError::dom)?;
	trace!("Removed child node at index {}.", index);
	Ok(())
}

/// `null` and `false` remove the attribute, `true` sets it empty.
fn set_attribute(element: &web_sys::Element, name: &str, value: &Scalar) -> Result<(), ChangeError> {
	match value {
		Scalar::Null | Scalar::Bool(false) => remove_attribute(element, name),
		Scalar::Bool(true) => element.set_attribute(name, "").map_err(ChangeError::dom),
		value => {
			trace!("Setting attribute {}={:?}.", name, redact(value));
			element.set_attribute(name, &value.to_dom_string()).map_err(ChangeError::dom)
		}
	}
}

fn remove_attribute(element: &web_sys::Element, name: &str) -> Result<(), ChangeError> {
	trace!("Removing attribute {}.", name);
	element.remove_attribute(name).map_err(ChangeError::dom)
}

/// Adds `class` for `true` and any string but `"false"` (in any case). Removal, `null` and `false` remove it.
fn toggle_class(element: &web_sys::Element, class: &str, key: &str, value: Option<&Scalar>) -> Result<(), ChangeError> {
	let enabled = match value {
		None | Some(Scalar::Null) => false,
		Some(Scalar::Bool(enabled)) => *enabled,
		Some(Scalar::String(value)) => !value.eq_ignore_ascii_case("false"),
		Some(other) => {
			return Err(ChangeError::NotAToggle {
				key: key.to_owned(),
				value: other.clone(),
			})
		}
	};
	trace!("Toggling class {:?} {}.", class, if enabled { "on" } else { "off" });
	let class_list = element.class_list();
	if enabled {
		class_list.add_1(class)
	} else {
		class_list.remove_1(class)
	}
	.map_err(ChangeError::dom)
}

/// Mirrors a `#text` node's `content` into a [`web_sys::Text`].
pub struct TextBinding {
	text: web_sys::Text,
}
impl NodeListener<Dom> for TextBinding {
	fn notify(&self, _: &mut Tree<Dom>, _: &mut Dom, notification: &Notification<'_>) -> Result<(), ChangeError> {
		match notification.kind {
			ChangeKind::Put { key, value } if key == CONTENT => {
				trace!("Setting text content to {:?}.", redact(value));
				self.text.set_data(&value.to_dom_string());
			}
			ChangeKind::Remove { key } if key == CONTENT => self.text.set_data(""),
			kind => trace!("Text binding ignores `{}` on {:?}.", kind.type_name(), kind.key()),
		}
		Ok(())
	}
}

/// Event type → data keys, mirrored from the `EVENT_DATA` child of a basic element node.
#[derive(Default)]
struct EventDataKeys {
	source: Cell<Option<NodeId>>,
	keys: RefCell<HashMap<String, Vec<String>>>,
}
impl EventDataKeys {
	/// Re-reads the lists of `source`, unless it has been replaced as `EVENT_DATA` node.
	fn refresh(&self, tree: &Tree<Dom>, source: NodeId) {
		if self.source.get() != Some(source) {
			return;
		}
		let keys: HashMap<String, Vec<String>> = tree
			.nodes()
			.get(source)
			.map(|node| {
				node.keys()
					.filter_map(|event_type| {
						let list = node.list(event_type)?;
						let keys: Vec<String> = list.iter().filter_map(Value::as_scalar).map(Scalar::to_dom_string).collect();
						Some((event_type.to_owned(), keys))
					})
					.collect()
			})
			.unwrap_or_default();
		*self.keys.borrow_mut() = keys;
	}

	fn for_event(&self, event_type: &str) -> Vec<String> {
		self.keys.borrow().get(event_type).cloned().unwrap_or_default()
	}
}

/// Keeps a basic element's [`EventDataKeys`] in sync with its `EVENT_DATA` node.
struct EventDataBinding {
	keys: Rc<EventDataKeys>,
}
impl NodeListener<Dom> for EventDataBinding {
	fn notify(&self, tree: &mut Tree<Dom>, _: &mut Dom, notification: &Notification<'_>) -> Result<(), ChangeError> {
		self.keys.refresh(tree, notification.node);
		Ok(())
	}
}

/// Drives a template-less element: attributes, `CHILDREN`, `LISTENERS` and `EVENT_DATA`.
pub struct BasicBinding {
	node: NodeId,
	element: web_sys::Element,
	event_listeners: RefCell<HashMap<String, EventClosure>>,
	event_data: Rc<EventDataKeys>,
}
impl BasicBinding {
	#[must_use]
	pub fn new(node: NodeId, element: web_sys::Element) -> Self {
		Self {
			node,
			element,
			event_listeners: RefCell::default(),
			event_data: Rc::default(),
		}
	}

	#[instrument(skip(self, dom), fields(node = %self.node))]
	fn add_event_listener(&self, dom: &Dom, event_type: &str) -> Result<(), ChangeError> {
		let node = self.node;
		let sink = Rc::clone(&dom.sink);
		let element = self.element.clone();
		let event_data = Rc::clone(&self.event_data);
		let forwarded_type = event_type.to_owned();
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let span = trace_span!("Forwarding event", node = %node, event_type = %forwarded_type);
			let _enter = span.enter();
			let data = EventData::extract(&event, &element, &event_data.for_event(&forwarded_type));
			sink.notify_event(node, &forwarded_type, &data);
		}) as Box<dyn Fn(web_sys::Event)>);

		self.element
			.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref::<Function>())
			.map_err(ChangeError::dom)?;
		if let Some(previous) = self.event_listeners.borrow_mut().insert(event_type.to_owned(), closure) {
			warn!("Duplicate `{}` listener on node {}. Replacing it.", event_type, node);
			detach_event_listener(&self.element, event_type, &previous);
		}
		Ok(())
	}

	#[instrument(skip(self), fields(node = %self.node))]
	fn remove_event_listener(&self, event_type: &str) {
		let mut event_listeners = self.event_listeners.borrow_mut();
		match event_listeners.remove(event_type) {
			Some(closure) => detach_event_listener(&self.element, event_type, &closure),
			None => warn!("No `{}` listener to remove from node {}.", event_type, self.node),
		}
		if event_listeners.is_empty() {
			event_listeners.shrink_to_fit();
		}
	}

	fn bind_event_data(&self, tree: &mut Tree<Dom>, source: NodeId) {
		trace!("Reading event data of node {} from node {}.", self.node, source);
		self.event_data.source.set(Some(source));
		tree.add_listener(
			source,
			Rc::new(EventDataBinding {
				keys: Rc::clone(&self.event_data),
			}),
		);
		self.event_data.refresh(tree, source);
	}
}
impl Drop for BasicBinding {
	fn drop(&mut self) {
		for (event_type, closure) in self.event_listeners.get_mut().drain() {
			detach_event_listener(&self.element, &event_type, &closure);
		}
	}
}
impl NodeListener<Dom> for BasicBinding {
	fn notify(&self, tree: &mut Tree<Dom>, dom: &mut Dom, notification: &Notification<'_>) -> Result<(), ChangeError> {
		match notification.kind {
			ChangeKind::Put { key, .. } if key == TAG => Ok(()),
			ChangeKind::Put { key, value } => set_attribute(&self.element, key, value),
			ChangeKind::PutNode { key, value } if key == EVENT_DATA => {
				self.bind_event_data(tree, *value);
				Ok(())
			}
			ChangeKind::Remove { key } if key == TAG => Ok(()),
			ChangeKind::Remove { key } if key == EVENT_DATA => {
				self.event_data.source.set(None);
				self.event_data.keys.borrow_mut().clear();
				Ok(())
			}
			ChangeKind::Remove { key } if key == LISTENERS => {
				let mut event_listeners = self.event_listeners.borrow_mut();
				if !event_listeners.is_empty() {
					warn!("`LISTENERS` of node {} removed with {} listener(s) still attached.", self.node, event_listeners.len());
					for (event_type, closure) in event_listeners.drain() {
						detach_event_listener(&self.element, &event_type, &closure);
					}
				}
				*event_listeners = HashMap::new();
				Ok(())
			}
			ChangeKind::Remove { key } => remove_attribute(&self.element, key),
			ChangeKind::ListInsertNode { key, index, value } if key == CHILDREN => {
				let child = create_child(tree, dom, *value)?;
				insert_node_at_index(&self.element, &child, *index)
			}
			ChangeKind::ListRemove { key, index } if key == CHILDREN => remove_child_at_index(&self.element, *index),
			ChangeKind::ListInsert { key, value, .. } if key == LISTENERS => self.add_event_listener(dom, &value.to_dom_string()),
			ChangeKind::ListRemove { key, .. } if key == LISTENERS => {
				let event_type = notification
					.detached
					.and_then(Value::as_scalar)
					.ok_or_else(|| unsupported("basic element", notification.kind))?;
				self.remove_event_listener(&event_type.to_dom_string());
				Ok(())
			}
			kind => Err(unsupported("basic element", kind)),
		}
	}
}

/// One DOM node created from one template of an instance.
struct Slot {
	template: Rc<Template>,
	dom_node: web_sys::Node,
	event_listeners: Vec<(String, EventClosure)>,
}

/// Drives every slot instantiated for one node: the root template and its static children.
pub struct TemplateBinding {
	slots: Vec<Slot>,
}
impl TemplateBinding {
	/// Applies `value` (or its removal) to each slot whose template binds `key`.
	fn update_bound(&self, kind: &ChangeKind, key: &str, value: Option<&Scalar>) -> Result<(), ChangeError> {
		if key == TEMPLATE {
			return Ok(());
		}

		let mut bound = false;
		for slot in &self.slots {
			let template = &slot.template;
			match &template.kind {
				TemplateKind::StaticText { .. } => (),
				TemplateKind::DynamicText { binding } => {
					if binding != key {
						continue;
					}
					let text = slot.dom_node.dyn_ref::<web_sys::Text>().ok_or(ChangeError::UnknownDomNode(template.id))?;
					trace!("Setting text of template {} to {:?}.", template.id, redact(&value));
					text.set_data(&value.map(Scalar::to_dom_string).unwrap_or_default());
					bound = true;
				}
				TemplateKind::Bound | TemplateKind::StaticChildren { .. } | TemplateKind::For { .. } => {
					let element = slot.dom_node.dyn_ref::<web_sys::Element>().ok_or(ChangeError::UnknownDomNode(template.id))?;
					if let Some(attribute) = template.target_attribute(key) {
						match value {
							Some(value) => set_attribute(element, attribute, value)?,
							None => remove_attribute(element, attribute)?,
						}
						bound = true;
					} else if let Some(class) = template.class_part(key) {
						toggle_class(element, class, key, value)?;
						bound = true;
					}
				}
			}
		}

		if bound {
			Ok(())
		} else {
			Err(unsupported("template", kind))
		}
	}

	fn apply_override(&self, tree: &mut Tree<Dom>, template: TemplateId, target: NodeId) -> Result<(), ChangeError> {
		let mut applied = false;
		for slot in self.slots.iter().filter(|slot| slot.template.id == template) {
			if let Some(element) = slot.dom_node.dyn_ref::<web_sys::Element>() {
				tree.add_listener(target, Rc::new(BasicBinding::new(target, element.clone())));
			} else if let Some(text) = slot.dom_node.dyn_ref::<web_sys::Text>() {
				tree.add_listener(target, Rc::new(TextBinding { text: text.clone() }));
			} else {
				return Err(ChangeError::UnknownDomNode(template));
			}
			trace!("Bound override node {} to slot of template {}.", target, template);
			applied = true;
		}

		if !applied {
			info!("Ignoring override for template {}: Not instantiated here.", template);
		}
		Ok(())
	}

	/// The `For` slot repeating over `key`, with its child template.
	fn for_slot(&self, key: &str) -> Option<(&Slot, TemplateId)> {
		self.slots.iter().find_map(|slot| match &slot.template.kind {
			TemplateKind::For { model_key, child_template } if model_key == key => Some((slot, *child_template)),
			_ => None,
		})
	}
}
impl Drop for TemplateBinding {
	fn drop(&mut self) {
		for Slot { dom_node, event_listeners, .. } in &mut self.slots {
			if let Some(element) = dom_node.dyn_ref::<web_sys::Element>() {
				for (event_type, closure) in event_listeners.drain(..) {
					detach_event_listener(element, &event_type, &closure);
				}
			}
		}
	}
}
impl NodeListener<Dom> for TemplateBinding {
	fn notify(&self, tree: &mut Tree<Dom>, dom: &mut Dom, notification: &Notification<'_>) -> Result<(), ChangeError> {
		let kind = notification.kind;
		match kind {
			ChangeKind::Put { key, value } => self.update_bound(kind, key, Some(value)),
			ChangeKind::Remove { key } => match notification.detached {
				Some(Value::Node(_)) | Some(Value::List(_)) => {
					trace!("Template binding ignores `remove` of structural key {:?}.", key);
					Ok(())
				}
				_ => self.update_bound(kind, key, None),
			},
			ChangeKind::PutOverride { template, value } => self.apply_override(tree, *template, *value),
			ChangeKind::PutNode { key, .. } => {
				trace!("Template binding ignores `putNode` on {:?}.", key);
				Ok(())
			}
			ChangeKind::ListInsertNode { key, index, value } => {
				let (slot, child_template) = self.for_slot(key).ok_or_else(|| unsupported("template", kind))?;
				let child_template = Rc::clone(tree.templates().get(child_template).ok_or(ChangeError::UnknownTemplate(child_template))?);
				let child = render(tree, dom, *value, |tree, dom| instantiate(tree, dom, *value, &child_template))?;
				insert_node_at_index(&slot.dom_node, &child, *index)
			}
			ChangeKind::ListRemove { key, index } => {
				let (slot, _) = self.for_slot(key).ok_or_else(|| unsupported("template", kind))?;
				remove_child_at_index(&slot.dom_node, *index)
			}
			kind => Err(unsupported("template", kind)),
		}
	}
}
