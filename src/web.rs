//! JavaScript-facing wrapper that takes JSON payloads straight from the transport.

use crate::{
	change::Change,
	dom::{EventData, EventSink},
	node::NodeId,
	template::{decode_templates, TemplateId},
	Engine,
};
use js_sys::{Array, Function, Object, Reflect};
use tracing::error;
use wasm_bindgen::{prelude::wasm_bindgen, JsValue};

/// Forwards events to `notifyEvent(nodeId, eventType, eventData)`,
/// and template events to `notifyTemplateEvent(nodeId, templateId, eventType, eventData)` if present.
struct NotifyEvent {
	notify_event: Function,
	notify_template_event: Option<Function>,
}
impl EventSink for NotifyEvent {
	fn notify_event(&self, node: NodeId, event_type: &str, data: &EventData) {
		if let Err(error) = self.notify_event.call3(
			&JsValue::UNDEFINED,
			&JsValue::from(node.0),
			&JsValue::from_str(event_type),
			&to_object(data),
		) {
			error!("`notifyEvent` threw for node {} ({:?}): {:?}", node, event_type, error);
		}
	}

	fn notify_template_event(&self, node: NodeId, template: TemplateId, event_type: &str, data: &EventData) {
		let notify_template_event = match &self.notify_template_event {
			Some(function) => function,
			None => return self.notify_event(node, event_type, data),
		};
		let arguments = Array::new();
		arguments.push(&JsValue::from(node.0));
		arguments.push(&JsValue::from(template.0));
		arguments.push(&JsValue::from_str(event_type));
		arguments.push(&to_object(data));
		if let Err(error) = notify_template_event.apply(&JsValue::UNDEFINED, &arguments) {
			error!(
				"`notifyTemplateEvent` threw for node {} (template {}, {:?}): {:?}",
				node, template, event_type, error
			);
		}
	}
}

fn to_object(data: &EventData) -> Object {
	let object = Object::new();
	for (key, value) in data.iter() {
		if let Err(error) = Reflect::set(&object, &JsValue::from_str(key), value) {
			error!("Failed to set event data {:?}: {:?}", key, error);
		}
	}
	object
}

#[wasm_bindgen]
#[derive(Debug)]
pub struct WebEngine {
	engine: Engine,
}

#[wasm_bindgen]
impl WebEngine {
	/// `notify_event` is called as `notifyEvent(nodeId, eventType, eventData)` for each forwarded DOM event.
	/// Template events go to `notify_template_event` instead, if given.
	#[wasm_bindgen(constructor)]
	#[must_use]
	pub fn new(container: web_sys::Element, notify_event: Function, notify_template_event: Option<Function>) -> WebEngine {
		WebEngine {
			engine: Engine::new(
				container,
				NotifyEvent {
					notify_event,
					notify_template_event,
				},
			),
		}
	}

	/// # Errors
	///
	/// Throws if `changes` can't be decoded or the batch is aborted.
	#[wasm_bindgen(js_name = applyChanges)]
	pub fn apply_changes(&mut self, changes: &str) -> Result<(), JsValue> {
		let changes = Change::decode_batch(changes).map_err(to_js_error)?;
		self.engine.apply_changes(&changes).map_err(to_js_error)
	}

	/// # Errors
	///
	/// Throws if `templates` can't be decoded.
	#[wasm_bindgen(js_name = registerTemplates)]
	pub fn register_templates(&mut self, templates: &str) -> Result<(), JsValue> {
		let templates = decode_templates(templates).map_err(to_js_error)?;
		self.engine.register_templates(templates);
		Ok(())
	}
}

#[allow(clippy::needless_pass_by_value)]
fn to_js_error(error: impl std::error::Error) -> JsValue {
	js_sys::Error::new(&error.to_string()).into()
}
