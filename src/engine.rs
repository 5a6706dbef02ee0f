use crate::{
	change::Change,
	dom::{create_child, Dom, EventSink},
	error::{BatchError, ChangeError},
	node::{NodeId, BODY},
	template::Template,
	tree::Tree,
};
use std::rc::Rc;
use tracing::{error, info, instrument};
use wasm_bindgen::UnwrapThrowExt;

/// Mirrors one server-side state tree into the child nodes of a container element.
///
/// The container is taken over once the root node's `body` is first bound:
/// its previous content is cleared and must not be mutated externally afterwards.
///
/// Batches must be applied one at a time, in the order the server sent them.
#[derive(Debug)]
pub struct Engine {
	tree: Tree<Dom>,
	dom: Dom,
}
impl Engine {
	#[must_use]
	#[instrument(skip(sink))]
	pub fn new(container: web_sys::Element, sink: impl 'static + EventSink) -> Self {
		let document = container
			.owner_document()
			.expect_throw("statetree-dom: No owner document found for container element.");
		Self {
			tree: Tree::new(),
			dom: Dom::new(document, container, Rc::new(sink)),
		}
	}

	#[must_use]
	pub fn tree(&self) -> &Tree<Dom> {
		&self.tree
	}

	#[must_use]
	pub fn container(&self) -> &web_sys::Element {
		self.dom.container()
	}

	/// Registers templates ahead of the nodes referencing them. Later registrations of the same id win.
	pub fn register_templates(&mut self, templates: impl IntoIterator<Item = Template>) {
		self.tree.register_templates(templates);
	}

	/// Applies one batch: updates the node store, mounts the body node if it isn't bound yet, then updates the DOM.
	///
	/// # Errors
	///
	/// Iff a record can't be applied or dispatched, or the body can't be mounted.
	/// The rest of the batch is skipped; the server should resynchronise.
	#[instrument(skip(self, changes), fields(changes = changes.len()))]
	pub fn apply_changes(&mut self, changes: &[Change]) -> Result<(), BatchError> {
		let result = self.tree.apply_changes_with(&mut self.dom, changes, mount_root);
		self.dom.forget(self.tree.last_released());
		if let Err(error) = &result {
			error!("Aborted change batch: {}", error);
		}
		result
	}
}

/// Binds the root's `body` node to a fresh DOM subtree in the container, unless it is bound already.
fn mount_root(tree: &mut Tree<Dom>, dom: &mut Dom) -> Result<(), BatchError> {
	let body = match tree.nodes().get(NodeId::ROOT).and_then(|root| root.child(BODY)) {
		Some(body) => body,
		None => return Ok(()),
	};
	if tree.has_listeners(body) {
		return Ok(());
	}

	info!("Mounting body node {}.", body);
	let container = dom.container.clone();
	while let Some(child) = container.first_child() {
		container.remove_child(&child).map_err(|error| BatchError::Mount {
			body,
			source: ChangeError::dom(error),
		})?;
	}
	let element = create_child(tree, dom, body).map_err(|source| BatchError::Mount { body, source })?;
	container.append_child(&element).map_err(|error| BatchError::Mount {
		body,
		source: ChangeError::dom(error),
	})?;
	Ok(())
}
