//! The node graph, its templates and the listeners observing it.
//!
//! Batches are applied in two passes: [`Tree::update_tree`] mutates the [`NodeStore`] for every record first,
//! then [`Tree::notify_listeners`] re-walks the batch in order and dispatches each record to its node's listeners.
//! Listeners can therefore read any attribute set anywhere in the batch.

use crate::{
	change::{Change, ChangeKind},
	error::{BatchError, ChangeError},
	node::{NodeId, NodeStore, Value},
	template::{Template, TemplateRegistry},
};
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{info, instrument, trace, trace_span, warn};

/// Reacts to changes addressed to the node it was registered on.
///
/// `C` is the context shared by all listeners of a [`Tree`], like the DOM state in [`Dom`](`crate::dom::Dom`).
pub trait NodeListener<C> {
	/// # Errors
	///
	/// Iff the change can't be handled by this listener. This aborts the rest of the batch.
	fn notify(&self, tree: &mut Tree<C>, context: &mut C, notification: &Notification<'_>) -> Result<(), ChangeError>;
}

/// A change record as seen by listeners during the second pass.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
	pub node: NodeId,
	pub kind: &'a ChangeKind,
	/// What `remove` or `listRemove` took out of the node during the first pass.
	pub detached: Option<&'a Value>,
}

/// Outcome of the first pass, one entry per record.
#[derive(Debug, Default)]
pub struct Applied {
	detached: Vec<Option<Value>>,
}

pub struct Tree<C> {
	nodes: NodeStore,
	templates: TemplateRegistry,
	listeners: HashMap<NodeId, Vec<Rc<dyn NodeListener<C>>>>,
	pending_release: Vec<NodeId>,
	released: Vec<NodeId>,
}

impl<C> Default for Tree<C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<C> core::fmt::Debug for Tree<C> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Tree")
			.field("nodes", &self.nodes.len())
			.field("templates", &self.templates.len())
			.field("listened_nodes", &self.listeners.len())
			.field("pending_release", &self.pending_release)
			.finish()
	}
}

impl<C> Tree<C> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			nodes: NodeStore::new(),
			templates: TemplateRegistry::new(),
			listeners: HashMap::new(),
			pending_release: Vec::new(),
			released: Vec::new(),
		}
	}

	#[must_use]
	pub fn nodes(&self) -> &NodeStore {
		&self.nodes
	}

	#[must_use]
	pub fn templates(&self) -> &TemplateRegistry {
		&self.templates
	}

	pub fn register_templates(&mut self, templates: impl IntoIterator<Item = Template>) {
		self.templates.register_all(templates);
	}

	pub fn add_listener(&mut self, node: NodeId, listener: Rc<dyn NodeListener<C>>) {
		self.listeners.entry(node).or_default().push(listener);
	}

	#[must_use]
	pub fn has_listeners(&self, node: NodeId) -> bool {
		self.listeners.get(&node).map_or(false, |listeners| !listeners.is_empty())
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeId) -> usize {
		self.listeners.get(&node).map_or(0, Vec::len)
	}

	/// Removes `node` from the store and drops its listeners. Unknown ids are ignored.
	pub fn remove_node(&mut self, node: NodeId) {
		self.nodes.remove(node);
		self.listeners.remove(&node);
	}

	/// Applies both passes and then releases all nodes detached by the batch, also if it failed.
	///
	/// # Errors
	///
	/// See [`Tree::apply_changes_with`].
	pub fn apply_changes(&mut self, context: &mut C, changes: &[Change]) -> Result<(), BatchError> {
		self.apply_changes_with(context, changes, |_, _| Ok(()))
	}

	/// Like [`Tree::apply_changes`], but runs `before_notify` between the two passes.
	///
	/// # Errors
	///
	/// Iff a record violates a list or key precondition in the first pass,
	/// `before_notify` fails,
	/// or a listener rejects a record in the second pass.
	/// The batch is aborted at that record.
	#[instrument(skip(self, context, changes, before_notify), fields(changes = changes.len()))]
	pub fn apply_changes_with<F>(&mut self, context: &mut C, changes: &[Change], before_notify: F) -> Result<(), BatchError>
	where
		F: FnOnce(&mut Self, &mut C) -> Result<(), BatchError>,
	{
		let result = match self.update_tree(changes) {
			Ok(applied) => before_notify(self, context).and_then(|()| self.notify_listeners(context, changes, &applied)),
			Err(error) => Err(error),
		};
		let released = self.release_detached();
		info!("Applied {} change(s), released {} node(s).", changes.len(), released);
		result
	}

	/// First pass: mutates the node store for every record.
	///
	/// # Errors
	///
	/// Iff a record violates a list or key precondition.
	pub fn update_tree(&mut self, changes: &[Change]) -> Result<Applied, BatchError> {
		let mut applied = Applied {
			detached: Vec::with_capacity(changes.len()),
		};
		for (index, change) in changes.iter().enumerate() {
			if let ChangeKind::Unsupported(change_type) = &change.kind {
				warn!("Skipping unsupported change type {:?} for node {}.", change_type, change.id);
				applied.detached.push(None);
				continue;
			}
			let detached = self.update_node(change).map_err(|source| BatchError::Update { index, source })?;
			applied.detached.push(detached);
		}
		Ok(applied)
	}

	fn update_node(&mut self, &Change { id, ref kind }: &Change) -> Result<Option<Value>, ChangeError> {
		self.nodes.ensure(id);
		match kind {
			ChangeKind::Put { key, value } => {
				self.nodes.ensure(id).put(key, Value::Scalar(value.clone()));
				Ok(None)
			}
			ChangeKind::PutNode { key, value } => {
				self.reattach(*value);
				self.nodes.ensure(*value);
				self.nodes.ensure(id).put(key, Value::Node(*value));
				Ok(None)
			}
			ChangeKind::PutOverride { template, value } => {
				self.reattach(*value);
				self.nodes.ensure(*value);
				self.nodes.ensure(id).put_override(*template, *value);
				Ok(None)
			}
			ChangeKind::Remove { key } => {
				let value = self.nodes.ensure(id).take(key)?;
				self.detach(&value);
				Ok(Some(value))
			}
			ChangeKind::ListInsert { key, index, value } => {
				self.nodes.ensure(id).list_insert(key, *index, Value::Scalar(value.clone()))?;
				Ok(None)
			}
			ChangeKind::ListInsertNode { key, index, value } => {
				self.reattach(*value);
				self.nodes.ensure(*value);
				self.nodes.ensure(id).list_insert(key, *index, Value::Node(*value))?;
				Ok(None)
			}
			ChangeKind::ListRemove { key, index } => {
				let value = self.nodes.ensure(id).list_remove(key, *index)?;
				self.detach(&value);
				Ok(Some(value))
			}
			ChangeKind::Unsupported(_) => Ok(None),
		}
	}

	/// Schedules every node reachable from `value` for release at the end of the batch.
	fn detach(&mut self, value: &Value) {
		let mut seen = HashSet::new();
		let mut detached = Vec::new();
		self.nodes.collect_detached(value, &mut detached, &mut seen);
		if !detached.is_empty() {
			trace!("Detached node(s) {:?}.", detached);
		}
		self.pending_release.extend(detached);
	}

	/// Keeps `node` and everything reachable from it if it was detached earlier in this batch.
	fn reattach(&mut self, node: NodeId) {
		if !self.pending_release.contains(&node) {
			return;
		}
		let mut seen = HashSet::new();
		let mut kept = Vec::new();
		self.nodes.collect_detached(&Value::Node(node), &mut kept, &mut seen);
		trace!("Reattached node(s) {:?}.", kept);
		self.pending_release.retain(|pending| !seen.contains(pending));
	}

	/// Second pass: dispatches each record, in batch order, to the listeners of its node.
	///
	/// Listeners added while a record is dispatched only observe later records.
	///
	/// # Errors
	///
	/// Iff a listener rejects a record.
	pub fn notify_listeners(&mut self, context: &mut C, changes: &[Change], applied: &Applied) -> Result<(), BatchError> {
		for (index, (change, detached)) in changes.iter().zip(&applied.detached).enumerate() {
			if let ChangeKind::Unsupported(_) = change.kind {
				continue;
			}
			let listeners = match self.listeners.get(&change.id) {
				Some(listeners) => listeners.clone(),
				None => continue,
			};

			let span = trace_span!("Dispatching change", index, node = %change.id, change_type = change.kind.type_name(), key = ?change.kind.key());
			let _enter = span.enter();
			let notification = Notification {
				node: change.id,
				kind: &change.kind,
				detached: detached.as_ref(),
			};
			for listener in listeners {
				listener
					.notify(self, context, &notification)
					.map_err(|source| BatchError::Notify { index, source })?;
			}
		}
		Ok(())
	}

	/// Removes the nodes detached since the last call and not reattached since. Returns how many were still present.
	pub fn release_detached(&mut self) -> usize {
		self.released.clear();
		for node in core::mem::take(&mut self.pending_release) {
			if self.nodes.contains(node) || self.listeners.contains_key(&node) {
				self.released.push(node);
			}
			self.remove_node(node);
		}
		self.released.len()
	}

	/// The nodes removed by the last [`Tree::release_detached`], which runs at the end of each batch.
	#[must_use]
	pub fn last_released(&self) -> &[NodeId] {
		&self.released
	}
}
