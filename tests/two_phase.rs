use statetree_dom::{
	tree::{NodeListener, Notification, Tree},
	BatchError, Change, ChangeError,
	ChangeKind::{self, ListInsertNode, ListRemove, Put, PutNode, PutOverride, Remove},
	NodeId, Scalar, TemplateId, Value,
};
use std::rc::Rc;

type Log = Vec<String>;

fn change(id: u32, kind: ChangeKind) -> Change {
	Change { id: NodeId(id), kind }
}

fn put(id: u32, key: &str, value: &str) -> Change {
	change(
		id,
		Put {
			key: key.into(),
			value: Scalar::String(value.into()),
		},
	)
}

/// Logs every notification together with what the node store says at that time.
struct Recorder;
impl NodeListener<Log> for Recorder {
	fn notify(&self, tree: &mut Tree<Log>, log: &mut Log, notification: &Notification<'_>) -> Result<(), ChangeError> {
		let entry = match notification.kind {
			ListInsertNode { value, .. } => {
				let label = tree.nodes().get(*value).and_then(|child| child.get("label")).cloned();
				format!("{} listInsertNode {} label={:?}", notification.node, value, label)
			}
			kind => format!("{} {} {:?} detached={:?}", notification.node, kind.type_name(), kind.key(), notification.detached),
		};
		log.push(entry);
		Ok(())
	}
}

/// Binds a [`Recorder`] to every child inserted into `CHILDREN`, like element bindings do.
struct Binder;
impl NodeListener<Log> for Binder {
	fn notify(&self, tree: &mut Tree<Log>, log: &mut Log, notification: &Notification<'_>) -> Result<(), ChangeError> {
		if let ListInsertNode { value, .. } = notification.kind {
			tree.add_listener(*value, Rc::new(Recorder));
			log.push(format!("bound {}", value));
		}
		Ok(())
	}
}

/// Rejects everything, like a binding receiving a change it doesn't support.
struct Strict;
impl NodeListener<Log> for Strict {
	fn notify(&self, _: &mut Tree<Log>, _: &mut Log, notification: &Notification<'_>) -> Result<(), ChangeError> {
		Err(ChangeError::Unsupported {
			binding: "strict",
			change_type: notification.kind.type_name().to_owned(),
			key: notification.kind.key().unwrap_or_default().to_owned(),
		})
	}
}

#[test]
fn listeners_see_the_whole_batch() {
	let mut tree = Tree::<Log>::new();
	tree.add_listener(NodeId(2), Rc::new(Recorder));
	let mut log = Log::new();

	tree.apply_changes(
		&mut log,
		&[
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
			put(3, "label", "late"),
		],
	)
	.unwrap();

	assert_eq!(log, vec![r#"2 listInsertNode 3 label=Some(Scalar(String("late")))"#.to_owned()]);
}

#[test]
fn listeners_added_during_dispatch_observe_later_records() {
	let mut tree = Tree::<Log>::new();
	tree.add_listener(NodeId(2), Rc::new(Binder));
	let mut log = Log::new();

	tree.apply_changes(
		&mut log,
		&[
			put(3, "label", "early"),
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
			put(3, "label", "late"),
		],
	)
	.unwrap();

	assert_eq!(log, vec!["bound 3".to_owned(), r#"3 put Some("label") detached=None"#.to_owned()]);
	assert_eq!(tree.listener_count(NodeId(3)), 1);
}

#[test]
fn dispatch_follows_batch_order() {
	let mut tree = Tree::<Log>::new();
	tree.add_listener(NodeId(2), Rc::new(Recorder));
	tree.add_listener(NodeId(4), Rc::new(Recorder));
	let mut log = Log::new();

	tree.apply_changes(&mut log, &[put(4, "a", "1"), put(2, "b", "2"), put(9, "unobserved", "3"), put(4, "c", "4")])
		.unwrap();

	let keys: Vec<_> = log.iter().map(|entry| entry.split(' ').take(3).collect::<Vec<_>>().join(" ")).collect();
	assert_eq!(keys, vec![r#"4 put Some("a")"#, r#"2 put Some("b")"#, r#"4 put Some("c")"#]);
}

#[test]
fn unsupported_change_types_are_skipped() {
	let mut tree = Tree::<Log>::new();
	tree.add_listener(NodeId(2), Rc::new(Recorder));
	let mut log = Log::new();

	tree.apply_changes(&mut log, &[change(2, ChangeKind::Unsupported("splice".into())), put(2, "a", "1")])
		.unwrap();

	assert_eq!(log.len(), 1);
	assert!(log[0].starts_with("2 put"));
}

#[test]
fn detached_values_reach_listeners() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(
		&mut log,
		&[
			change(
				2,
				ChangeKind::ListInsert {
					key: "LISTENERS".into(),
					index: 0,
					value: Scalar::String("click".into()),
				},
			),
			put(2, "title", "x"),
		],
	)
	.unwrap();

	tree.add_listener(NodeId(2), Rc::new(Recorder));
	tree.apply_changes(
		&mut log,
		&[change(2, ListRemove { key: "LISTENERS".into(), index: 0 }), change(2, Remove { key: "title".into() })],
	)
	.unwrap();

	assert_eq!(
		log,
		vec![
			r#"2 listRemove Some("LISTENERS") detached=Some(Scalar(String("click")))"#.to_owned(),
			r#"2 remove Some("title") detached=Some(Scalar(String("x")))"#.to_owned(),
		]
	);
}

#[test]
fn listener_errors_abort_the_rest_of_the_batch() {
	let mut tree = Tree::<Log>::new();
	tree.add_listener(NodeId(2), Rc::new(Recorder));
	tree.add_listener(NodeId(3), Rc::new(Strict));
	let mut log = Log::new();

	let error = tree.apply_changes(&mut log, &[put(2, "a", "1"), put(3, "b", "2"), put(2, "c", "3")]).unwrap_err();

	assert!(matches!(error, BatchError::Notify { index: 1, source: ChangeError::Unsupported { binding: "strict", .. } }));
	assert_eq!(log.len(), 1);
	// The first pass completed regardless.
	assert!(tree.nodes().get(NodeId(2)).unwrap().get("c").is_some());
}

#[test]
fn removed_nodes_are_released_after_dispatch() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(&mut log, &[change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) })])
		.unwrap();
	tree.add_listener(NodeId(3), Rc::new(Recorder));

	// Records for the removed node later in the same batch are still dispatched to its listeners.
	tree.apply_changes(&mut log, &[change(2, ListRemove { key: "CHILDREN".into(), index: 0 }), put(3, "late", "x")])
		.unwrap();
	assert_eq!(log.len(), 1);
	assert!(!tree.nodes().contains(NodeId(3)));
	assert!(!tree.has_listeners(NodeId(3)));
}

#[test]
fn nodes_are_released_when_the_batch_aborts() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(&mut log, &[change(2, PutNode { key: "child".into(), value: NodeId(3) })]).unwrap();
	tree.add_listener(NodeId(4), Rc::new(Strict));

	let error = tree.apply_changes(&mut log, &[change(2, Remove { key: "child".into() }), put(4, "a", "1")]).unwrap_err();
	assert!(matches!(error, BatchError::Notify { index: 1, .. }));
	assert!(!tree.nodes().contains(NodeId(3)));
}

#[test]
fn overrides_are_registered_in_the_first_pass() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(&mut log, &[change(4, PutOverride { template: TemplateId(7), value: NodeId(9) })]).unwrap();

	assert_eq!(tree.nodes().get(NodeId(4)).unwrap().override_for(TemplateId(7)), Some(NodeId(9)));
	assert_eq!(tree.nodes().get(NodeId(4)).unwrap().override_for(TemplateId(8)), None);
	assert!(tree.nodes().contains(NodeId(9)));
}

#[test]
fn before_notify_runs_between_the_passes() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();

	tree.apply_changes_with(
		&mut log,
		&[
			change(1, PutNode { key: "body".into(), value: NodeId(2) }),
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
		],
		|tree, log| {
			let body = tree.nodes().get(NodeId::ROOT).and_then(|root| root.child("body"));
			assert_eq!(body, Some(NodeId(2)));
			assert_eq!(tree.nodes().get(NodeId(2)).unwrap().list("CHILDREN"), Some(&[Value::Node(NodeId(3))][..]));
			tree.add_listener(NodeId(2), Rc::new(Recorder));
			log.push("mounted".to_owned());
			Ok(())
		},
	)
	.unwrap();

	assert_eq!(log[0], "mounted");
	assert!(log[1].starts_with("2 listInsertNode 3"));
}

#[test]
fn nodes_moved_within_a_batch_are_kept() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(
		&mut log,
		&[
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 1, value: NodeId(4) }),
			put(3, "TAG", "P"),
		],
	)
	.unwrap();
	tree.add_listener(NodeId(3), Rc::new(Recorder));

	tree.apply_changes(
		&mut log,
		&[
			change(2, ListRemove { key: "CHILDREN".into(), index: 0 }),
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 1, value: NodeId(3) }),
		],
	)
	.unwrap();

	assert_eq!(
		tree.nodes().get(NodeId(2)).unwrap().list("CHILDREN"),
		Some(&[Value::Node(NodeId(4)), Value::Node(NodeId(3))][..])
	);
	assert_eq!(tree.nodes().get(NodeId(3)).unwrap().tag(), Some("P"));
	assert_eq!(tree.listener_count(NodeId(3)), 1);
	assert!(tree.last_released().is_empty());
}

#[test]
fn moved_nodes_keep_their_descendants() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(
		&mut log,
		&[
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
			change(3, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(5) }),
			change(3, PutOverride { template: TemplateId(7), value: NodeId(6) }),
			put(5, "label", "deep"),
		],
	)
	.unwrap();

	tree.apply_changes(
		&mut log,
		&[
			change(2, ListRemove { key: "CHILDREN".into(), index: 0 }),
			change(2, PutNode { key: "featured".into(), value: NodeId(3) }),
		],
	)
	.unwrap();

	for id in &[3, 5, 6] {
		assert!(tree.nodes().contains(NodeId(*id)), "node {} was released", id);
	}
	assert!(tree.nodes().get(NodeId(5)).unwrap().get("label").is_some());
}

#[test]
fn reattached_nodes_can_be_detached_again() {
	let mut tree = Tree::<Log>::new();
	let mut log = Log::new();
	tree.apply_changes(&mut log, &[change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) })])
		.unwrap();

	tree.apply_changes(
		&mut log,
		&[
			change(2, ListRemove { key: "CHILDREN".into(), index: 0 }),
			change(2, ListInsertNode { key: "CHILDREN".into(), index: 0, value: NodeId(3) }),
			change(2, ListRemove { key: "CHILDREN".into(), index: 0 }),
		],
	)
	.unwrap();

	assert!(!tree.nodes().contains(NodeId(3)));
	assert_eq!(tree.last_released(), &[NodeId(3)][..]);
}
