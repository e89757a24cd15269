//! Insertion of loosely typed content (text, nodes, nothing or nested lists of those) before a marker node.
//!
//! This shares the anchor convention of [`each`](`crate::each::each`), but has no item identity of its own:
//! Nodes are their own keys. It's meant for short lists. Keyed lists of any length should use `each`.

use crate::tree::NodeTree;
use tracing::trace;

/// Content for [`insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Insertable<N> {
	/// Renders nothing, like `null` or `undefined` content.
	Nothing,
	/// Renders nothing either way.
	Bool(bool),
	/// Becomes a text node. A current text node with the same data is kept instead.
	Text(String),
	/// Inserted as is. A node that's attached elsewhere is moved, not cloned.
	Node(N),
	/// Flattened in order, recursively.
	List(Vec<Insertable<N>>),
}

impl<N> Default for Insertable<N> {
	fn default() -> Self {
		Self::Nothing
	}
}

impl<N> From<&str> for Insertable<N> {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl<N> From<String> for Insertable<N> {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl<N> From<bool> for Insertable<N> {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<N> From<Vec<Insertable<N>>> for Insertable<N> {
	fn from(list: Vec<Insertable<N>>) -> Self {
		Self::List(list)
	}
}

impl<N> Insertable<N> {
	#[must_use]
	pub fn node(node: N) -> Self {
		Self::Node(node)
	}

	/// A list of nodes.
	#[must_use]
	pub fn nodes(nodes: impl IntoIterator<Item = N>) -> Self {
		Self::List(nodes.into_iter().map(Self::Node).collect())
	}

	/// Flattens `self` into `nodes`, taking text nodes with matching data out of `reusable` first.
	fn flatten_into<T: NodeTree<Node = N>>(self, tree: &T, reusable: &mut Vec<(N, String)>, nodes: &mut Vec<N>) {
		match self {
			Insertable::Nothing | Insertable::Bool(_) => (),
			Insertable::Text(text) => {
				let node = match reusable.iter().position(|(_, data)| *data == text) {
					Some(index) => reusable.remove(index).0,
					None => tree.create_text(&text),
				};
				nodes.push(node)
			}
			Insertable::Node(node) => nodes.push(node),
			Insertable::List(list) => {
				for value in list {
					value.flatten_into(tree, reusable, nodes)
				}
			}
		}
	}
}

/// Replaces the nodes `current` (as returned by the previous call for this position) with `value`,
/// placing them directly before `marker` or, without a marker, at the end of `parent`.
///
/// Nodes that are already in place aren't touched, and text nodes in `current` are reused for equal text.
/// Returns the nodes now inserted, to be passed back in as `current` on the next call.
pub fn insert<T: NodeTree>(tree: &T, parent: &T::Node, value: Insertable<T::Node>, current: Vec<T::Node>, marker: Option<&T::Node>) -> Vec<T::Node> {
	let mut reusable: Vec<_> = current
		.iter()
		.filter(|node| tree.parent_node(node).as_ref() == Some(parent))
		.filter_map(|node| tree.text_data(node).map(|data| (node.clone(), data)))
		.collect();
	let mut nodes = Vec::new();
	value.flatten_into(tree, &mut reusable, &mut nodes);

	for stale in current {
		if !nodes.contains(&stale) && tree.parent_node(&stale).as_ref() == Some(parent) {
			tree.remove_child(parent, &stale);
		}
	}

	let mut reference = marker.cloned();
	let mut moved = 0;
	for node in nodes.iter().rev() {
		let in_place = tree.parent_node(node).as_ref() == Some(parent) && tree.next_sibling(node) == reference;
		if !in_place {
			tree.insert_before(parent, node, reference.as_ref());
			moved += 1;
		}
		reference = Some(node.clone());
	}
	trace!("Inserted {} node(s), {} of which were (re)placed.", nodes.len(), moved);

	nodes
}
