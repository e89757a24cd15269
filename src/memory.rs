//! An in-process [`NodeTree`], for headless rendering and for testing reconcilers without a browser.

use crate::tree::{GroupId, NodeTree};
use core::cell::{Ref, RefCell, RefMut};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::error;

/// A handle to a node in a [`MemoryTree`]. Only meaningful for the tree that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Element(String),
	Text(String),
}

#[derive(Debug)]
struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	first_child: Option<NodeId>,
	last_child: Option<NodeId>,
	previous_sibling: Option<NodeId>,
	next_sibling: Option<NodeId>,
}

/// Counts of structural mutations, so tests can assert on how much work a reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
	/// Calls to [`NodeTree::insert_before`], including moves.
	pub insertions: usize,
	/// Nodes detached through [`NodeTree::remove_child`] or [`NodeTree::clear_children`].
	pub removals: usize,
}

impl MutationStats {
	#[must_use]
	pub fn total(&self) -> usize {
		self.insertions + self.removals
	}
}

#[derive(Debug, Default)]
struct Arena {
	nodes: Vec<NodeData>,
	groups: HashMap<NodeId, GroupId>,
	stats: MutationStats,
}

impl Arena {
	fn node(&self, id: NodeId) -> &NodeData {
		&self.nodes[id.0]
	}

	fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
		&mut self.nodes[id.0]
	}

	fn push(&mut self, kind: NodeKind) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(NodeData {
			kind,
			parent: None,
			first_child: None,
			last_child: None,
			previous_sibling: None,
			next_sibling: None,
		});
		id
	}

	fn detach(&mut self, id: NodeId) {
		let (parent, previous, next) = {
			let node = self.node(id);
			(node.parent, node.previous_sibling, node.next_sibling)
		};
		let parent = match parent {
			Some(parent) => parent,
			None => return,
		};
		match previous {
			Some(previous) => self.node_mut(previous).next_sibling = next,
			None => self.node_mut(parent).first_child = next,
		}
		match next {
			Some(next) => self.node_mut(next).previous_sibling = previous,
			None => self.node_mut(parent).last_child = previous,
		}
		let node = self.node_mut(id);
		node.parent = None;
		node.previous_sibling = None;
		node.next_sibling = None;
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.node(node).parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}
}

/// A cheaply cloneable handle to an arena of element and text nodes.
///
/// Clones share the same arena, which allows render closures to hold on to the tree they render into.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree(Rc<RefCell<Arena>>);

impl MemoryTree {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn arena(&self) -> Ref<'_, Arena> {
		self.0.borrow()
	}

	fn arena_mut(&self) -> RefMut<'_, Arena> {
		self.0.borrow_mut()
	}

	#[must_use]
	pub fn create_element(&self, name: &str) -> NodeId {
		self.arena_mut().push(NodeKind::Element(name.to_owned()))
	}

	#[must_use]
	pub fn kind(&self, node: &NodeId) -> NodeKind {
		self.arena().node(*node).kind.clone()
	}

	/// Replaces the data of a text node. Elements are left unchanged.
	pub fn set_text(&self, node: &NodeId, data: &str) {
		match &mut self.arena_mut().node_mut(*node).kind {
			NodeKind::Text(text) => data.clone_into(text),
			NodeKind::Element(name) => error!("Tried to set text data of <{}>.", name),
		}
	}

	#[must_use]
	pub fn child_nodes(&self, parent: &NodeId) -> Vec<NodeId> {
		let arena = self.arena();
		let mut children = Vec::new();
		let mut child = arena.node(*parent).first_child;
		while let Some(id) = child {
			children.push(id);
			child = arena.node(id).next_sibling;
		}
		children
	}

	/// The concatenated text of `node` and all its descendants, like ***Node.textContent***.
	#[must_use]
	pub fn text_content(&self, node: &NodeId) -> String {
		fn collect(arena: &Arena, id: NodeId, out: &mut String) {
			match &arena.node(id).kind {
				NodeKind::Text(text) => out.push_str(text),
				NodeKind::Element(_) => {
					let mut child = arena.node(id).first_child;
					while let Some(c) = child {
						collect(arena, c, out);
						child = arena.node(c).next_sibling;
					}
				}
			}
		}

		let mut out = String::new();
		collect(&self.arena(), *node, &mut out);
		out
	}

	/// A compact markup rendering of `node`'s children, like ***Element.innerHTML*** without escaping.
	#[must_use]
	pub fn inner_html(&self, node: &NodeId) -> String {
		fn write(arena: &Arena, id: NodeId, out: &mut String) {
			match &arena.node(id).kind {
				NodeKind::Text(text) => out.push_str(text),
				NodeKind::Element(name) => {
					out.push('<');
					out.push_str(name);
					out.push('>');
					write_children(arena, id, out);
					out.push_str("</");
					out.push_str(name);
					out.push('>');
				}
			}
		}

		fn write_children(arena: &Arena, id: NodeId, out: &mut String) {
			let mut child = arena.node(id).first_child;
			while let Some(c) = child {
				write(arena, c, out);
				child = arena.node(c).next_sibling;
			}
		}

		let mut out = String::new();
		write_children(&self.arena(), *node, &mut out);
		out
	}

	#[must_use]
	pub fn stats(&self) -> MutationStats {
		self.arena().stats
	}

	pub fn reset_stats(&self) {
		self.arena_mut().stats = MutationStats::default();
	}
}

impl NodeTree for MemoryTree {
	type Node = NodeId;

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.arena().node(*node).parent
	}

	fn first_child(&self, parent: &NodeId) -> Option<NodeId> {
		self.arena().node(*parent).first_child
	}

	fn last_child(&self, parent: &NodeId) -> Option<NodeId> {
		self.arena().node(*parent).last_child
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		self.arena().node(*node).next_sibling
	}

	fn previous_sibling(&self, node: &NodeId) -> Option<NodeId> {
		self.arena().node(*node).previous_sibling
	}

	fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
		let mut arena = self.arena_mut();
		let (parent, node) = (*parent, *node);

		if arena.is_inclusive_ancestor(node, parent) {
			return error!("Tried to insert a node into itself or one of its descendants.");
		}
		if let Some(&reference) = reference {
			if reference == node {
				arena.stats.insertions += 1;
				return;
			}
			if arena.node(reference).parent != Some(parent) {
				return error!("Insertion reference is not a child of the parent.");
			}
		}

		arena.detach(node);

		let previous = match reference {
			Some(&reference) => arena.node(reference).previous_sibling,
			None => arena.node(parent).last_child,
		};
		{
			let data = arena.node_mut(node);
			data.parent = Some(parent);
			data.previous_sibling = previous;
			data.next_sibling = reference.copied();
		}
		match previous {
			Some(previous) => arena.node_mut(previous).next_sibling = Some(node),
			None => arena.node_mut(parent).first_child = Some(node),
		}
		match reference {
			Some(&reference) => arena.node_mut(reference).previous_sibling = Some(node),
			None => arena.node_mut(parent).last_child = Some(node),
		}
		arena.stats.insertions += 1;
	}

	fn remove_child(&self, parent: &NodeId, node: &NodeId) {
		let mut arena = self.arena_mut();
		if arena.node(*node).parent != Some(*parent) {
			return error!("Tried to remove a node that is not a child of the parent.");
		}
		arena.detach(*node);
		arena.stats.removals += 1;
	}

	fn clear_children(&self, parent: &NodeId) {
		let mut arena = self.arena_mut();
		while let Some(child) = arena.node(*parent).first_child {
			arena.detach(child);
			arena.groups.remove(&child);
			arena.stats.removals += 1;
		}
	}

	fn create_text(&self, data: &str) -> NodeId {
		self.arena_mut().push(NodeKind::Text(data.to_owned()))
	}

	fn text_data(&self, node: &NodeId) -> Option<String> {
		match &self.arena().node(*node).kind {
			NodeKind::Text(text) => Some(text.clone()),
			NodeKind::Element(_) => None,
		}
	}

	fn group_of(&self, node: &NodeId) -> Option<GroupId> {
		self.arena().groups.get(node).copied()
	}

	fn set_group(&self, node: &NodeId, group: Option<GroupId>) {
		let mut arena = self.arena_mut();
		match group {
			Some(group) => {
				arena.groups.insert(*node, group);
			}
			None => {
				arena.groups.remove(node);
			}
		}
	}
}
