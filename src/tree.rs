//! The tree mutation substrate a [`ListReconciler`](`crate::reconcile::ListReconciler`) works on.
//!
//! Implementations behave like the [***DOM***](https://developer.mozilla.org/en-US/docs/Web/API/Document_Object_Model):
//! Nodes are cheap handles, all methods take `&self` and inserting an already attached node moves it.

use core::{
	cell::Cell,
	fmt::{self, Debug},
};

/// A linear sequence of child nodes under parent nodes, plus a side table of fragment [`GroupId`]s.
///
/// The reconciler assumes a non-throwing substrate.
/// Implementations that can fail (like [`WebTree`](`crate::web::WebTree`)) should log and carry on.
pub trait NodeTree {
	/// A node handle. Equality must be node identity.
	type Node: Clone + PartialEq + Debug;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, parent: &Self::Node) -> Option<Self::Node>;
	fn last_child(&self, parent: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Inserts `node` into `parent` before `reference`, or at the end if `reference` is [`None`].
	///
	/// If `node` is attached anywhere already, it is moved.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

	fn remove_child(&self, parent: &Self::Node, node: &Self::Node);

	/// Removes all children of `parent` at once (like setting ***textContent*** to `""`).
	fn clear_children(&self, parent: &Self::Node);

	fn create_text(&self, data: &str) -> Self::Node;

	/// The data of `node` if it is a text node.
	fn text_data(&self, node: &Self::Node) -> Option<String>;

	/// Looks up the fragment group `node` was tagged with, if any.
	fn group_of(&self, node: &Self::Node) -> Option<GroupId>;

	/// Tags (or with [`None`] untags) `node` in the group side table.
	fn set_group(&self, node: &Self::Node, group: Option<GroupId>);
}

/// Identifies the top-level nodes of one rendered fragment.
///
/// Ids are allocated from a thread-wide counter, so adjacent fragments
/// (even when rendered by different reconcilers) never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

thread_local! {
	static NEXT_GROUP_ID: Cell<u64> = Cell::new(1);
}

impl GroupId {
	#[must_use]
	pub fn next() -> Self {
		NEXT_GROUP_ID.with(|next| {
			let id = next.get();
			next.set(id.wrapping_add(1).max(1));
			Self(id)
		})
	}

	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}

	/// Reconstructs a [`GroupId`] from a value previously returned by [`GroupId::get`].
	#[must_use]
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}
}

impl fmt::Display for GroupId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// What a render function produces for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<N> {
	Node(N),
	/// Several top-level nodes that are moved and removed together.
	Fragment(Vec<N>),
}

impl<N> From<N> for Rendered<N> {
	fn from(node: N) -> Self {
		Self::Node(node)
	}
}

impl<N> Rendered<N> {
	/// The top-level nodes in document order.
	#[must_use]
	pub fn into_nodes(self) -> Vec<N> {
		match self {
			Rendered::Node(node) => vec![node],
			Rendered::Fragment(nodes) => nodes,
		}
	}
}

/// The boundary of the region a reconciler owns within its parent.
///
/// [`None`] extends the region to the parent's physical start or end respectively.
/// Anchors are never created, moved or removed by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchors<N> {
	pub before: Option<N>,
	pub after: Option<N>,
}

impl<N> Default for Anchors<N> {
	fn default() -> Self {
		Self::none()
	}
}

impl<N> Anchors<N> {
	/// The reconciler owns all children of its parent.
	#[must_use]
	pub fn none() -> Self {
		Self { before: None, after: None }
	}

	#[must_use]
	pub fn between(before: N, after: N) -> Self {
		Self {
			before: Some(before),
			after: Some(after),
		}
	}

	/// The reconciler owns everything before `after`.
	#[must_use]
	pub fn before(after: N) -> Self {
		Self { before: None, after: Some(after) }
	}

	#[must_use]
	pub fn is_unanchored(&self) -> bool {
		self.before.is_none() && self.after.is_none()
	}
}
