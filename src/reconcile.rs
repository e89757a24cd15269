//! Keyed reconciliation of a rendered item list against a new item list.

use crate::{
	error::ReconcileError,
	group::{self, Direction},
	lis::longest_increasing_subsequence,
	runtime::{Disposer, Runtime},
	tree::{Anchors, GroupId, NodeTree, Rendered},
};
use core::{hash::Hash, iter, mem};
use hashbrown::HashMap;
use tracing::{error, info, instrument, trace, trace_span, warn};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
	/// Items that were rendered.
	pub created: usize,
	/// Kept items whose nodes were relocated.
	pub moved: usize,
	/// Items whose nodes were removed and whose disposer ran.
	pub removed: usize,
}

/// Owns the region of a parent node between two [`Anchors`] and keeps it in sync with a list of items.
///
/// # Item identity
///
/// Items are matched by [`Eq`] (and [`Hash`]) only, so they should be unique and stable across passes.
/// Wrap values in a keyed or reference-identity type where that isn't naturally the case.
///
/// Duplicate items are tolerated: each old occurrence claims the first unclaimed new occurrence
/// and surplus ones are recreated, so node reuse degrades but nothing leaks.
///
/// # Disposal
///
/// Each rendered item owns exactly one [`Disposer`]. It runs once, after the item's nodes were detached
/// when the item leaves the list, or during [`ListReconciler::dispose`]. It never runs for moved items.
pub struct ListReconciler<T: NodeTree, I> {
	tree: T,
	parent: T::Node,
	anchors: Anchors<T::Node>,
	rendered: Vec<I>,
	disposers: Vec<Disposer>,
}

impl<T: NodeTree, I> ListReconciler<T, I> {
	#[must_use]
	pub fn new(tree: T, parent: T::Node, anchors: Anchors<T::Node>) -> Self {
		Self {
			tree,
			parent,
			anchors,
			rendered: Vec::new(),
			disposers: Vec::new(),
		}
	}

	/// The committed items, in rendered order.
	#[must_use]
	pub fn rendered(&self) -> &[I] {
		&self.rendered
	}

	#[must_use]
	pub fn tree(&self) -> &T {
		&self.tree
	}

	#[must_use]
	pub fn parent(&self) -> &T::Node {
		&self.parent
	}

	/// The number of live disposers, which always equals the number of rendered items.
	#[must_use]
	pub fn disposer_count(&self) -> usize {
		self.disposers.len()
	}

	/// The first node of the owned region (if any) and the after-anchor.
	#[must_use]
	pub fn extent(&self) -> (Option<T::Node>, Option<T::Node>) {
		let first = match &self.anchors.before {
			Some(before) => self.tree.next_sibling(before),
			None => self.tree.first_child(&self.parent),
		};
		(first, self.anchors.after.clone())
	}

	/// Runs every live disposer in index order, without detaching any nodes.
	///
	/// A panicking disposer aborts the remaining disposals.
	pub fn dispose(&mut self) {
		trace!("Disposing {} item(s).", self.disposers.len());
		self.rendered.clear();
		for disposer in mem::take(&mut self.disposers) {
			disposer()
		}
	}

	fn resolve_parent(&mut self) -> Result<(), ReconcileError> {
		if let Some(before) = &self.anchors.before {
			match self.tree.parent_node(before) {
				Some(parent) => self.parent = parent,
				None => return Err(ReconcileError::AnchorNotInParent { anchor: "before" }),
			}
		}
		if let Some(after) = &self.anchors.after {
			if self.tree.parent_node(after).as_ref() != Some(&self.parent) {
				return Err(ReconcileError::AnchorNotInParent { anchor: "after" });
			}
		}
		Ok(())
	}
}

impl<T: NodeTree, I: Eq + Hash> ListReconciler<T, I> {
	/// Updates the owned region so it shows `data`, calling `render` once for each item that has no nodes yet.
	///
	/// Each render runs inside [`Runtime::root`], whose disposer becomes the item's disposer.
	///
	/// # Errors
	///
	/// Iff an anchor isn't a child of the parent (nothing is changed) or the region was modified externally.
	/// In the latter case the pass stops, the owned region is emptied, every disposer still held is run
	/// and the reconciler forgets its items, so the next pass renders everything anew.
	///
	/// # Panics
	///
	/// Panics from `render` or from a disposer propagate. The interrupted pass is torn down the same way
	/// as after [`ReconcileError::RegionExhausted`] while unwinding (where a second panic aborts).
	#[instrument(skip(self, runtime, data, render), fields(old_len = self.rendered.len(), new_len = data.len()))]
	pub fn reconcile<R, F>(&mut self, runtime: &R, data: Vec<I>, render: F) -> Result<PassSummary, ReconcileError>
	where
		R: Runtime,
		F: FnMut(&I, usize) -> Rendered<T::Node>,
	{
		self.resolve_parent()?;

		let old = mem::take(&mut self.rendered);
		let mut pass = Pass {
			tree: &self.tree,
			parent: &self.parent,
			anchors: &self.anchors,
			runtime,
			render,
			old_disposers: mem::take(&mut self.disposers).into_iter().map(Some).collect(),
			next_disposers: iter::repeat_with(|| None).take(data.len()).collect(),
			summary: PassSummary::default(),
			finished: false,
		};

		match pass.run(&old, &data) {
			Ok(()) => {
				self.disposers = pass.finish();
				self.rendered = data;
				let summary = pass.summary;
				info!("Reconciled {} item(s): {} created, {} moved, {} removed.", self.rendered.len(), summary.created, summary.moved, summary.removed);
				Ok(summary)
			}
			Err(error) => {
				error!("Reconciliation failed: {}. Clearing the region and disposing all items.", error);
				pass.abandon();
				Err(error)
			}
		}
	}
}

/// The state of one reconciliation pass.
///
/// Disposers are moved from `old_disposers` (indexed like the old items) into `next_disposers`
/// (indexed like the new items) as items are matched, so their correspondence can't drift.
///
/// A pass that is dropped before it finished (i.e. a panicking render or disposer) is abandoned:
/// Units can't be matched to items by position anymore once it moved some of them.
struct Pass<'a, T: NodeTree, R, F> {
	tree: &'a T,
	parent: &'a T::Node,
	anchors: &'a Anchors<T::Node>,
	runtime: &'a R,
	render: F,
	old_disposers: Vec<Option<Disposer>>,
	next_disposers: Vec<Option<Disposer>>,
	summary: PassSummary,
	finished: bool,
}

impl<'a, T: NodeTree, R, F> Pass<'a, T, R, F> {
	fn region_start(&self) -> Option<T::Node> {
		match &self.anchors.before {
			Some(before) => self.tree.next_sibling(before),
			None => self.tree.first_child(self.parent),
		}
	}

	/// Hands out the disposers in new item order.
	fn finish(&mut self) -> Vec<Disposer> {
		self.finished = true;
		debug_assert!(self.old_disposers.iter().all(Option::is_none), "Disposer of a removed item was not run.");
		debug_assert!(self.next_disposers.iter().all(Option::is_some), "Rendered item without disposer.");
		mem::take(&mut self.next_disposers).into_iter().flatten().collect()
	}

	/// Empties the owned region, then runs every disposer this pass still holds (new items first).
	fn abandon(&mut self) {
		self.finished = true;
		if self.anchors.is_unanchored() {
			self.tree.clear_children(self.parent);
		} else {
			group::remove_range(self.tree, self.parent, self.region_start(), self.anchors.after.as_ref());
		}

		let disposers: Vec<_> = mem::take(&mut self.next_disposers).into_iter().chain(mem::take(&mut self.old_disposers)).flatten().collect();
		trace!("Running {} disposer(s) of the abandoned pass.", disposers.len());
		for disposer in disposers {
			disposer()
		}
	}
}

impl<'a, T: NodeTree, R, F> Drop for Pass<'a, T, R, F> {
	fn drop(&mut self) {
		if !self.finished {
			error!("Reconciliation was interrupted. Clearing the region and disposing all items.");
			self.abandon();
		}
	}
}

impl<'a, T: NodeTree, R: Runtime, F> Pass<'a, T, R, F> {
	#[allow(clippy::too_many_lines)]
	fn run<I>(&mut self, old: &[I], new: &[I]) -> Result<(), ReconcileError>
	where
		I: Eq + Hash,
		F: FnMut(&I, usize) -> Rendered<T::Node>,
	{
		if new.is_empty() {
			let span = trace_span!("Clearing");
			let _enter = span.enter();
			if self.anchors.is_unanchored() {
				self.tree.clear_children(self.parent);
			} else {
				group::remove_range(self.tree, self.parent, self.region_start(), self.anchors.after.as_ref());
			}
			for index in 0..old.len() {
				self.dispose(index);
			}
			return Ok(());
		}

		if old.is_empty() {
			let span = trace_span!("Creating");
			let _enter = span.enter();
			for (index, item) in new.iter().enumerate() {
				self.create(item, index, self.anchors.after.as_ref());
			}
			return Ok(());
		}

		// Half-open ranges of the items that are not settled yet.
		let (mut prev_start, mut prev_end) = (0, old.len());
		let (mut new_start, mut new_end) = (0, new.len());

		// The first node of `old[prev_start]` and the last node of `old[prev_end - 1]`.
		let mut front = self.region_start();
		let mut back = match &self.anchors.after {
			Some(after) => self.tree.previous_sibling(after),
			None => self.tree.last_child(self.parent),
		};
		// The first node after the unsettled region, i.e. where the tail is placed.
		let mut tail_ref = self.anchors.after.clone();

		let exhausted = |found: usize| ReconcileError::RegionExhausted { expected: old.len(), found };

		'fixes: loop {
			let mut progress = false;

			while old[prev_start] == new[new_start] {
				let first = front.ok_or_else(|| exhausted(prev_start))?;
				front = group::step(self.tree, &first, Direction::Forward);
				self.keep(prev_start, new_start);
				prev_start += 1;
				new_start += 1;
				if prev_start == prev_end || new_start == new_end {
					break 'fixes;
				}
			}

			while old[prev_end - 1] == new[new_end - 1] {
				let last = back.ok_or_else(|| exhausted(prev_end))?;
				let first = group::unit_edge(self.tree, &last, Direction::Backward);
				back = self.tree.previous_sibling(&first);
				tail_ref = Some(first);
				self.keep(prev_end - 1, new_end - 1);
				prev_end -= 1;
				new_end -= 1;
				if prev_start == prev_end || new_start == new_end {
					break 'fixes;
				}
			}

			// The old tail moves to the front.
			while old[prev_end - 1] == new[new_start] {
				let span = trace_span!("Swapping backward", from = prev_end - 1, to = new_start);
				let _enter = span.enter();
				progress = true;

				let last = back.ok_or_else(|| exhausted(prev_end))?;
				let first = group::unit_edge(self.tree, &last, Direction::Backward);
				let previous = self.tree.previous_sibling(&first);
				if front.as_ref() == Some(&first) {
					front = group::step(self.tree, &last, Direction::Forward);
				} else {
					group::move_unit_before(self.tree, self.parent, &first, front.as_ref());
					self.summary.moved += 1;
				}
				back = previous;

				self.keep(prev_end - 1, new_start);
				new_start += 1;
				prev_end -= 1;
				if prev_start == prev_end || new_start == new_end {
					break 'fixes;
				}
			}

			// The old head moves to the back.
			while old[prev_start] == new[new_end - 1] {
				let span = trace_span!("Swapping forward", from = prev_start, to = new_end - 1);
				let _enter = span.enter();
				progress = true;

				let first = front.ok_or_else(|| exhausted(prev_start))?;
				let next = group::step(self.tree, &first, Direction::Forward);
				if next != tail_ref {
					group::move_unit_before(self.tree, self.parent, &first, tail_ref.as_ref());
					self.summary.moved += 1;
				}
				tail_ref = Some(first);
				front = next;

				self.keep(prev_start, new_end - 1);
				prev_start += 1;
				new_end -= 1;
				if prev_start == prev_end || new_start == new_end {
					break 'fixes;
				}
			}

			if !progress {
				break;
			}
		}

		if new_start == new_end {
			let span = trace_span!("Shrinking", count = prev_end - prev_start);
			let _enter = span.enter();
			for index in prev_start..prev_end {
				let first = front.ok_or_else(|| exhausted(index))?;
				front = self.remove(&first, index);
			}
			return Ok(());
		}

		if prev_start == prev_end {
			let span = trace_span!("Adding", count = new_end - new_start);
			let _enter = span.enter();
			for index in new_start..new_end {
				self.create(&new[index], index, tail_ref.as_ref());
			}
			return Ok(());
		}

		// Identity index: Each item maps to its new indices, smallest last.
		let mut identity_index = HashMap::<&I, Vec<usize>>::with_capacity(new_end - new_start);
		let mut has_duplicates = false;
		for index in (new_start..new_end).rev() {
			let indices = identity_index.entry(&new[index]).or_default();
			has_duplicates |= !indices.is_empty();
			indices.push(index);
		}
		if has_duplicates {
			warn!("Duplicate items encountered. Node reuse is degraded; consider keying them uniquely.");
		}

		let mut positions = vec![None; new_end];
		let mut stale = Vec::new();
		for (index, item) in old.iter().enumerate().take(prev_end).skip(prev_start) {
			match identity_index.get_mut(item).and_then(Vec::pop) {
				Some(new_index) => positions[new_index] = Some(index),
				None => stale.push(index),
			}
		}

		let reusing = (prev_end - prev_start) - stale.len();
		if reusing == 0 {
			let span = trace_span!("Replacing", old = prev_end - prev_start, new = new_end - new_start);
			let _enter = span.enter();

			let first_child = self.tree.first_child(self.parent);
			let last_child = self.tree.last_child(self.parent);
			if self.anchors.is_unanchored() && front.is_some() && front == first_child && back == last_child {
				self.tree.clear_children(self.parent);
				for index in prev_start..prev_end {
					self.dispose(index);
				}
			} else {
				for index in prev_start..prev_end {
					let first = front.ok_or_else(|| exhausted(index))?;
					front = self.remove(&first, index);
				}
			}

			for index in new_start..new_end {
				self.create(&new[index], index, tail_ref.as_ref());
			}
			return Ok(());
		}

		let span = trace_span!("Reordering", reusing, stale = stale.len());
		let _enter = span.enter();

		// First nodes of the unsettled old units, indexed by `old_index - prev_start`.
		let mut nodes = Vec::with_capacity(prev_end - prev_start);
		let mut cursor = front;
		for index in prev_start..prev_end {
			let node = cursor.ok_or_else(|| exhausted(index))?;
			cursor = group::step(self.tree, &node, Direction::Forward);
			nodes.push(node);
		}

		for &index in &stale {
			self.remove(&nodes[index - prev_start], index);
		}

		let longest = longest_increasing_subsequence(&positions, new_start);
		let mut longest = longest.iter().rev().peekable();
		for index in (new_start..new_end).rev() {
			if longest.peek() == Some(&&index) {
				longest.next();
				if let Some(old_index) = positions[index] {
					tail_ref = Some(nodes[old_index - prev_start].clone());
					self.keep(old_index, index);
				}
				continue;
			}

			tail_ref = Some(match positions[index] {
				None => self.create(&new[index], index, tail_ref.as_ref()),
				Some(old_index) => {
					let first = &nodes[old_index - prev_start];
					if cfg!(feature = "dangerous-logging") {
						trace!(?first, "Moving unit {} -> {}.", old_index, index);
					} else {
						trace!("Moving unit {} -> {}.", old_index, index);
					}
					group::move_unit_before(self.tree, self.parent, first, tail_ref.as_ref());
					self.summary.moved += 1;
					self.keep(old_index, index);
					first.clone()
				}
			});
		}

		Ok(())
	}

	/// Carries the disposer of a kept item over to its new index.
	fn keep(&mut self, old_index: usize, new_index: usize) {
		self.next_disposers[new_index] = self.old_disposers[old_index].take();
	}

	fn dispose(&mut self, old_index: usize) {
		if let Some(disposer) = self.old_disposers[old_index].take() {
			disposer();
			self.summary.removed += 1;
		}
	}

	/// Detaches the unit starting at `first`, then runs its disposer. Returns the node after the unit.
	fn remove(&mut self, first: &T::Node, old_index: usize) -> Option<T::Node> {
		let next = group::remove_unit(self.tree, self.parent, first);
		self.dispose(old_index);
		next
	}

	/// Renders `item` into a fresh disposal root and inserts its nodes before `reference`.
	///
	/// Returns the unit's first node.
	fn create<I>(&mut self, item: &I, index: usize, reference: Option<&T::Node>) -> T::Node
	where
		F: FnMut(&I, usize) -> Rendered<T::Node>,
	{
		let (tree, runtime) = (self.tree, self.runtime);
		let render = &mut self.render;
		let slot = &mut self.next_disposers[index];
		let nodes = runtime.root(|disposer| {
			*slot = Some(disposer);
			render(item, index).into_nodes()
		});

		let mut nodes = nodes.into_iter();
		let first = match nodes.next() {
			Some(first) => first,
			None => {
				trace!("Empty fragment rendered for item {}. Inserting a placeholder.", index);
				let placeholder = tree.create_text("");
				tree.insert_before(self.parent, &placeholder, reference);
				self.summary.created += 1;
				return placeholder;
			}
		};

		let rest: Vec<_> = nodes.collect();
		if !rest.is_empty() {
			let group = GroupId::next();
			trace!("Tagging {}-node fragment of item {} with group {}.", rest.len() + 1, index, group);
			tree.set_group(&first, Some(group));
			for node in &rest {
				tree.set_group(node, Some(group));
			}
		}

		tree.insert_before(self.parent, &first, reference);
		for node in &rest {
			tree.insert_before(self.parent, node, reference);
		}
		self.summary.created += 1;
		first
	}
}
