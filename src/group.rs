//! Group-aware sibling stepping, so a fragment's nodes are always walked, moved and removed as one unit.

use crate::tree::NodeTree;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Forward,
	Backward,
}

fn physical_step<T: NodeTree>(tree: &T, node: &T::Node, direction: Direction) -> Option<T::Node> {
	match direction {
		Direction::Forward => tree.next_sibling(node),
		Direction::Backward => tree.previous_sibling(node),
	}
}

/// Steps from `node` to the neighbouring unit in `direction`.
///
/// If `node` carries a group id, the remaining nodes of its fragment in that direction are skipped first.
pub fn step<T: NodeTree>(tree: &T, node: &T::Node, direction: Direction) -> Option<T::Node> {
	physical_step(tree, &unit_edge(tree, node, direction), direction)
}

/// The last node of `node`'s unit in `direction`, which is `node` itself for ungrouped nodes.
pub fn unit_edge<T: NodeTree>(tree: &T, node: &T::Node, direction: Direction) -> T::Node {
	let mut node = node.clone();
	if let Some(group) = tree.group_of(&node) {
		while let Some(next) = physical_step(tree, &node, direction) {
			if tree.group_of(&next) != Some(group) {
				break;
			}
			node = next;
		}
	}
	node
}

/// Detaches the unit starting at `first` and clears its group tags.
///
/// Returns the node after the unit.
pub fn remove_unit<T: NodeTree>(tree: &T, parent: &T::Node, first: &T::Node) -> Option<T::Node> {
	let end = step(tree, first, Direction::Forward);
	let mut node = Some(first.clone());
	while let Some(current) = node {
		if Some(&current) == end.as_ref() {
			break;
		}
		node = tree.next_sibling(&current);
		tree.remove_child(parent, &current);
		tree.set_group(&current, None);
	}
	trace!("Removed unit.");
	end
}

/// Moves the unit starting at `first` before `reference` (or to the end of `parent`), keeping its node order.
///
/// Returns the node that followed the unit at its old position.
pub fn move_unit_before<T: NodeTree>(tree: &T, parent: &T::Node, first: &T::Node, reference: Option<&T::Node>) -> Option<T::Node> {
	let end = step(tree, first, Direction::Forward);
	let mut node = Some(first.clone());
	while let Some(current) = node {
		if Some(&current) == end.as_ref() {
			break;
		}
		node = tree.next_sibling(&current);
		tree.insert_before(parent, &current, reference);
	}
	end
}

/// Removes every node from `start` up to (but excluding) `end` in a single sweep.
pub fn remove_range<T: NodeTree>(tree: &T, parent: &T::Node, start: Option<T::Node>, end: Option<&T::Node>) {
	let mut node = start;
	while let Some(current) = node {
		if Some(&current) == end {
			break;
		}
		node = tree.next_sibling(&current);
		tree.remove_child(parent, &current);
		tree.set_group(&current, None);
	}
}
