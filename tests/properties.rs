//! Property tests for list reconciliation over arbitrary sequences of passes.
//!
//! Items render to text nodes (or two-node fragments) and register a cleanup that logs the item,
//! so every disposal can be traced back to the item that owned it.

#![cfg(not(target_arch = "wasm32"))]

use lignin_each::{
	each,
	lis::longest_increasing_subsequence,
	memory::{MemoryTree, NodeId},
	Anchors, Each, ManualRuntime, NodeTree, Rendered, Runtime,
};
use proptest::prelude::*;
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

type Log = Rc<RefCell<Vec<u8>>>;

struct Fixture {
	runtime: ManualRuntime,
	tree: MemoryTree,
	parent: NodeId,
	anchored: bool,
	fragments: bool,
	data: Log,
	renders: Log,
	disposed: Log,
	list: Each<MemoryTree, u8>,
}

impl Fixture {
	fn mount(anchored: bool, fragments: bool) -> Self {
		let runtime = ManualRuntime::new();
		let tree = MemoryTree::new();
		let parent = tree.create_element("div");
		let anchors = if anchored {
			let (before, after) = (tree.create_text("<"), tree.create_text(">"));
			tree.insert_before(&parent, &before, None);
			tree.insert_before(&parent, &after, None);
			Anchors::between(before, after)
		} else {
			Anchors::none()
		};

		let data: Log = Rc::default();
		let renders: Log = Rc::default();
		let disposed: Log = Rc::default();
		let list = each(
			&runtime,
			tree.clone(),
			parent,
			anchors,
			{
				let data = Rc::clone(&data);
				move || data.borrow().clone()
			},
			{
				let (tree, runtime) = (tree.clone(), runtime.clone());
				let (renders, disposed) = (Rc::clone(&renders), Rc::clone(&disposed));
				move |&item: &u8, _| {
					renders.borrow_mut().push(item);
					let disposed = Rc::clone(&disposed);
					runtime.on_cleanup(Box::new(move || disposed.borrow_mut().push(item)));
					let text = tree.create_text(&item.to_string());
					if fragments {
						Rendered::Fragment(vec![text, tree.create_text(",")])
					} else {
						Rendered::Node(text)
					}
				}
			},
			None,
		);

		Self {
			runtime,
			tree,
			parent,
			anchored,
			fragments,
			data,
			renders,
			disposed,
			list,
		}
	}

	fn set(&self, items: &[u8]) {
		*self.data.borrow_mut() = items.to_vec();
		self.runtime.notify();
	}

	fn expected_html(&self, items: &[u8]) -> String {
		let separator = if self.fragments { "," } else { "" };
		let content: String = items.iter().map(|item| format!("{}{}", item, separator)).collect();
		if self.anchored {
			format!("<{}>", content)
		} else {
			content
		}
	}
}

fn counts(items: &[u8]) -> BTreeMap<u8, usize> {
	let mut counts = BTreeMap::new();
	for &item in items {
		*counts.entry(item).or_insert(0) += 1;
	}
	counts
}

fn unique_items() -> impl Strategy<Value = Vec<u8>> {
	proptest::sample::subsequence((0..12).collect::<Vec<u8>>(), 0..=12).prop_shuffle()
}

/// O(n²) reference for the length of the longest strictly increasing run of `Some` values.
fn naive_lis_len(positions: &[Option<usize>]) -> usize {
	let mut best = vec![0_usize; positions.len()];
	for i in 0..positions.len() {
		if let Some(value) = positions[i] {
			best[i] = 1 + (0..i).filter(|&j| matches!(positions[j], Some(p) if p < value)).map(|j| best[j]).max().unwrap_or(0);
		}
	}
	best.into_iter().max().unwrap_or(0)
}

proptest! {
	#[test]
	fn disposers_follow_their_items(anchored: bool, fragments: bool, passes in prop::collection::vec(unique_items(), 1..8)) {
		let fixture = Fixture::mount(anchored, fragments);
		let mut previous: Vec<u8> = Vec::new();

		for next in passes {
			let (renders_before, disposed_before) = (fixture.renders.borrow().len(), fixture.disposed.borrow().len());
			fixture.set(&next);

			prop_assert_eq!(fixture.tree.inner_html(&fixture.parent), fixture.expected_html(&next));
			prop_assert_eq!(fixture.list.disposer_count(), next.len());

			let mut disposed = fixture.disposed.borrow()[disposed_before..].to_vec();
			let mut expected: Vec<u8> = previous.iter().copied().filter(|item| !next.contains(item)).collect();
			disposed.sort_unstable();
			expected.sort_unstable();
			prop_assert_eq!(disposed, expected);

			let mut rendered = fixture.renders.borrow()[renders_before..].to_vec();
			let mut expected: Vec<u8> = next.iter().copied().filter(|item| !previous.contains(item)).collect();
			rendered.sort_unstable();
			expected.sort_unstable();
			prop_assert_eq!(rendered, expected);

			previous = next;
		}

		let disposed_before = fixture.disposed.borrow().len();
		fixture.runtime.dispose();
		let disposed = fixture.disposed.borrow()[disposed_before..].to_vec();
		prop_assert_eq!(disposed, previous);
	}

	#[test]
	fn permuting_and_restoring_only_moves(fragments: bool, items in unique_items(), seed in any::<u64>()) {
		let fixture = Fixture::mount(true, fragments);
		fixture.set(&items);
		let renders = fixture.renders.borrow().len();

		let mut permuted = items.clone();
		// Deterministic shuffle from the seed.
		let mut state = seed | 1;
		for i in (1..permuted.len()).rev() {
			state ^= state << 13;
			state ^= state >> 7;
			state ^= state << 17;
			#[allow(clippy::cast_possible_truncation)]
			permuted.swap(i, (state % (i as u64 + 1)) as usize);
		}

		fixture.tree.reset_stats();
		fixture.set(&permuted);
		fixture.set(&items);

		prop_assert_eq!(fixture.tree.inner_html(&fixture.parent), fixture.expected_html(&items));
		prop_assert_eq!(fixture.tree.stats().removals, 0);
		prop_assert_eq!(fixture.renders.borrow().len(), renders);
		prop_assert!(fixture.disposed.borrow().is_empty());
		prop_assert_eq!(fixture.list.disposer_count(), items.len());
	}

	#[test]
	fn duplicates_balance_out(passes in prop::collection::vec(prop::collection::vec(0..5_u8, 0..8), 1..6)) {
		let fixture = Fixture::mount(false, false);
		for next in &passes {
			fixture.set(next);
			prop_assert_eq!(fixture.tree.inner_html(&fixture.parent), fixture.expected_html(next));
			prop_assert_eq!(fixture.list.disposer_count(), next.len());

			// Every render is either disposed or still live.
			let mut live = counts(&fixture.renders.borrow());
			for (item, disposed) in counts(&fixture.disposed.borrow()) {
				let count = live.entry(item).or_insert(0);
				prop_assert!(*count >= disposed);
				*count -= disposed;
			}
			live.retain(|_, count| *count > 0);
			prop_assert_eq!(live, counts(next));
		}
	}

	#[test]
	fn lis_is_increasing_and_longest(values in prop::collection::vec(proptest::option::of(0..40_usize), 0..24), start in 0..4_usize) {
		// Old positions are distinct within a pass.
		let mut seen = Vec::new();
		let positions: Vec<Option<usize>> = values.into_iter().map(|value| value.filter(|v| if seen.contains(v) { false } else { seen.push(*v); true })).collect();
		let start = start.min(positions.len());

		let longest = longest_increasing_subsequence(&positions, start);
		for pair in longest.windows(2) {
			prop_assert!(pair[0] < pair[1]);
			prop_assert!(positions[pair[0]] < positions[pair[1]]);
		}
		for &index in &longest {
			prop_assert!(index >= start);
			prop_assert!(positions[index].is_some());
		}
		prop_assert_eq!(longest.len(), naive_lis_len(&positions[start..]));
	}
}
