//! [`NodeTree`] for the browser [***DOM***](https://developer.mozilla.org/en-US/docs/Web/API/Document_Object_Model).

use crate::tree::{GroupId, NodeTree};
use js_sys::{Object, WeakMap};
use tracing::{error, warn};
use wasm_bindgen::{JsCast, JsValue};

/// Mutates [`web_sys::Node`]s in place.
///
/// Fragment group ids are kept in a [***WeakMap***](https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/WeakMap)
/// side table instead of on the nodes themselves, so garbage collection takes care of detached nodes.
///
/// Platform errors (e.g. `HierarchyRequestError`) are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct WebTree {
	document: web_sys::Document,
	groups: WeakMap,
}

impl WebTree {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document, groups: WeakMap::new() }
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

fn key(node: &web_sys::Node) -> &Object {
	node.unchecked_ref()
}

impl NodeTree for WebTree {
	type Node = web_sys::Node;

	fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn first_child(&self, parent: &web_sys::Node) -> Option<web_sys::Node> {
		parent.first_child()
	}

	fn last_child(&self, parent: &web_sys::Node) -> Option<web_sys::Node> {
		parent.last_child()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn previous_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.previous_sibling()
	}

	fn insert_before(&self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(node, reference) {
			if cfg!(feature = "dangerous-logging") {
				error!("Failed to insert {:?}: {:?}", node, error)
			} else {
				error!("Failed to insert node: {:?}", error)
			}
		}
	}

	fn remove_child(&self, parent: &web_sys::Node, node: &web_sys::Node) {
		if let Err(error) = parent.remove_child(node) {
			if cfg!(feature = "dangerous-logging") {
				error!("Failed to remove {:?}: {:?}", node, error)
			} else {
				error!("Failed to remove node: {:?}", error)
			}
		}
	}

	fn clear_children(&self, parent: &web_sys::Node) {
		parent.set_text_content(Some(""))
	}

	fn create_text(&self, data: &str) -> web_sys::Node {
		self.document.create_text_node(data).into()
	}

	fn text_data(&self, node: &web_sys::Node) -> Option<String> {
		if node.node_type() == web_sys::Node::TEXT_NODE {
			node.text_content()
		} else {
			None
		}
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn group_of(&self, node: &web_sys::Node) -> Option<GroupId> {
		let raw = self.groups.get(key(node)).as_f64()?;
		if raw >= 1.0 && raw.fract() == 0.0 {
			Some(GroupId::from_raw(raw as u64))
		} else {
			warn!("Ignoring invalid group id {}.", raw);
			None
		}
	}

	fn set_group(&self, node: &web_sys::Node, group: Option<GroupId>) {
		match group {
			#[allow(clippy::cast_precision_loss)] // Group ids stay far below 2^53.
			Some(group) => {
				self.groups.set(key(node), &JsValue::from_f64(group.get() as f64));
			}
			None => {
				self.groups.delete(key(node));
			}
		}
	}
}
