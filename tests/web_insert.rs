#![cfg(target_arch = "wasm32")]

use lignin_each::{insert, web::WebTree, Insertable, NodeTree};
use std::sync::Once;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::window;

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

#[wasm_bindgen_test]
fn inserts_before_a_marker() {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let tree = WebTree::new(document.clone());
	let container = document.create_element("div").unwrap();
	let parent: web_sys::Node = container.clone().into();
	let marker = tree.create_text("|");
	tree.insert_before(&parent, &marker, None);

	let span: web_sys::Node = document.create_element("span").unwrap().into();
	span.set_text_content(Some("foo"));

	let current = insert(&tree, &parent, Insertable::List(vec!["a".into(), Insertable::Node(span.clone()), false.into()]), vec![], Some(&marker));
	assert_eq!(container.inner_html(), "a<span>foo</span>|");

	let current = insert(&tree, &parent, Insertable::Node(span), current, Some(&marker));
	assert_eq!(container.inner_html(), "<span>foo</span>|");

	insert(&tree, &parent, Insertable::Nothing, current, Some(&marker));
	assert_eq!(container.inner_html(), "|");
}

#[wasm_bindgen_test]
fn keeps_text_nodes_with_equal_data() {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let tree = WebTree::new(document.clone());
	let container = document.create_element("div").unwrap();
	let parent: web_sys::Node = container.clone().into();

	let current = insert(&tree, &parent, Insertable::List(vec!["a".into(), "b".into()]), vec![], None);
	assert_eq!(tree.text_data(&current[0]).as_deref(), Some("a"));
	assert_eq!(tree.text_data(&parent), None);

	let next = insert(&tree, &parent, Insertable::List(vec!["b".into(), "a".into()]), current.clone(), None);
	assert_eq!(container.inner_html(), "ba");
	assert_eq!(next, vec![current[1].clone(), current[0].clone()]);
}
