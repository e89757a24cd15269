#![doc(html_root_url = "https://docs.rs/lignin-each/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod each;
pub mod error;
pub mod group;
pub mod insert;
pub mod lis;
pub mod memory;
pub mod reconcile;
pub mod runtime;
pub mod tree;
pub mod web;

pub use crate::{
	each::{each, AfterRender, Each},
	error::ReconcileError,
	insert::{insert, Insertable},
	reconcile::{ListReconciler, PassSummary},
	runtime::{Disposer, ManualRuntime, Runtime},
	tree::{Anchors, GroupId, NodeTree, Rendered},
};
