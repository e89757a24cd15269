//! Binds a [`ListReconciler`] to a [`Runtime`], so the rendered list follows its data source.

use crate::{
	reconcile::ListReconciler,
	runtime::Runtime,
	tree::{Anchors, NodeTree, Rendered},
};
use core::{cell::RefCell, hash::Hash};
use std::rc::Rc;
use tracing::{error, trace_span};

/// Called after each pass with the first node of the owned region (if any) and the after-anchor.
pub type AfterRender<N> = Box<dyn FnMut(Option<N>, Option<N>)>;

/// A handle to a list mounted with [`each`].
///
/// Dropping it does not unmount the list. Teardown happens through the [`Runtime`]'s cleanup.
pub struct Each<T: NodeTree, I>(Rc<RefCell<ListReconciler<T, I>>>);

impl<T: NodeTree, I: Clone> Each<T, I> {
	/// The items rendered by the last pass.
	#[must_use]
	pub fn rendered(&self) -> Vec<I> {
		self.0.borrow().rendered().to_vec()
	}
}

impl<T: NodeTree, I> Each<T, I> {
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().rendered().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The number of live item disposers.
	#[must_use]
	pub fn disposer_count(&self) -> usize {
		self.0.borrow().disposer_count()
	}
}

/// Renders the items returned by `data` into `parent` (between `anchors`) and keeps them in sync.
///
/// `data` is read with dependency tracking, so the list is reconciled again whenever the runtime
/// decides that what it read changed. Everything else (rendering, tree mutation, disposal) runs
/// inside [`Runtime::sample`], so item renders can't subscribe the list to their own inputs.
///
/// The current scope's cleanup runs every live item's disposer in index order. It detaches nothing,
/// since removing the owning container is the caller's responsibility.
pub fn each<R, T, I, D, F>(runtime: &R, tree: T, parent: T::Node, anchors: Anchors<T::Node>, mut data: D, mut render: F, mut after_render: Option<AfterRender<T::Node>>) -> Each<T, I>
where
	R: Runtime + Clone + 'static,
	T: NodeTree + 'static,
	T::Node: 'static,
	I: Eq + Hash + 'static,
	D: FnMut() -> Vec<I> + 'static,
	F: FnMut(&I, usize) -> Rendered<T::Node> + 'static,
{
	let reconciler = Rc::new(RefCell::new(ListReconciler::new(tree, parent, anchors)));

	runtime.on_cleanup(Box::new({
		let reconciler = Rc::clone(&reconciler);
		move || match reconciler.try_borrow_mut() {
			Ok(mut reconciler) => reconciler.dispose(),
			Err(_) => error!("List disposed while it was being reconciled. Item disposers were not run."),
		}
	}));

	runtime.run_on_change(Box::new({
		let reconciler = Rc::clone(&reconciler);
		let runtime = runtime.clone();
		move || {
			let span = trace_span!("each");
			let _enter = span.enter();

			let items = data();
			runtime.sample(|| {
				let mut reconciler = match reconciler.try_borrow_mut() {
					Ok(reconciler) => reconciler,
					Err(_) => return error!("List reconciliation re-entered itself. Skipping this update."),
				};
				if let Err(error) = reconciler.reconcile(&runtime, items, &mut render) {
					error!("Skipping after-render hook: {}", error);
					return;
				}
				if let Some(after_render) = after_render.as_mut() {
					let (first, after) = reconciler.extent();
					after_render(first, after)
				}
			})
		}
	}));

	Each(reconciler)
}
