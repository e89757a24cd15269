//! The reactive capabilities a reconciler needs from its host.

use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{error, trace};

/// Tears down one rendered item's resources. Called at most once, which [`FnOnce`] enforces.
pub type Disposer = Box<dyn FnOnce()>;

/// The reactive substrate (signal graph, polling loop, explicit subscriptions...) that drives reconciliation.
pub trait Runtime {
	/// Runs `update` now and again whenever anything it read (outside of [`Runtime::sample`]) changes.
	fn run_on_change(&self, update: Box<dyn FnMut()>);

	/// Registers `cleanup` with the current disposal scope.
	fn on_cleanup(&self, cleanup: Box<dyn FnOnce()>);

	/// Runs `scope` in a new disposal scope and hands it the [`Disposer`] for that scope.
	fn root<R>(&self, scope: impl FnOnce(Disposer) -> R) -> R;

	/// Runs `block` without establishing reactive dependencies.
	fn sample<R>(&self, block: impl FnOnce() -> R) -> R;
}

type Cleanups = Rc<RefCell<Vec<Box<dyn FnOnce()>>>>;

struct Update {
	active: Cell<bool>,
	run: RefCell<Box<dyn FnMut()>>,
}

#[derive(Default)]
struct State {
	updates: RefCell<Vec<Rc<Update>>>,
	scopes: RefCell<Vec<Cleanups>>,
	top_level: Cleanups,
	sampling: Cell<usize>,
}

impl State {
	fn current_scope(&self) -> Option<Cleanups> {
		self.scopes.borrow().last().cloned()
	}
}

/// Pops the innermost scope even if the [`Runtime::root`] body unwinds.
struct ScopeGuard<'a>(&'a State);

impl Drop for ScopeGuard<'_> {
	fn drop(&mut self) {
		self.0.scopes.borrow_mut().pop();
	}
}

/// Ends a [`Runtime::sample`] block even if it unwinds.
struct SampleGuard<'a>(&'a Cell<usize>);

impl Drop for SampleGuard<'_> {
	fn drop(&mut self) {
		self.0.set(self.0.get() - 1)
	}
}

/// A synchronous [`Runtime`] without dependency tracking: registered updates re-run on [`ManualRuntime::notify`].
///
/// Cleanups and updates registered inside [`Runtime::root`] belong to that root and end when its [`Disposer`] is called.
/// All others end on [`ManualRuntime::dispose`], with cleanups running in registration order.
#[derive(Clone, Default)]
pub struct ManualRuntime(Rc<State>);

impl ManualRuntime {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Re-runs every registered update, in registration order.
	///
	/// Updates that are unregistered by an earlier one in the same round don't run.
	pub fn notify(&self) {
		let updates = self.0.updates.borrow().clone();
		trace!("Notifying {} update(s).", updates.len());
		for update in updates {
			if !update.active.get() {
				continue;
			}
			match update.run.try_borrow_mut() {
				Ok(mut run) => (*run)(),
				Err(_) => error!("Update re-entered itself while running. Skipping."),
			}
		}
	}

	/// Runs all top-level cleanups and forgets all registered updates.
	pub fn dispose(&self) {
		for update in self.0.updates.borrow_mut().drain(..) {
			update.active.set(false)
		}
		let cleanups = self.0.top_level.borrow_mut().drain(..).collect::<Vec<_>>();
		trace!("Running {} top-level cleanup(s).", cleanups.len());
		for cleanup in cleanups {
			cleanup()
		}
	}

	/// Whether code running right now would establish reactive dependencies.
	#[must_use]
	pub fn is_tracking(&self) -> bool {
		self.0.sampling.get() == 0
	}

	#[must_use]
	pub fn update_count(&self) -> usize {
		self.0.updates.borrow().len()
	}
}

impl Runtime for ManualRuntime {
	fn run_on_change(&self, update: Box<dyn FnMut()>) {
		let update = Rc::new(Update {
			active: Cell::new(true),
			run: RefCell::new(update),
		});
		self.0.updates.borrow_mut().push(Rc::clone(&update));

		if let Some(scope) = self.0.current_scope() {
			let state: Weak<State> = Rc::downgrade(&self.0);
			let registered = Rc::downgrade(&update);
			scope.borrow_mut().push(Box::new(move || {
				if let (Some(state), Some(registered)) = (state.upgrade(), registered.upgrade()) {
					registered.active.set(false);
					state.updates.borrow_mut().retain(|update| !Rc::ptr_eq(update, &registered));
				}
			}));
		}

		let mut run = update.run.borrow_mut();
		(*run)()
	}

	fn on_cleanup(&self, cleanup: Box<dyn FnOnce()>) {
		match self.0.current_scope() {
			Some(scope) => scope.borrow_mut().push(cleanup),
			None => self.0.top_level.borrow_mut().push(cleanup),
		}
	}

	fn root<R>(&self, scope: impl FnOnce(Disposer) -> R) -> R {
		let cleanups: Cleanups = Rc::default();
		let disposer: Disposer = {
			let cleanups = Rc::clone(&cleanups);
			Box::new(move || {
				let cleanups = cleanups.borrow_mut().drain(..).collect::<Vec<_>>();
				for cleanup in cleanups {
					cleanup()
				}
			})
		};

		self.0.scopes.borrow_mut().push(cleanups);
		let _guard = ScopeGuard(&self.0);
		scope(disposer)
	}

	fn sample<R>(&self, block: impl FnOnce() -> R) -> R {
		let sampling = &self.0.sampling;
		sampling.set(sampling.get() + 1);
		let _guard = SampleGuard(sampling);
		block()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::panic::{self, AssertUnwindSafe};

	#[test]
	fn updates_rerun_on_notify() {
		let runtime = ManualRuntime::new();
		let runs = Rc::new(Cell::new(0));
		{
			let runs = Rc::clone(&runs);
			runtime.run_on_change(Box::new(move || runs.set(runs.get() + 1)));
		}
		assert_eq!(runs.get(), 1);
		runtime.notify();
		runtime.notify();
		assert_eq!(runs.get(), 3);
		runtime.dispose();
		runtime.notify();
		assert_eq!(runs.get(), 3);
	}

	#[test]
	fn root_scopes_own_their_cleanups() {
		let runtime = ManualRuntime::new();
		let log = Rc::new(RefCell::new(Vec::new()));

		let disposer = runtime.root(|disposer| {
			let log = Rc::clone(&log);
			runtime.on_cleanup(Box::new(move || log.borrow_mut().push("item")));
			disposer
		});
		{
			let log = Rc::clone(&log);
			runtime.on_cleanup(Box::new(move || log.borrow_mut().push("top")));
		}

		disposer();
		assert_eq!(*log.borrow(), ["item"]);
		runtime.dispose();
		assert_eq!(*log.borrow(), ["item", "top"]);
	}

	#[test]
	fn updates_registered_in_a_root_end_with_it() {
		let runtime = ManualRuntime::new();
		let runs = Rc::new(Cell::new(0));
		let disposer = runtime.root(|disposer| {
			let runs = Rc::clone(&runs);
			runtime.run_on_change(Box::new(move || runs.set(runs.get() + 1)));
			disposer
		});
		assert_eq!(runtime.update_count(), 1);
		runtime.notify();
		assert_eq!(runs.get(), 2);

		disposer();
		assert_eq!(runtime.update_count(), 0);
		runtime.notify();
		assert_eq!(runs.get(), 2);
	}

	#[test]
	fn updates_unregistered_mid_round_are_skipped() {
		let runtime = ManualRuntime::new();
		let pending: Rc<RefCell<Option<Disposer>>> = Rc::default();
		let inner_runs = Rc::new(Cell::new(0));
		{
			let pending = Rc::clone(&pending);
			runtime.run_on_change(Box::new(move || {
				let disposer = pending.borrow_mut().take();
				if let Some(disposer) = disposer {
					disposer()
				}
			}));
		}
		let disposer = runtime.root(|disposer| {
			let inner_runs = Rc::clone(&inner_runs);
			runtime.run_on_change(Box::new(move || inner_runs.set(inner_runs.get() + 1)));
			disposer
		});
		*pending.borrow_mut() = Some(disposer);
		assert_eq!(inner_runs.get(), 1);

		runtime.notify();
		assert_eq!(inner_runs.get(), 1);
		assert_eq!(runtime.update_count(), 1);
	}

	#[test]
	fn root_and_sample_recover_from_panics() {
		let runtime = ManualRuntime::new();
		let result = panic::catch_unwind(AssertUnwindSafe(|| runtime.root(|_| runtime.sample(|| panic!("render failed")))));
		assert!(result.is_err());
		assert!(runtime.is_tracking());

		let log = Rc::new(RefCell::new(Vec::new()));
		{
			let log = Rc::clone(&log);
			runtime.on_cleanup(Box::new(move || log.borrow_mut().push("top")));
		}
		runtime.dispose();
		assert_eq!(*log.borrow(), ["top"]);
	}

	#[test]
	fn sample_suspends_tracking() {
		let runtime = ManualRuntime::new();
		assert!(runtime.is_tracking());
		runtime.sample(|| {
			assert!(!runtime.is_tracking());
			runtime.sample(|| assert!(!runtime.is_tracking()));
			assert!(!runtime.is_tracking());
		});
		assert!(runtime.is_tracking());
	}
}
