use thiserror::Error;

/// Invariant violations detected during a reconciliation pass.
///
/// These are caller errors: the owned region was changed behind the reconciler's back.
/// The pass stops where it is, without rolling back mutations that already happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
	#[error("boundary anchor not found in parent ({anchor})")]
	AnchorNotInParent { anchor: &'static str },

	#[error("owned region ended after {found} of {expected} rendered item(s)")]
	RegionExhausted { expected: usize, found: usize },
}
