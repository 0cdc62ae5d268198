// Operations module
// Comparison, reconciliation, pruning and the pass that ties them together

pub mod compare;
pub mod outcome;
pub mod prune;
pub mod reconcile;
pub mod sync;

pub use compare::{ContentComparator, FileSignature, FileStatus};
pub use outcome::{EntryKind, ItemOutcome};
pub use prune::TreePruner;
pub use reconcile::{copy_atomic, FileReconciler};
pub use sync::{SyncEngine, SyncOptions, SyncResult};
