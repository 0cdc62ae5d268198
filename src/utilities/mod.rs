// Utilities module
// Path mapping and permission helpers

pub mod paths;
pub mod permissions;

pub use paths::{absolute_path, counterpart, is_inside, normalize_path};
pub use permissions::{clear_readonly, remove_tree};
