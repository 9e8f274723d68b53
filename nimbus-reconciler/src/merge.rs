//! Merge-preserving-unknowns for child collections.
//!
//! Existing children always survive untouched (including fields we never
//! set, so concurrent vendor-side edits are kept). Desired children whose key
//! is missing are appended. The returned flag says whether anything was
//! appended; when it is false the existing collection already converged.

use std::collections::HashSet;
use std::hash::Hash;

/// A child element identified by its name.
pub trait Named {
    fn name(&self) -> &str;
}

/// Merge `desired` into `existing` keyed by `key`.
///
/// Returns the union (existing order first) and whether any desired element
/// was missing.
pub fn merge_by_key<T, K, F>(existing: &[T], desired: &[T], key: F) -> (Vec<T>, bool)
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = existing.iter().map(&key).collect();
    let mut merged = existing.to_vec();
    let mut changed = false;
    for item in desired {
        if seen.insert(key(item)) {
            merged.push(item.clone());
            changed = true;
        }
    }
    (merged, changed)
}

/// [`merge_by_key`] keyed by [`Named::name`].
pub fn merge_by_name<T: Named + Clone>(existing: &[T], desired: &[T]) -> (Vec<T>, bool) {
    merge_by_key(existing, desired, |item| item.name().to_string())
}
