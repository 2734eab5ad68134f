//! Manifest comparison

use std::collections::BTreeMap;

use crate::manifest::{FileEntry, Manifest};

/// What changed in one peer between its last sync and now
///
/// The four maps are disjoint and keyed by relative path. Entries in
/// `added`, `modified` and `unchanged` come from the current manifest;
/// `deleted` entries come from the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
	pub added: BTreeMap<String, FileEntry>,
	pub deleted: BTreeMap<String, FileEntry>,
	pub modified: BTreeMap<String, FileEntry>,
	pub unchanged: BTreeMap<String, FileEntry>,
}

impl ManifestDiff {
	/// True when nothing was added, modified or deleted
	pub fn is_clean(&self) -> bool {
		self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
	}

	pub fn is_added(&self, path: &str) -> bool {
		self.added.contains_key(path)
	}

	pub fn is_modified(&self, path: &str) -> bool {
		self.modified.contains_key(path)
	}

	/// Added or modified since the last sync
	pub fn is_changed(&self, path: &str) -> bool {
		self.is_added(path) || self.is_modified(path)
	}
}

/// Compare a previous manifest against a current one by content hash
pub fn diff(previous: &Manifest, current: &Manifest) -> ManifestDiff {
	let mut result = ManifestDiff::default();

	for entry in current.iter() {
		let key = entry.relative_path.clone();
		match previous.get(&entry.relative_path) {
			None => {
				result.added.insert(key, entry.clone());
			}
			Some(prev) if prev.hash != entry.hash => {
				result.modified.insert(key, entry.clone());
			}
			Some(_) => {
				result.unchanged.insert(key, entry.clone());
			}
		}
	}

	for entry in previous.iter() {
		if !current.contains(&entry.relative_path) {
			result.deleted.insert(entry.relative_path.clone(), entry.clone());
		}
	}

	result
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(path: &str, hash: &str, mtime_ms: i64) -> FileEntry {
		FileEntry { relative_path: path.into(), size: 1, mtime_ms, hash: hash.into() }
	}

	fn manifest(entries: Vec<FileEntry>) -> Manifest {
		entries.into_iter().collect()
	}

	#[test]
	fn test_diff_classifies_every_path() {
		let previous = manifest(vec![entry("same", "h1", 1), entry("edit", "h2", 1), entry("gone", "h3", 1)]);
		let current = manifest(vec![entry("same", "h1", 1), entry("edit", "h2b", 2), entry("new", "h4", 2)]);

		let d = diff(&previous, &current);

		assert_eq!(d.added.keys().collect::<Vec<_>>(), vec!["new"]);
		assert_eq!(d.modified.keys().collect::<Vec<_>>(), vec!["edit"]);
		assert_eq!(d.deleted.keys().collect::<Vec<_>>(), vec!["gone"]);
		assert_eq!(d.unchanged.keys().collect::<Vec<_>>(), vec!["same"]);
		assert_eq!(d.modified["edit"].hash, "h2b");
		assert_eq!(d.deleted["gone"].hash, "h3");
	}

	#[test]
	fn test_mtime_only_change_is_unchanged() {
		let previous = manifest(vec![entry("a", "h", 1)]);
		let current = manifest(vec![entry("a", "h", 999)]);

		let d = diff(&previous, &current);
		assert!(d.is_clean());
		assert!(d.unchanged.contains_key("a"));
	}

	#[test]
	fn test_empty_previous_means_all_added() {
		let current = manifest(vec![entry("a", "h", 1), entry("b/c", "h2", 1)]);

		let d = diff(&Manifest::new(), &current);
		assert_eq!(d.added.len(), 2);
		assert!(d.is_changed("b/c"));
		assert!(!d.is_modified("b/c"));
	}

	#[test]
	fn test_partition_invariant() {
		let previous = manifest(vec![entry("a", "1", 0), entry("b", "2", 0), entry("c", "3", 0)]);
		let current = manifest(vec![entry("b", "2", 0), entry("c", "x", 0), entry("d", "4", 0)]);
		let d = diff(&previous, &current);

		let mut current_keys: Vec<&String> =
			d.added.keys().chain(d.unchanged.keys()).chain(d.modified.keys()).collect();
		current_keys.sort();
		assert_eq!(current_keys, vec!["b", "c", "d"]);

		let mut previous_keys: Vec<&String> =
			d.deleted.keys().chain(d.unchanged.keys()).chain(d.modified.keys()).collect();
		previous_keys.sort();
		assert_eq!(previous_keys, vec!["a", "b", "c"]);
	}
}

// vim: ts=4
