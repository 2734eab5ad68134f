//! Pass results and audit records

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of decision recorded during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
	Added,
	Modified,
	Deleted,
	Conflict,
	Error,
}

impl fmt::Display for ActionType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ActionType::Added => "added",
			ActionType::Modified => "modified",
			ActionType::Deleted => "deleted",
			ActionType::Conflict => "conflict",
			ActionType::Error => "error",
		};
		f.write_str(s)
	}
}

/// One decision made during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAction {
	#[serde(rename = "type")]
	pub action_type: ActionType,
	pub source: PathBuf,
	pub destination: Option<PathBuf>,
	pub detail: Option<String>,
}

impl fmt::Display for SyncAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.action_type, self.source.display())?;
		if let Some(dest) = &self.destination {
			write!(f, " -> {}", dest.display())?;
		}
		if let Some(detail) = &self.detail {
			write!(f, " ({})", detail)?;
		}
		Ok(())
	}
}

/// Outcome of one pass over one sync set
///
/// A pass always produces a result; per-file failures land in `errors`
/// next to the success counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
	pub files_added: usize,
	pub files_deleted: usize,
	pub files_modified: usize,
	pub conflicts: usize,
	pub errors: Vec<String>,
	pub actions: Vec<SyncAction>,
}

impl SyncResult {
	pub fn new() -> Self {
		Self::default()
	}

	/// A result holding only a pass-aborting error
	pub fn failed(message: String) -> Self {
		let mut result = Self::default();
		result.errors.push(message);
		result
	}

	/// True when the pass changed nothing and hit no errors
	pub fn is_noop(&self) -> bool {
		self.files_added == 0
			&& self.files_deleted == 0
			&& self.files_modified == 0
			&& self.conflicts == 0
			&& self.errors.is_empty()
	}

	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}

	pub fn record_added(&mut self, source: &Path, dest: &Path) {
		self.files_added += 1;
		self.push(ActionType::Added, source, Some(dest), None);
	}

	pub fn record_modified(&mut self, source: &Path, dest: &Path) {
		self.files_modified += 1;
		self.push(ActionType::Modified, source, Some(dest), None);
	}

	pub fn record_deleted(&mut self, path: &Path) {
		self.files_deleted += 1;
		self.push(ActionType::Deleted, path, None, None);
	}

	/// Log a conflict action without touching the counter
	pub fn record_conflict_action(&mut self, source: &Path, dest: &Path, detail: String) {
		self.push(ActionType::Conflict, source, Some(dest), Some(detail));
	}

	pub fn count_conflict(&mut self) {
		self.conflicts += 1;
	}

	pub fn record_error(&mut self, operation: &str, path: &Path, error: impl fmt::Display) {
		let message = format!("{} {}: {}", operation, path.display(), error);
		self.push(ActionType::Error, path, None, Some(message.clone()));
		self.errors.push(message);
	}

	fn push(
		&mut self,
		action_type: ActionType,
		source: &Path,
		destination: Option<&Path>,
		detail: Option<String>,
	) {
		self.actions.push(SyncAction {
			action_type,
			source: source.to_path_buf(),
			destination: destination.map(Path::to_path_buf),
			detail,
		});
	}
}

impl fmt::Display for SyncResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"+{} -{} ~{} conflicts:{} errors:{}",
			self.files_added,
			self.files_deleted,
			self.files_modified,
			self.conflicts,
			self.errors.len()
		)
	}
}


// vim: ts=4
