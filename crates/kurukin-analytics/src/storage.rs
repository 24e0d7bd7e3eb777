// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key-value persistence for the analytics store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::StorageError;

/// Durable string key-value storage, the role local storage plays in a browser.
pub trait KeyValueStorage: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage, optionally bounded by a byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: Mutex<BTreeMap<String, String>>,
	quota_bytes: Option<usize>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Storage that rejects writes once keys plus values exceed `bytes`.
	pub fn with_quota(bytes: usize) -> Self {
		Self {
			entries: Mutex::new(BTreeMap::new()),
			quota_bytes: Some(bytes),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

impl KeyValueStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut entries = self.entries.lock();
		if let Some(quota) = self.quota_bytes {
			let used: usize = entries
				.iter()
				.filter(|(k, _)| k.as_str() != key)
				.map(|(k, v)| k.len() + v.len())
				.sum();
			if used + key.len() + value.len() > quota {
				return Err(StorageError::QuotaExceeded {
					key: key.to_string(),
				});
			}
		}
		entries.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.entries.lock().remove(key);
		Ok(())
	}
}

/// Storage for contexts without persistence. Reads find nothing, writes fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStorage;

impl KeyValueStorage for NoStorage {
	fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
		Ok(None)
	}

	fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
		Err(StorageError::Unavailable)
	}

	fn remove(&self, _key: &str) -> Result<(), StorageError> {
		Err(StorageError::Unavailable)
	}
}

/// Storage backed by one JSON object on disk.
///
/// The whole map is rewritten on every change through a temporary file and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
	path: PathBuf,
	entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
	/// Opens the file at `path`, creating parent directories as needed.
	///
	/// A missing file starts empty. So does an unreadable JSON body.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}

		let entries = match std::fs::read_to_string(&path) {
			Ok(raw) => match serde_json::from_str(&raw) {
				Ok(entries) => entries,
				Err(e) => {
					debug!(path = %path.display(), error = %e, "Ignoring malformed storage file");
					BTreeMap::new()
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
			Err(e) => return Err(e.into()),
		};

		Ok(Self {
			path,
			entries: Mutex::new(entries),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
		let body = serde_json::to_string_pretty(entries)?;
		let tmp = self.path.with_extension("tmp");
		std::fs::write(&tmp, body)?;
		std::fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}

impl KeyValueStorage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut entries = self.entries.lock();
		entries.insert(key.to_string(), value.to_string());
		self.flush(&entries)
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		let mut entries = self.entries.lock();
		if entries.remove(key).is_some() {
			self.flush(&entries)?;
		}
		Ok(())
	}
}
