// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser pixel loading and calls.
//!
//! Load state belongs to the document: every [`PixelLoader`] over the same
//! [`PixelHost`] shares one [`PixelSession`], so the script tag is inserted at
//! most once per page and `init` is issued once per pixel id. Concurrent
//! callers share one in-flight load:
//!
//! ```text
//! NotRequested ──ensure──▶ Loading ──ok──▶ Loaded
//!                             │
//!                             └─err─▶ (tag inserted)     Failed ──ensure──▶ Loaded
//!                                     (tag never added)  NotRequested
//! ```
//!
//! A settled load is never reused over the tag check. Once the tag is on the
//! page the host queues pixel calls, so a failed load that left its tag behind
//! counts as loaded on the next call.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use kurukin_analytics_core::{BrowserMethod, EventId};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PixelError;

/// DOM id of the injected script tag.
pub const PIXEL_SCRIPT_ID: &str = "kurukin-meta-pixel-script";

/// Pixel script source.
pub const PIXEL_SCRIPT_URL: &str = "https://connect.facebook.net/en_US/fbevents.js";

/// A call into the pixel global.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelCommand {
	Init {
		pixel_id: String,
	},
	Track {
		method: BrowserMethod,
		event_name: String,
		params: Value,
		event_id: EventId,
	},
}

impl PixelCommand {
	pub fn method(&self) -> &'static str {
		match self {
			PixelCommand::Init { .. } => "init",
			PixelCommand::Track { method, .. } => method.as_str(),
		}
	}
}

/// A document able to host the pixel.
#[async_trait]
pub trait PixelHost: Send + Sync {
	/// False outside a browser document.
	fn is_available(&self) -> bool;

	/// Whether a script tag with `id` is present.
	fn has_script(&self, id: &str) -> bool;

	/// Inserts a script tag and resolves once it has loaded.
	async fn load_script(&self, id: &str, src: &str) -> Result<(), PixelError>;

	/// Invokes the pixel global.
	fn call(&self, command: PixelCommand) -> Result<(), PixelError>;

	/// Pixel load state for this document, shared by every loader over it.
	fn session(&self) -> &PixelSession;
}

/// Host for contexts without a document.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPixelHost;

#[async_trait]
impl PixelHost for NoPixelHost {
	fn is_available(&self) -> bool {
		false
	}

	fn has_script(&self, _id: &str) -> bool {
		false
	}

	async fn load_script(&self, _id: &str, _src: &str) -> Result<(), PixelError> {
		Err(PixelError::Unavailable)
	}

	fn call(&self, _command: PixelCommand) -> Result<(), PixelError> {
		Err(PixelError::Unavailable)
	}

	fn session(&self) -> &PixelSession {
		static DETACHED: PixelSession = PixelSession::new();
		&DETACHED
	}
}

/// How a [`MemoryPixelHost`] answers script loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptBehavior {
	#[default]
	Load,
	/// Tag is inserted, then the load fails.
	FailAfterInsert,
	/// Tag cannot be inserted at all.
	FailBeforeInsert,
}

#[derive(Debug, Default)]
struct MemoryPixelState {
	scripts: BTreeSet<String>,
	insertions: usize,
	calls: Vec<PixelCommand>,
	behavior: ScriptBehavior,
	fail_calls: bool,
}

/// An in-process document that records scripts and pixel calls.
#[derive(Debug, Default)]
pub struct MemoryPixelHost {
	state: Mutex<MemoryPixelState>,
	session: PixelSession,
	load_delay: Duration,
}

impl MemoryPixelHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delays every script load, widening the window for concurrent callers.
	pub fn with_load_delay(mut self, delay: Duration) -> Self {
		self.load_delay = delay;
		self
	}

	pub fn with_behavior(self, behavior: ScriptBehavior) -> Self {
		self.state.lock().behavior = behavior;
		self
	}

	pub fn set_behavior(&self, behavior: ScriptBehavior) {
		self.state.lock().behavior = behavior;
	}

	/// Makes every pixel call fail.
	pub fn set_fail_calls(&self, fail: bool) {
		self.state.lock().fail_calls = fail;
	}

	/// Number of script tags ever inserted.
	pub fn script_insertions(&self) -> usize {
		self.state.lock().insertions
	}

	pub fn calls(&self) -> Vec<PixelCommand> {
		self.state.lock().calls.clone()
	}

	pub fn init_calls(&self) -> usize {
		self.calls()
			.iter()
			.filter(|c| matches!(c, PixelCommand::Init { .. }))
			.count()
	}

	pub fn track_calls(&self) -> Vec<PixelCommand> {
		self.calls()
			.into_iter()
			.filter(|c| matches!(c, PixelCommand::Track { .. }))
			.collect()
	}
}

#[async_trait]
impl PixelHost for MemoryPixelHost {
	fn is_available(&self) -> bool {
		true
	}

	fn has_script(&self, id: &str) -> bool {
		self.state.lock().scripts.contains(id)
	}

	async fn load_script(&self, id: &str, src: &str) -> Result<(), PixelError> {
		let behavior = {
			let mut state = self.state.lock();
			if state.behavior != ScriptBehavior::FailBeforeInsert {
				state.scripts.insert(id.to_string());
				state.insertions += 1;
			}
			state.behavior
		};

		if !self.load_delay.is_zero() {
			tokio::time::sleep(self.load_delay).await;
		}

		match behavior {
			ScriptBehavior::Load => Ok(()),
			ScriptBehavior::FailAfterInsert => Err(PixelError::ScriptLoad {
				src: src.to_string(),
				message: "script error".to_string(),
			}),
			ScriptBehavior::FailBeforeInsert => Err(PixelError::ScriptLoad {
				src: src.to_string(),
				message: "could not append script to the document".to_string(),
			}),
		}
	}

	fn call(&self, command: PixelCommand) -> Result<(), PixelError> {
		let mut state = self.state.lock();
		if state.fail_calls {
			return Err(PixelError::Call {
				method: command.method().to_string(),
				message: "pixel global is not a function".to_string(),
			});
		}
		state.calls.push(command);
		Ok(())
	}

	fn session(&self) -> &PixelSession {
		&self.session
	}
}

type SharedLoad = Shared<BoxFuture<'static, Result<(), PixelError>>>;

/// Where the script load stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
	NotRequested,
	Loading,
	Loaded,
	Failed,
}

struct LoaderState {
	in_flight: Option<(u64, SharedLoad)>,
	generation: u64,
	loaded: bool,
	failed: bool,
	initialized_pixel_id: Option<String>,
}

/// Script-load and `init` bookkeeping for one document.
///
/// Lives as long as the host that owns it; there is no reset.
pub struct PixelSession {
	state: Mutex<LoaderState>,
}

impl PixelSession {
	pub const fn new() -> Self {
		Self {
			state: parking_lot::const_mutex(LoaderState {
				in_flight: None,
				generation: 0,
				loaded: false,
				failed: false,
				initialized_pixel_id: None,
			}),
		}
	}

	pub fn state(&self) -> LoadState {
		let state = self.state.lock();
		if state.loaded {
			LoadState::Loaded
		} else if state.in_flight.is_some() {
			LoadState::Loading
		} else if state.failed {
			LoadState::Failed
		} else {
			LoadState::NotRequested
		}
	}

	/// Pixel id last passed to `init`.
	pub fn initialized_pixel_id(&self) -> Option<String> {
		self.state.lock().initialized_pixel_id.clone()
	}
}

impl Default for PixelSession {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for PixelSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PixelSession")
			.field("state", &self.state())
			.field("initialized_pixel_id", &self.initialized_pixel_id())
			.finish()
	}
}

/// Loads the pixel script and initializes pixel ids through a host's
/// [`PixelSession`].
pub struct PixelLoader {
	host: Arc<dyn PixelHost>,
}

impl PixelLoader {
	pub fn new(host: Arc<dyn PixelHost>) -> Self {
		Self { host }
	}

	pub fn host(&self) -> &Arc<dyn PixelHost> {
		&self.host
	}

	pub fn is_available(&self) -> bool {
		self.host.is_available()
	}

	pub fn is_ready(&self) -> bool {
		self.state() == LoadState::Loaded
	}

	pub fn state(&self) -> LoadState {
		self.host.session().state()
	}

	/// Initializes `pixel_id` if it is new, then waits for the script.
	pub async fn ensure(&self, pixel_id: &str) -> Result<(), PixelError> {
		if !self.host.is_available() {
			return Err(PixelError::Unavailable);
		}
		let session = self.host.session();

		let (generation, load) = {
			let mut state = session.state.lock();

			if state.initialized_pixel_id.as_deref() != Some(pixel_id) {
				self.host.call(PixelCommand::Init {
					pixel_id: pixel_id.to_string(),
				})?;
				debug!(pixel_id, "Pixel initialized");
				state.initialized_pixel_id = Some(pixel_id.to_string());
			}

			if state.loaded {
				return Ok(());
			}

			match &state.in_flight {
				Some((generation, load)) => (*generation, load.clone()),
				None if self.host.has_script(PIXEL_SCRIPT_ID) => {
					state.loaded = true;
					state.failed = false;
					return Ok(());
				}
				None => {
					state.generation += 1;
					state.failed = false;
					let host = Arc::clone(&self.host);
					let load = async move { host.load_script(PIXEL_SCRIPT_ID, PIXEL_SCRIPT_URL).await }
						.boxed()
						.shared();
					state.in_flight = Some((state.generation, load.clone()));
					(state.generation, load)
				}
			}
		};

		let result = load.await;

		let mut state = session.state.lock();
		if !matches!(&state.in_flight, Some((g, _)) if *g == generation) {
			return result;
		}
		state.in_flight = None;
		match &result {
			Ok(()) => state.loaded = true,
			Err(e) if self.host.has_script(PIXEL_SCRIPT_ID) => {
				warn!(error = %e, "Pixel script failed to load; later calls use the queued pixel");
				state.failed = true;
			}
			Err(e) => {
				warn!(error = %e, "Pixel script was never inserted; next call will retry");
			}
		}
		result
	}

	/// Sends one event through the pixel global.
	pub fn track(
		&self,
		method: BrowserMethod,
		event_name: &str,
		params: Value,
		event_id: EventId,
	) -> Result<(), PixelError> {
		self.host.call(PixelCommand::Track {
			method,
			event_name: event_name.to_string(),
			params,
			event_id,
		})
	}
}

impl std::fmt::Debug for PixelLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PixelLoader")
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}
