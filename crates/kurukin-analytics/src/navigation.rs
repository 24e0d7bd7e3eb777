// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Same-document navigation tracking.
//!
//! The host notifies the observer after the page location changes (history
//! push/replace, back/forward, fragment change) and the observer re-captures
//! attribution for the new location.

use kurukin_analytics_core::AttributionData;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{AnalyticsError, Result};
use crate::store::AnalyticsStore;

/// A same-document navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
	PushState,
	ReplaceState,
	PopState,
	HashChange,
}

impl NavigationEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			NavigationEvent::PushState => "push_state",
			NavigationEvent::ReplaceState => "replace_state",
			NavigationEvent::PopState => "pop_state",
			NavigationEvent::HashChange => "hash_change",
		}
	}
}

#[derive(Debug)]
enum NavigationCommand {
	Navigate(NavigationEvent),
	Shutdown,
}

/// Re-captures attribution into a store on every navigation.
#[derive(Debug, Clone)]
pub struct NavigationObserver {
	store: AnalyticsStore,
}

impl NavigationObserver {
	pub fn new(store: AnalyticsStore) -> Self {
		Self { store }
	}

	/// Handles one navigation synchronously.
	pub fn handle(&self, event: NavigationEvent) -> AttributionData {
		debug!(navigation = event.as_str(), "Re-capturing attribution");
		self.store.capture_attribution_from_url(None)
	}

	/// Moves the observer onto a background task. Notifications are handled in
	/// the order they are sent.
	pub fn spawn(self) -> NavigationHandle {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let task = tokio::spawn(async move {
			while let Some(command) = rx.recv().await {
				match command {
					NavigationCommand::Navigate(event) => {
						self.handle(event);
					}
					NavigationCommand::Shutdown => break,
				}
			}
			info!("Navigation observer stopped");
		});
		NavigationHandle { tx, task }
	}
}

/// Sends navigations to a spawned [`NavigationObserver`].
#[derive(Debug)]
pub struct NavigationHandle {
	tx: mpsc::UnboundedSender<NavigationCommand>,
	task: JoinHandle<()>,
}

impl NavigationHandle {
	pub fn notify(&self, event: NavigationEvent) -> Result<()> {
		self.tx
			.send(NavigationCommand::Navigate(event))
			.map_err(|_| AnalyticsError::ObserverShutdown)
	}

	pub fn is_running(&self) -> bool {
		!self.task.is_finished()
	}

	/// Stops observing after already-queued navigations are handled.
	pub async fn shutdown(self) {
		let _ = self.tx.send(NavigationCommand::Shutdown);
		let _ = self.task.await;
	}
}

/// Initializes the store, captures the current location, and starts
/// observing navigations.
pub async fn bootstrap(store: &AnalyticsStore) -> NavigationHandle {
	store.initialize();
	store.capture_attribution_from_url(None);
	NavigationObserver::new(store.clone()).spawn()
}
