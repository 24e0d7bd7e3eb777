// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use kurukin_analytics::{
	AnalyticsConfig, AnalyticsStore, EventSink, FileStorage, KeyValueStorage, NoPixelHost,
	PlaybackSnapshot, StaticPage, StorageCookieJar, StoreEnvironment, TrackOptions, Tracker,
	VideoAnalytics,
};
use kurukin_analytics_core::{
	ConsentStatus, ConsentUpdate, HashedUserData, MetaEvent, TrackResult,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::args::{Cli, ConsentAction, ConsentArgs, TrackArgs, VideoArgs, VisitArgs, DEFAULT_PAGE};

const STATE_FILE: &str = "visitor.json";

/// Everything a command needs: the visitor's store over its page, and the
/// tracker configuration.
pub struct Session {
	pub store: AnalyticsStore,
	pub page: Arc<StaticPage>,
	pub config: AnalyticsConfig,
}

impl Session {
	pub fn open(cli: &Cli, href: &str) -> anyhow::Result<Self> {
		let config = config_from(cli)?;
		let data_dir = cli.resolved_data_dir();
		let mut page = StaticPage::new(href).with_context(|| format!("invalid page URL '{href}'"))?;
		if let Some(user_agent) = &cli.user_agent {
			page = page.with_user_agent(user_agent.clone());
		}
		let page = Arc::new(page);
		let store = open_store(&data_dir, page.clone(), config.cookie_lifetime_days)?;
		Ok(Self { store, page, config })
	}

	pub fn tracker(&self) -> anyhow::Result<Tracker> {
		Ok(Tracker::builder()
			.store(self.store.clone())
			.config(self.config.clone())
			.pixel_host(Arc::new(NoPixelHost))
			.build()?)
	}
}

/// Environment configuration with command-line values layered on top.
pub fn config_from(cli: &Cli) -> anyhow::Result<AnalyticsConfig> {
	let mut config = AnalyticsConfig::from_env()?;
	if let Some(pixel_id) = &cli.pixel_id {
		config = config.with_pixel_id(pixel_id.clone());
	}
	if let Some(url) = &cli.webhook_url {
		config = config.with_webhook_url(url)?;
	}
	if let Some(code) = &cli.test_event_code {
		config = config.with_test_event_code(code.clone());
	}
	Ok(config)
}

pub fn open_store(
	data_dir: &Path,
	page: Arc<StaticPage>,
	cookie_lifetime_days: u32,
) -> anyhow::Result<AnalyticsStore> {
	let path = data_dir.join(STATE_FILE);
	let storage: Arc<dyn KeyValueStorage> = Arc::new(
		FileStorage::open(&path).with_context(|| format!("opening {}", path.display()))?,
	);
	debug!(path = %path.display(), "Opened visitor state");
	let env = StoreEnvironment::new(storage.clone(), Arc::new(StorageCookieJar::new(storage)), page)
		.with_cookie_lifetime_days(cookie_lifetime_days);
	Ok(AnalyticsStore::load(env))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

pub fn consent(cli: &Cli, args: &ConsentArgs) -> anyhow::Result<()> {
	let session = Session::open(cli, DEFAULT_PAGE)?;
	let status = match args.action {
		ConsentAction::Grant => ConsentStatus::Granted,
		ConsentAction::Deny => ConsentStatus::Denied,
		ConsentAction::Reset => ConsentStatus::Unknown,
	};
	let mut update = ConsentUpdate::status(status);
	if let Some(applies) = args.gdpr_applies {
		update = update.with_gdpr_applies(applies);
	}
	if let Some(opt_out) = args.ccpa_opt_out {
		update = update.with_ccpa_opt_out(opt_out);
	}

	let consent = session.store.set_consent(update);
	info!(status = %consent.status, tracking = consent.allows_tracking(), "Consent recorded");
	print_json(&consent)
}

pub fn visit(cli: &Cli, args: &VisitArgs) -> anyhow::Result<()> {
	let session = Session::open(cli, &args.url)?;
	session.page.set_referrer(args.referrer.clone());
	let snapshot = session.store.initialize();
	print_json(&snapshot)
}

pub fn state(cli: &Cli) -> anyhow::Result<()> {
	let session = Session::open(cli, DEFAULT_PAGE)?;
	print_json(&session.store.snapshot())
}

pub async fn track(cli: &Cli, args: &TrackArgs) -> anyhow::Result<()> {
	let session = Session::open(cli, &args.url)?;
	session.store.initialize();

	let params: serde_json::Value = match &args.params {
		Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object")?,
		None => serde_json::Value::Null,
	};
	let event = MetaEvent::from_json(&args.event, params)?;

	let mut user_data = HashedUserData::new();
	if let Some(email) = &args.email {
		user_data = user_data.email(email);
	}
	if let Some(phone) = &args.phone {
		user_data = user_data.phone(phone);
	}
	let options = TrackOptions::new().with_user_data(user_data.build());

	let result = session.tracker()?.track_with(event, options).await;
	print_json(&result)
}

/// Queues producer events so the command can await each dispatch.
struct QueueSink {
	tx: mpsc::UnboundedSender<MetaEvent>,
}

impl EventSink for QueueSink {
	fn emit(&self, event: MetaEvent) {
		let _ = self.tx.send(event);
	}
}

#[derive(Serialize)]
struct Dispatched {
	event_name: String,
	result: TrackResult,
}

pub async fn video(cli: &Cli, args: &VideoArgs) -> anyhow::Result<()> {
	let session = Session::open(cli, &args.url)?;
	session.store.initialize();
	let tracker = session.tracker()?;

	let (tx, mut rx) = mpsc::unbounded_channel();
	{
		let video = VideoAnalytics::new(Arc::new(QueueSink { tx }), &*args.video_id, &*args.title);
		let mut positions = args.at.iter().copied();
		if let Some(start) = positions.next() {
			video.on_play(PlaybackSnapshot::new(start, args.duration));
			video.on_time_update(PlaybackSnapshot::new(start, args.duration));
		}
		let mut last = args.at.first().copied().unwrap_or(0.0);
		for position in positions {
			video.on_time_update(PlaybackSnapshot::new(position, args.duration));
			last = position;
		}
		if args.ended {
			video.on_ended(PlaybackSnapshot::new(args.duration, args.duration));
		} else {
			video.on_pause(PlaybackSnapshot::new(last, args.duration));
		}
	}

	let mut dispatched = Vec::new();
	while let Some(event) = rx.recv().await {
		let event_name = event.name().to_string();
		let result = tracker.track(event).await;
		dispatched.push(Dispatched { event_name, result });
	}
	print_json(&dispatched)
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use tempfile::tempdir;

	fn cli(dir: &Path, rest: &[&str]) -> Cli {
		let mut argv = vec!["kurukin", "--data-dir", dir.to_str().unwrap()];
		argv.extend_from_slice(rest);
		Cli::try_parse_from(argv).unwrap()
	}

	#[test]
	fn consent_persists_between_sessions() {
		let dir = tempdir().unwrap();
		let cli = cli(dir.path(), &["state"]);

		let session = Session::open(&cli, DEFAULT_PAGE).unwrap();
		session.store.set_consent(ConsentUpdate::granted());
		drop(session);

		let session = Session::open(&cli, DEFAULT_PAGE).unwrap();
		assert!(session.store.has_consent_for_tracking());
		assert!(dir.path().join(STATE_FILE).exists());
	}

	#[test]
	fn visit_keeps_first_touch_campaign() {
		let dir = tempdir().unwrap();
		let cli = cli(dir.path(), &["state"]);

		Session::open(&cli, "https://kurukin.com/?utm_source=ig&utm_campaign=launch")
			.unwrap()
			.store
			.initialize();
		let snapshot = Session::open(&cli, "https://kurukin.com/precios?utm_source=fb")
			.unwrap()
			.store
			.initialize();

		assert_eq!(snapshot.attribution.utm_source.as_deref(), Some("fb"));
		assert_eq!(snapshot.attribution.utm_campaign.as_deref(), Some("launch"));
	}

	#[tokio::test]
	async fn tracking_without_webhook_reports_missing_url() {
		let dir = tempdir().unwrap();
		let cli = cli(dir.path(), &["state"]);
		let session = Session::open(&cli, DEFAULT_PAGE).unwrap();
		session.store.set_consent(ConsentUpdate::granted());

		let mut session = session;
		session.config.webhook_url = None;
		let result = session.tracker().unwrap().track(MetaEvent::page_view()).await;
		assert!(!result.browser_sent);
		assert_eq!(result.reason.as_deref(), Some("missing_webhook_url"));
	}
}
