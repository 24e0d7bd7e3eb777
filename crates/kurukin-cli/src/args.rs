// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kurukin_analytics::config::{ENV_PIXEL_ID, ENV_TEST_EVENT_CODE, ENV_WEBHOOK_URL};

/// Page used when a command does not name one.
pub const DEFAULT_PAGE: &str = "https://kurukin.com/";

/// Kurukin attribution pipeline, driven from the command line.
#[derive(Parser, Debug)]
#[command(name = "kurukin", about = "Kurukin attribution and relay pipeline", version)]
pub struct Cli {
	/// Directory holding the visitor state file
	#[arg(long, env = "KURUKIN_DATA_DIR", global = true)]
	pub data_dir: Option<PathBuf>,

	/// Meta pixel id
	#[arg(long, env = ENV_PIXEL_ID, global = true)]
	pub pixel_id: Option<String>,

	/// Relay webhook receiving server-side events
	#[arg(long, env = ENV_WEBHOOK_URL, global = true)]
	pub webhook_url: Option<String>,

	/// Test event code copied into server payloads
	#[arg(long, env = ENV_TEST_EVENT_CODE, global = true)]
	pub test_event_code: Option<String>,

	/// User agent reported for the visitor
	#[arg(long, global = true)]
	pub user_agent: Option<String>,

	/// Emit logs as JSON
	#[arg(long, global = true)]
	pub json_logs: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Record the visitor's consent decision
	Consent(ConsentArgs),
	/// Land on a page, capturing its attribution
	Visit(VisitArgs),
	/// Track one event through both channels
	Track(TrackArgs),
	/// Replay a playback timeline through the video producer
	Video(VideoArgs),
	/// Print the stored visitor state
	State,
	/// Show version information
	Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConsentAction {
	Grant,
	Deny,
	Reset,
}

#[derive(Args, Debug)]
pub struct ConsentArgs {
	pub action: ConsentAction,

	#[arg(long)]
	pub gdpr_applies: Option<bool>,

	#[arg(long)]
	pub ccpa_opt_out: Option<bool>,
}

#[derive(Args, Debug)]
pub struct VisitArgs {
	pub url: String,

	#[arg(long)]
	pub referrer: Option<String>,
}

#[derive(Args, Debug)]
pub struct TrackArgs {
	/// Standard or custom event name
	pub event: String,

	/// Event parameters as a JSON object
	#[arg(long)]
	pub params: Option<String>,

	/// Page the event happens on
	#[arg(long, default_value = DEFAULT_PAGE)]
	pub url: String,

	/// Visitor email, hashed before sending
	#[arg(long)]
	pub email: Option<String>,

	/// Visitor phone, hashed before sending
	#[arg(long)]
	pub phone: Option<String>,
}

#[derive(Args, Debug)]
pub struct VideoArgs {
	pub video_id: String,

	pub title: String,

	/// Video length in seconds
	#[arg(long)]
	pub duration: f64,

	/// Playback positions in seconds, in order
	#[arg(long, value_delimiter = ',', num_args = 1..)]
	pub at: Vec<f64>,

	/// Finish with an `ended` callback
	#[arg(long)]
	pub ended: bool,

	#[arg(long, default_value = DEFAULT_PAGE)]
	pub url: String,
}

impl Cli {
	/// `--data-dir`, or the platform data directory.
	pub fn resolved_data_dir(&self) -> PathBuf {
		self.data_dir.clone().unwrap_or_else(|| {
			dirs::data_dir()
				.unwrap_or_else(|| PathBuf::from("."))
				.join("kurukin")
		})
	}
}
