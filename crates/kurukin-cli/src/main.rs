// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `kurukin` command-line host for the attribution pipeline.
//!
//! State lives in one JSON file under the data directory, so consecutive
//! invocations behave like page views by the same visitor.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod commands;

use args::{Cli, Command};

fn init_tracing(json: bool) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,kurukin_analytics=info"));

	let registry = tracing_subscriber::registry().with(filter);
	if json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	if let Command::Version = cli.command {
		println!("kurukin {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	init_tracing(cli.json_logs);

	match &cli.command {
		Command::Consent(args) => commands::consent(&cli, args),
		Command::Visit(args) => commands::visit(&cli, args),
		Command::Track(args) => commands::track(&cli, args).await,
		Command::Video(args) => commands::video(&cli, args).await,
		Command::State => commands::state(&cli),
		Command::Version => Ok(()),
	}
}
