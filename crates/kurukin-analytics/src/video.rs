// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Video engagement events.
//!
//! [`VideoAnalytics`] turns player callbacks into `VideoPlay`, `VideoPause`
//! and `VideoProgress` custom events. Each progress milestone fires at most
//! once per playback session; a session restarts when the video changes or
//! playback returns to the first second.

use std::collections::BTreeSet;
use std::sync::Arc;

use kurukin_analytics_core::{CustomParams, MetaEvent};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Progress milestones, in percent.
pub const PROGRESS_MILESTONES: [u8; 4] = [25, 50, 75, 100];

pub const VIDEO_PLAY: &str = "VideoPlay";
pub const VIDEO_PAUSE: &str = "VideoPause";
pub const VIDEO_PROGRESS: &str = "VideoProgress";

/// Playback positions at or below this many seconds count as a restart.
const RESTART_THRESHOLD_SECS: f64 = 1.0;

/// Receives events without waiting on their delivery.
pub trait EventSink: Send + Sync {
	fn emit(&self, event: MetaEvent);
}

/// Non-finite player readings become zero.
pub fn safe_number(value: f64) -> f64 {
	if value.is_finite() {
		value
	} else {
		0.0
	}
}

/// Percent watched, clamped to `0..=100` and rounded to two decimals.
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
	let current_time = safe_number(current_time);
	let duration = safe_number(duration);
	if duration <= 0.0 {
		return 0.0;
	}
	let percent = (current_time / duration * 100.0).clamp(0.0, 100.0);
	(percent * 100.0).round() / 100.0
}

/// Player position at the time of a callback.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSnapshot {
	pub current_time: f64,
	pub duration: f64,
}

impl PlaybackSnapshot {
	pub fn new(current_time: f64, duration: f64) -> Self {
		Self {
			current_time: safe_number(current_time),
			duration: safe_number(duration),
		}
	}

	pub fn progress_percent(&self) -> f64 {
		progress_percent(self.current_time, self.duration)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
	Play,
	Pause,
	TimeUpdate,
	Ended,
}

#[derive(Debug)]
struct SessionState {
	video_id: String,
	title: String,
	fired: BTreeSet<u8>,
	last_time: f64,
	attached: bool,
}

/// Milestone tracking for one mounted video.
pub struct VideoAnalytics {
	sink: Arc<dyn EventSink>,
	state: Mutex<SessionState>,
}

impl VideoAnalytics {
	pub fn new(sink: Arc<dyn EventSink>, video_id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			sink,
			state: Mutex::new(SessionState {
				video_id: video_id.into(),
				title: title.into(),
				fired: BTreeSet::new(),
				last_time: 0.0,
				attached: true,
			}),
		}
	}

	/// Switches to another video. Milestones reset when the id or title
	/// changes.
	pub fn set_video(&self, video_id: impl Into<String>, title: impl Into<String>) {
		let video_id = video_id.into();
		let title = title.into();
		let mut state = self.state.lock();
		if state.video_id != video_id || state.title != title {
			debug!(video_id = %video_id, "Video changed; milestones reset");
			state.video_id = video_id;
			state.title = title;
			state.fired.clear();
			state.last_time = 0.0;
		}
	}

	pub fn handle(&self, event: PlayerEvent, snapshot: PlaybackSnapshot) {
		match event {
			PlayerEvent::Play => self.on_play(snapshot),
			PlayerEvent::Pause => self.on_pause(snapshot),
			PlayerEvent::TimeUpdate => self.on_time_update(snapshot),
			PlayerEvent::Ended => self.on_ended(snapshot),
		}
	}

	pub fn on_play(&self, snapshot: PlaybackSnapshot) {
		let params = {
			let mut state = self.state.lock();
			if !state.attached {
				return;
			}
			if snapshot.current_time <= RESTART_THRESHOLD_SECS {
				state.fired.clear();
			}
			state.last_time = snapshot.current_time;
			base_params(&state, snapshot)
		};
		self.emit(VIDEO_PLAY, params);
	}

	pub fn on_pause(&self, snapshot: PlaybackSnapshot) {
		let params = {
			let mut state = self.state.lock();
			if !state.attached {
				return;
			}
			state.last_time = snapshot.current_time;
			base_params(&state, snapshot)
		};
		self.emit(VIDEO_PAUSE, params);
	}

	/// Fires every milestone newly crossed at this position.
	pub fn on_time_update(&self, snapshot: PlaybackSnapshot) {
		let pending = {
			let mut state = self.state.lock();
			if !state.attached {
				return;
			}
			// Looping players rewind without a play callback.
			if snapshot.current_time <= RESTART_THRESHOLD_SECS
				&& state.last_time > RESTART_THRESHOLD_SECS
			{
				state.fired.clear();
			}
			state.last_time = snapshot.current_time;

			let progress = snapshot.progress_percent();
			let mut pending = Vec::new();
			for milestone in PROGRESS_MILESTONES {
				if progress >= f64::from(milestone) && state.fired.insert(milestone) {
					pending.push(base_params(&state, snapshot).insert("milestone_percent", milestone));
				}
			}
			pending
		};

		for params in pending {
			self.emit(VIDEO_PROGRESS, params);
		}
	}

	/// Forces the 100% milestone if playback ended before it was reached. The
	/// event reports completion even when the player stops short of the end.
	pub fn on_ended(&self, snapshot: PlaybackSnapshot) {
		let params = {
			let mut state = self.state.lock();
			if !state.attached {
				return;
			}
			state.last_time = snapshot.current_time;
			if !state.fired.insert(100) {
				return;
			}
			base_params(&state, snapshot)
				.insert("progress_percent", 100.0)
				.insert("milestone_percent", 100u8)
		};
		self.emit(VIDEO_PROGRESS, params);
	}

	/// Stops emitting. Events already handed to the sink still complete.
	pub fn detach(&self) {
		self.state.lock().attached = false;
	}

	pub fn is_attached(&self) -> bool {
		self.state.lock().attached
	}

	pub fn fired_milestones(&self) -> Vec<u8> {
		self.state.lock().fired.iter().copied().collect()
	}

	fn emit(&self, name: &str, params: CustomParams) {
		match MetaEvent::custom(name, params) {
			Ok(event) => self.sink.emit(event),
			Err(e) => warn!(event_name = name, error = %e, "Dropping video event"),
		}
	}
}

fn base_params(state: &SessionState, snapshot: PlaybackSnapshot) -> CustomParams {
	CustomParams::new()
		.insert("video_id", state.video_id.as_str())
		.insert("title", state.title.as_str())
		.insert("current_time_seconds", snapshot.current_time)
		.insert("duration_seconds", snapshot.duration)
		.insert("progress_percent", snapshot.progress_percent())
}

impl std::fmt::Debug for VideoAnalytics {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VideoAnalytics")
			.field("state", &*self.state.lock())
			.finish_non_exhaustive()
	}
}
