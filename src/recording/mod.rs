//! Recording lifecycle management
//!
//! This module provides the `RecordingController` state machine that owns
//! the audio capture resource for one session:
//! - Idle/Recording transitions with idempotent guards
//! - chunk accumulation while recording
//! - finalization into a single WAV payload on stop, with the capture
//!   resource released on every exit path

mod controller;

pub use controller::{RecorderState, RecordingController};

pub use crate::audio::RecordingPayload;
