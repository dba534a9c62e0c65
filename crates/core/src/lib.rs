//! Resonata core: offline audio effect engine
//!
//! This crate contains the effect engine itself: the audio buffer model,
//! the four effects (delay, ping-pong delay, reverb, cabinet), chain
//! composition, equal-power panning and the preset/configuration layer.
//! File I/O and playback live in `resonata-infra`.

pub mod domain;
