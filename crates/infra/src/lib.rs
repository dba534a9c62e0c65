//! Infrastructure layer: WAV file I/O, impulse response loading, and
//! playback through the system audio device.

pub mod audio;
