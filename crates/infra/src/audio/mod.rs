//! Audio file I/O and platform playback using CPAL
//!
//! CPAL abstracts the platform-specific audio APIs:
//! - Windows: WASAPI
//! - Linux: ALSA/PulseAudio
//! - macOS: CoreAudio

pub mod ir_loader;
pub mod playback;
pub mod wav;

pub use ir_loader::{load_ir_file, IrError, IrLibrary};
pub use playback::{play, PlaybackError, PlaybackHandle};
pub use wav::{read_wav, write_wav, WavError};
