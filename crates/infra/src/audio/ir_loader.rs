//! Impulse response library
//!
//! Loads cabinet impulse responses from WAV files in a directory. Stereo
//! files are collapsed to mono by averaging; the result is peak-normalized
//! by `ImpulseResponse::new`.

use crate::audio::wav::{self, WavError};
use resonata_core::domain::{Channels, ImpulseResponse};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, IrError>;

/// Errors that can occur when loading impulse responses
#[derive(Debug, Error)]
pub enum IrError {
    #[error("impulse response not found: {0}")]
    NotFound(String),

    #[error("failed to list impulse responses: {0}")]
    ListFailed(#[from] std::io::Error),

    #[error(transparent)]
    Wav(#[from] WavError),
}

/// A directory of impulse response WAV files
pub struct IrLibrary {
    dir: PathBuf,
}

impl IrLibrary {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// List the names of available impulse responses (file stems)
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "wav").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        debug!(count = names.len(), "Listed impulse responses");
        Ok(names)
    }

    /// Load an impulse response by name or by path.
    ///
    /// A name with no extension resolves to `{name}.wav` in the library
    /// directory; anything containing a path separator or extension is
    /// treated as a file path.
    pub fn load(&self, name: &str) -> Result<ImpulseResponse> {
        let candidate = Path::new(name);
        let path = if candidate.extension().is_some() || candidate.components().count() > 1 {
            candidate.to_path_buf()
        } else {
            self.dir.join(format!("{name}.wav"))
        };

        if !path.exists() {
            return Err(IrError::NotFound(name.to_string()));
        }

        load_ir_file(&path)
    }
}

/// Load an impulse response directly from a WAV file
pub fn load_ir_file<P: AsRef<Path>>(path: P) -> Result<ImpulseResponse> {
    let path = path.as_ref();
    let buffer = wav::read_wav(path)?;
    let sample_rate = buffer.sample_rate();

    let samples = match buffer.channels() {
        Channels::Mono(samples) => samples.clone(),
        Channels::Stereo { left, right } => left
            .iter()
            .zip(right.iter())
            .map(|(l, r)| (l + r) * 0.5)
            .collect(),
    };

    info!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "Loaded impulse response"
    );
    Ok(ImpulseResponse::new(samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonata_core::domain::AudioBuffer;
    use tempfile::TempDir;

    fn write_test_ir(dir: &Path, name: &str, samples: Vec<f32>) {
        let buffer = AudioBuffer::mono(samples, 44100);
        wav::write_wav(dir.join(name), &buffer).unwrap();
    }

    #[test]
    fn test_list_and_load() {
        let dir = TempDir::new().unwrap();
        write_test_ir(dir.path(), "cab_a.wav", vec![1.0, 0.5, 0.25]);
        write_test_ir(dir.path(), "cab_b.wav", vec![0.5, 0.0]);
        std::fs::write(dir.path().join("notes.txt"), "not audio").unwrap();

        let library = IrLibrary::new(dir.path().to_path_buf());
        assert_eq!(library.list().unwrap(), vec!["cab_a", "cab_b"]);

        let ir = library.load("cab_a").unwrap();
        assert_eq!(ir.samples().len(), 3);
        assert_eq!(ir.sample_rate(), 44100);
        // normalized on load
        assert!((ir.samples()[0].abs() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_load_by_path() {
        let dir = TempDir::new().unwrap();
        write_test_ir(dir.path(), "cab.wav", vec![1.0, 0.25]);

        let library = IrLibrary::new(PathBuf::from("/unused"));
        let path = dir.path().join("cab.wav");
        let ir = library.load(path.to_str().unwrap()).unwrap();
        assert_eq!(ir.samples().len(), 2);
    }

    #[test]
    fn test_stereo_ir_collapsed_to_mono() {
        let dir = TempDir::new().unwrap();
        let buffer =
            AudioBuffer::stereo(vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], 44100).unwrap();
        wav::write_wav(dir.path().join("wide.wav"), &buffer).unwrap();

        let library = IrLibrary::new(dir.path().to_path_buf());
        let ir = library.load("wide").unwrap();
        assert_eq!(ir.samples().len(), 3);
        // both channels contribute equally, then peak-normalized
        assert!((ir.samples()[0] - ir.samples()[1]).abs() < 1e-3);
    }

    #[test]
    fn test_missing_ir() {
        let dir = TempDir::new().unwrap();
        let library = IrLibrary::new(dir.path().to_path_buf());
        let err = library.load("ghost").unwrap_err();
        assert!(matches!(err, IrError::NotFound(_)));
    }
}
