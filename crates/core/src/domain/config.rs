//! Effect chain configuration and presets
//!
//! This module provides:
//! - Serializable chain configuration (stages + optional pan) with TOML
//!   round-tripping
//! - A built-in preset table mirroring the classic effect registry
//! - A file-based preset manager for user presets

use crate::domain::audio::{ChannelMode, EffectError};
use crate::domain::dsp::{
    CabinetParams, ChainError, DelayParams, Effect, EffectChain, ImpulseResponse, Panner,
    PingPongParams, ReverbParams,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Configuration of one effect, as written in preset files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum EffectConfig {
    Delay(DelayParams),
    PingPong(PingPongParams),
    Reverb(ReverbParams),
    Cabinet(CabinetConfig),
}

impl EffectConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            EffectConfig::Delay(_) => "delay",
            EffectConfig::PingPong(_) => "ping_pong",
            EffectConfig::Reverb(_) => "reverb",
            EffectConfig::Cabinet(_) => "cabinet",
        }
    }

    /// Construct the validated runtime effect.
    ///
    /// Cabinet stages take the impulse response loaded by the collaborator;
    /// building one without it fails with `MissingImpulseResponse`.
    fn build(&self, ir: Option<&ImpulseResponse>) -> std::result::Result<Effect, EffectError> {
        match self {
            EffectConfig::Delay(p) => Effect::delay(*p),
            EffectConfig::PingPong(p) => Effect::ping_pong(*p),
            EffectConfig::Reverb(p) => Effect::reverb(*p),
            EffectConfig::Cabinet(c) => Effect::cabinet(CabinetParams {
                impulse_response: ir.cloned(),
                mix: c.mix,
            }),
        }
    }
}

/// Cabinet stage configuration
///
/// The impulse response itself is loaded from `ir_file` by the IR loader
/// collaborator before the chain is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinetConfig {
    #[serde(default)]
    pub ir_file: Option<String>,
    pub mix: f32,
}

/// One chain entry: an effect plus the channel selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(flatten)]
    pub effect: EffectConfig,
    #[serde(default)]
    pub channel_mode: ChannelMode,
}

/// A full processing chain: ordered stages plus an optional pan position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub pan: Option<f32>,
}

impl ChainConfig {
    /// A single-stage chain processing both channels
    pub fn single(effect: EffectConfig) -> Self {
        Self {
            stages: vec![StageConfig {
                effect,
                channel_mode: ChannelMode::Both,
            }],
            pan: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid(
                "chain configuration has no stages".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether any stage needs a stereo buffer (the audio source promotes
    /// mono input before such chains run)
    pub fn needs_stereo(&self) -> bool {
        self.pan.is_some()
            || self
                .stages
                .iter()
                .any(|s| matches!(s.effect, EffectConfig::PingPong(_)))
    }

    /// Name of the impulse response file a cabinet stage asks for, if any
    pub fn ir_file(&self) -> Option<&str> {
        self.stages.iter().find_map(|s| match &s.effect {
            EffectConfig::Cabinet(c) => c.ir_file.as_deref(),
            _ => None,
        })
    }

    /// Build the runtime chain from validated parameters.
    ///
    /// Construction-time failures (parameter ranges, a missing impulse
    /// response) surface with the 0-based index of the offending stage;
    /// stages after it are never built.
    pub fn build(&self, ir: Option<&ImpulseResponse>) -> Result<EffectChain> {
        self.validate()?;
        let mut chain = EffectChain::new();
        for (stage, cfg) in self.stages.iter().enumerate() {
            let effect = cfg.effect.build(ir).map_err(|source| ChainError {
                stage,
                effect: cfg.effect.kind().to_string(),
                source,
            })?;
            chain.push(effect, cfg.channel_mode);
        }
        debug!(stages = chain.len(), "built effect chain");
        Ok(chain)
    }

    /// The post-chain panner, when a pan position is configured
    pub fn panner(&self) -> Result<Option<Panner>> {
        self.pan
            .map(|pan| Panner::new(pan).map_err(|e| ConfigError::Invalid(e.to_string())))
            .transpose()
    }

    /// Load a chain configuration from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading chain configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Chain configuration loaded successfully");
        Ok(config)
    }

    /// Save the chain configuration to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving chain configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Chain configuration saved successfully");
        Ok(())
    }
}

// ============================================================================
// BUILT-IN PRESETS
// ============================================================================

/// Names of the built-in presets
pub const BUILTIN_PRESETS: &[&str] = &[
    "slapback",
    "long_delay",
    "ping_pong",
    "small_room",
    "concert_hall",
    "cathedral",
];

/// Look up a built-in preset by name
pub fn builtin_preset(name: &str) -> Result<ChainConfig> {
    let config = match name {
        "slapback" => ChainConfig::single(EffectConfig::Delay(DelayParams {
            delay_time: 0.1,
            feedback: 0.3,
            mix: 0.4,
        })),
        "long_delay" => ChainConfig::single(EffectConfig::Delay(DelayParams {
            delay_time: 1.5,
            feedback: 0.7,
            mix: 0.7,
        })),
        "ping_pong" => ChainConfig::single(EffectConfig::PingPong(PingPongParams {
            delay_time_left: 0.25,
            delay_time_right: 0.375,
            feedback: 0.5,
            mix: 0.5,
        })),
        "small_room" => ChainConfig::single(EffectConfig::Reverb(ReverbParams {
            t60: 0.3,
            num_reflections: 1500,
            decay_rate: 0.5,
            mix: 1.0,
            seed: None,
        })),
        "concert_hall" => ChainConfig::single(EffectConfig::Reverb(ReverbParams {
            t60: 0.8,
            num_reflections: 3000,
            decay_rate: 0.8,
            mix: 1.0,
            seed: None,
        })),
        "cathedral" => ChainConfig::single(EffectConfig::Reverb(ReverbParams {
            t60: 5.0,
            num_reflections: 5000,
            decay_rate: 1.0,
            mix: 1.0,
            seed: None,
        })),
        other => return Err(ConfigError::PresetNotFound(other.to_string())),
    };
    Ok(config)
}

// ============================================================================
// PRESET MANAGER
// ============================================================================

/// File-based manager for user presets
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    /// List all user presets (TOML files in the preset directory)
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a user preset by name, falling back to the built-in table
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<ChainConfig> {
        let path = self.preset_dir.join(format!("{name}.toml"));
        if path.exists() {
            return ChainConfig::load_from_file(&path).await;
        }
        builtin_preset(name)
    }

    /// Save a chain configuration as a named preset
    #[instrument(skip(self, config))]
    pub async fn save_preset(&self, name: &str, config: &ChainConfig) -> Result<()> {
        config.validate()?;
        let path = self.preset_dir.join(format!("{name}.toml"));
        config.save_to_file(&path).await
    }
}
