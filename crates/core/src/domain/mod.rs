//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod dsp;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioBuffer, ChannelMode, Channels, EffectError};
pub use config::{
    builtin_preset, CabinetConfig, ChainConfig, ConfigError, EffectConfig, PresetManager,
    StageConfig, BUILTIN_PRESETS,
};
pub use dsp::{
    process_pipeline, CabinetParams, ChainError, DelayParams, Effect, EffectChain,
    ImpulseResponse, ImpulseResponseSynthesizer, Panner, PingPongParams, ReverbParams,
};
