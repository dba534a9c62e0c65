//! Resonata CLI application
//!
//! Reads a WAV file, runs it through an effect chain (a built-in or user
//! preset, or a TOML chain file), and writes or plays the result.

use anyhow::{bail, Context};
use clap::Parser;
use resonata_core::domain::{
    builtin_preset, ChainConfig, ChannelMode, EffectConfig, PresetManager, BUILTIN_PRESETS,
};
use resonata_infra::audio::{self, IrLibrary};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "resonata")]
#[command(about = "An offline audio effects processor", long_about = None)]
struct Cli {
    /// Input WAV file
    input: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Preset name (built-in or from the preset directory)
    #[arg(short, long, conflicts_with = "chain")]
    preset: Option<String>,

    /// TOML chain configuration file
    #[arg(short, long)]
    chain: Option<PathBuf>,

    /// Channel selector applied to every stage (both, left, right)
    #[arg(long)]
    channel_mode: Option<ChannelMode>,

    /// Stereo pan position in [-1, 1], applied after the chain
    #[arg(long, allow_hyphen_values = true)]
    pan: Option<f32>,

    /// Seed for reverb impulse response synthesis
    #[arg(long)]
    seed: Option<u64>,

    /// Cabinet impulse response (name in the IR directory, or a WAV path)
    #[arg(long)]
    ir: Option<String>,

    /// Directory holding cabinet impulse response WAV files
    #[arg(long, default_value = "irs")]
    ir_dir: PathBuf,

    /// Directory holding user preset TOML files
    #[arg(long, default_value = "presets")]
    preset_dir: PathBuf,

    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Play the processed audio on the default output device
    #[arg(long)]
    play: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let presets = PresetManager::new(cli.preset_dir.clone());

    if cli.list_presets {
        println!("Built-in presets:");
        for name in BUILTIN_PRESETS {
            println!("  {name}");
        }
        match presets.list_presets().await {
            Ok(user) if !user.is_empty() => {
                println!("User presets ({}):", cli.preset_dir.display());
                for name in user {
                    println!("  {name}");
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not list user presets: {e}"),
        }
        return Ok(());
    }

    let Some(input_path) = cli.input else {
        bail!("no input file given (use --list-presets to inspect presets)");
    };

    let mut config = resolve_chain(&cli.preset, &cli.chain, &presets).await?;

    if let Some(mode) = cli.channel_mode {
        for stage in &mut config.stages {
            stage.channel_mode = mode;
        }
    }
    if let Some(pan) = cli.pan {
        config.pan = Some(pan);
    }
    if let Some(seed) = cli.seed {
        for stage in &mut config.stages {
            if let EffectConfig::Reverb(params) = &mut stage.effect {
                params.seed = Some(seed);
            }
        }
    }

    // A cabinet stage needs its impulse response loaded up front.
    let ir_name = cli.ir.as_deref().or_else(|| config.ir_file());
    let ir = match ir_name {
        Some(name) => {
            let library = IrLibrary::new(cli.ir_dir.clone());
            Some(
                library
                    .load(name)
                    .with_context(|| format!("failed to load impulse response '{name}'"))?,
            )
        }
        None => None,
    };

    let effect_chain = config.build(ir.as_ref())?;
    let panner = config.panner()?;

    let mut buffer = audio::read_wav(&input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;
    info!(
        path = %input_path.display(),
        frames = buffer.len(),
        channels = buffer.num_channels(),
        duration_secs = buffer.duration_secs(),
        "Loaded input"
    );

    if config.needs_stereo() && !buffer.is_stereo() {
        info!("Promoting mono input to stereo for a stereo-only stage");
        buffer = buffer.to_stereo();
    }

    let processed = resonata_core::domain::process_pipeline(&effect_chain, panner.as_ref(), buffer)
        .context("effect chain processing failed")?;

    if let Some(output_path) = &cli.output {
        audio::write_wav(output_path, &processed)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        info!(path = %output_path.display(), "Wrote output");
    }

    if cli.play {
        info!("Playing processed audio");
        let handle = audio::play(&processed)?;
        handle.wait();
    } else if cli.output.is_none() {
        warn!("No output file given and --play not set, result discarded");
    }

    Ok(())
}

async fn resolve_chain(
    preset: &Option<String>,
    chain: &Option<PathBuf>,
    presets: &PresetManager,
) -> anyhow::Result<ChainConfig> {
    match (preset, chain) {
        (_, Some(path)) => ChainConfig::load_from_file(path)
            .await
            .with_context(|| format!("failed to load chain file {}", path.display())),
        (Some(name), None) => presets
            .load_preset(name)
            .await
            .with_context(|| format!("failed to load preset '{name}'")),
        (None, None) => Ok(builtin_preset("slapback")?),
    }
}
