// metronome - command line front end for the metronome engine

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use metronome_engine::audio::device::AudioDeviceManager;
use metronome_engine::sequencer::{Subdivision, TimeSignature};
use metronome_engine::{
    BeatCallbacks, ClickTrackExporter, EngineConfig, ExportSettings, HostProfile, Metronome,
    SoundProfile, TransportConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metronome")]
#[command(about = "Sample-accurate metronome")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a click track on the default output
    Play {
        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        engine: EngineArgs,

        /// Stop after this many seconds (default: until Enter is pressed)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Render a click track to a WAV file
    Render {
        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        engine: EngineArgs,

        /// Output WAV file
        #[arg(short, long, default_value = "click.wav")]
        out: PathBuf,

        /// Length of the rendered track
        #[arg(short, long, default_value_t = 8.0)]
        seconds: f64,

        /// Output sample rate
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
    },

    /// List audio output devices
    Devices,

    /// Play one click and print timing diagnostics as JSON
    TestClick {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Click settings, each overriding the config file
#[derive(Args)]
struct TransportArgs {
    /// Tempo in beats per minute (30-300)
    #[arg(short, long)]
    bpm: Option<f64>,

    /// Beats per measure
    #[arg(long)]
    beats: Option<u32>,

    /// Meter such as 3/4 or 6/8; clicks on the numerator, overrides --beats
    #[arg(long, value_parser = parse_meter)]
    meter: Option<TimeSignature>,

    /// Clicks per beat: a number or eighth, triplet, sixteenth
    #[arg(long, value_parser = parse_subdivisions)]
    subdivisions: Option<u32>,

    /// Sound profile: classic, wood, electronic, sine
    #[arg(long)]
    sound: Option<SoundProfile>,

    /// Do not accent the first beat of each measure
    #[arg(long)]
    no_accent: bool,

    /// Main beat volume (0-1)
    #[arg(long)]
    volume: Option<f32>,

    /// Subdivision volume (0-1)
    #[arg(long)]
    sub_volume: Option<f32>,
}

impl TransportArgs {
    fn apply(&self, base: TransportConfig) -> TransportConfig {
        let mut config = base;
        if let Some(bpm) = self.bpm {
            config.tempo_bpm = bpm;
        }
        if let Some(beats) = self.beats {
            config.beats_per_measure = beats;
        }
        if let Some(meter) = self.meter {
            config.beats_per_measure = meter.beats_per_measure();
        }
        if let Some(subdivisions) = self.subdivisions {
            config.subdivision_count = subdivisions;
        }
        if let Some(sound) = self.sound {
            config.sound_profile = sound;
        }
        if self.no_accent {
            config.accent_first_beat = false;
        }
        if let Some(volume) = self.volume {
            config.main_volume = volume;
        }
        if let Some(volume) = self.sub_volume {
            config.subdivision_volume = volume;
        }
        config.clamped()
    }
}

fn parse_meter(text: &str) -> Result<TimeSignature, String> {
    TimeSignature::parse(text).ok_or_else(|| format!("invalid meter '{}', expected e.g. 6/8", text))
}

fn parse_subdivisions(text: &str) -> Result<u32, String> {
    match text.parse::<u32>() {
        Ok(count) => Ok(count),
        Err(_) => text.parse::<Subdivision>().map(|sub| sub.count()),
    }
}

#[derive(Args)]
struct EngineArgs {
    /// Engine configuration file (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host profile: desktop, mobile, constrained
    #[arg(long)]
    host: Option<HostProfile>,
}

impl EngineArgs {
    fn load(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            transport,
            engine,
            duration,
        } => play(&transport, &engine, duration),
        Commands::Render {
            transport,
            engine,
            out,
            seconds,
            sample_rate,
        } => render(&transport, &engine, out, seconds, sample_rate),
        Commands::Devices => devices(),
        Commands::TestClick { engine } => test_click(&engine),
    }
}

fn play(transport: &TransportArgs, engine: &EngineArgs, duration: Option<f64>) -> Result<()> {
    let config = engine.load()?;
    let settings = transport.apply(config.transport);
    let beats = settings.beats_per_measure;

    let subdivision = Subdivision::from_count(settings.subdivision_count)
        .map(|sub| sub.label().to_string())
        .unwrap_or_else(|| format!("{} per beat", settings.subdivision_count));
    println!(
        "{}, {} beats per measure, {}, {} sound",
        settings.tempo(),
        beats,
        subdivision,
        settings.sound_profile
    );

    let mut metronome = Metronome::new(config);

    // Runs ahead of the audible click by up to the schedule-ahead window
    let callbacks = BeatCallbacks::none().on_subdivision(move |beat, sub| {
        let mut out = io::stdout().lock();
        if sub == 0 {
            let _ = write!(out, "\r{:>2}/{} ", beat + 1, beats);
        } else {
            let _ = write!(out, ".");
        }
        let _ = out.flush();
    });

    if !metronome.start(settings, callbacks) {
        bail!("Could not start audio output");
    }

    match duration {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
            thread::sleep(Duration::from_secs_f64(seconds));
        }
        _ => {
            println!("Press Enter to stop");
            let mut line = String::new();
            io::stdin()
                .read_line(&mut line)
                .context("Failed to read from stdin")?;
        }
    }

    metronome.destroy();
    println!();
    Ok(())
}

fn render(
    transport: &TransportArgs,
    engine: &EngineArgs,
    out: PathBuf,
    seconds: f64,
    sample_rate: u32,
) -> Result<()> {
    let config = engine.load()?;
    let settings = transport.apply(config.transport);

    let exporter = ClickTrackExporter::new(
        ExportSettings {
            sample_rate,
            ..Default::default()
        },
        config,
    );
    let summary = exporter
        .export(settings, seconds, &out)
        .with_context(|| format!("Failed to render {}", out.display()))?;

    println!(
        "Wrote {} ({} frames, {} clicks, peak {:.2})",
        out.display(),
        summary.frames,
        summary.clicks,
        summary.peak
    );
    Ok(())
}

fn devices() -> Result<()> {
    let manager = AudioDeviceManager::new();
    let devices = manager.list_output_devices();

    println!("Host: {}", manager.host_name());
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

fn test_click(engine: &EngineArgs) -> Result<()> {
    let mut metronome = Metronome::new(engine.load()?);

    if !metronome.test_click() {
        bail!("Audio output unavailable");
    }
    // Let the click ring out before tearing the stream down
    thread::sleep(Duration::from_millis(300));

    let info = metronome
        .timing_info()
        .context("No render context after test click")?;
    println!("{}", serde_json::to_string_pretty(&info)?);

    metronome.destroy();
    Ok(())
}
