// Click track export - offline rendering to WAV
//
// Runs the real engine (scheduler, synthesizer, renderer) against an offline
// context and fires the timer by hand once per lookahead period of rendered
// audio, as fast as the CPU allows. The result is what the live output would
// have played.

use super::offline::{OfflineContext, OfflineProvider};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::sequencer::metronome::Metronome;
use crate::sequencer::observer::BeatCallbacks;
use crate::sequencer::timer::ManualTimer;
use crate::sequencer::transport::TransportConfig;
use hound::{WavSpec, WavWriter};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Audio export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Bit depth (16 or 24 integer, 32 float)
    pub bit_depth: u16,
    /// Number of channels, the mono click is copied to each
    pub channels: u16,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: 16,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub clicks: usize,
    pub peak: f32,
}

/// Rendered mono audio plus what went into it
pub struct ClickTrack {
    pub samples: Vec<f32>,
    pub clicks: usize,
}

pub struct ClickTrackExporter {
    settings: ExportSettings,
    engine: EngineConfig,
}

impl ClickTrackExporter {
    pub fn new(settings: ExportSettings, engine: EngineConfig) -> Self {
        Self { settings, engine }
    }

    /// Render `seconds` of the click track in memory
    pub fn render(&self, transport: TransportConfig, seconds: f64) -> EngineResult<ClickTrack> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(EngineError::InvalidDuration(seconds));
        }

        let sample_rate = self.settings.sample_rate.max(1);
        let context = OfflineContext::new(sample_rate as f32).recording();
        let timer = ManualTimer::new();

        let mut metronome = Metronome::with_parts(
            self.engine.clone(),
            Box::new(OfflineProvider::new(context.clone())),
            Box::new(timer.clone()),
            Box::new(ManualTimer::new()),
        );

        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        let callbacks = BeatCallbacks::none().on_subdivision(move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        if !metronome.start(transport, callbacks) {
            return Err(EngineError::Activation(
                "offline render context unavailable".to_string(),
            ));
        }

        let total_frames = (seconds * sample_rate as f64).round() as u64;
        let step = ((self.engine.tuning().lookahead.as_secs_f64() * sample_rate as f64) as u64).max(1);

        while context.current_frame() < total_frames {
            timer.fire();
            let remaining = total_frames - context.current_frame();
            context.advance_frames(step.min(remaining));
        }

        metronome.destroy();

        let samples = context.take_output();
        log::debug!(
            "Rendered {} frames with {} clicks",
            samples.len(),
            clicks.load(Ordering::Relaxed)
        );

        Ok(ClickTrack {
            samples,
            clicks: clicks.load(Ordering::Relaxed),
        })
    }

    /// Render and write a WAV file
    pub fn export(
        &self,
        transport: TransportConfig,
        seconds: f64,
        path: impl AsRef<Path>,
    ) -> EngineResult<RenderSummary> {
        let track = self.render(transport, seconds)?;
        self.write_wav(&track.samples, path.as_ref())?;

        let peak = track.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        log::info!(
            "Exported {:.2}s click track to {} (peak {:.2})",
            seconds,
            path.as_ref().display(),
            peak
        );

        Ok(RenderSummary {
            frames: track.samples.len() as u64,
            clicks: track.clicks,
            peak,
        })
    }

    fn write_wav(&self, samples: &[f32], path: &Path) -> EngineResult<()> {
        let channels = self.settings.channels.max(1);
        let float = self.settings.bit_depth == 32;
        let spec = WavSpec {
            channels,
            sample_rate: self.settings.sample_rate.max(1),
            bits_per_sample: self.settings.bit_depth,
            sample_format: if float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let mut writer = WavWriter::create(path, spec)?;
        let scale = match self.settings.bit_depth {
            24 => 8_388_607.0,
            _ => i16::MAX as f32,
        };

        for &sample in samples {
            let sample = sample.clamp(-1.0, 1.0);
            for _ in 0..channels {
                if float {
                    writer.write_sample(sample)?;
                } else {
                    writer.write_sample((sample * scale) as i32)?;
                }
            }
        }

        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_settings_default() {
        let settings = ExportSettings::default();
        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.bit_depth, 16);
        assert_eq!(settings.channels, 1);
    }

    #[test]
    fn test_render_places_clicks_on_the_beat() {
        let exporter = ClickTrackExporter::new(ExportSettings::default(), EngineConfig::default());
        let track = exporter
            .render(TransportConfig::default(), 1.9)
            .unwrap();

        assert_eq!(track.samples.len(), 83790);
        // 120 bpm from 5 ms: 0.005, 0.505, 1.005, 1.505
        assert_eq!(track.clicks, 4);

        let onset = (0.505 * 44100.0f64).round() as usize;
        assert!(track.samples[onset - 200..onset].iter().all(|s| s.abs() < 1e-3));
        assert!(track.samples[onset..onset + 400].iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn test_export_writes_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("click.wav");

        let settings = ExportSettings {
            channels: 2,
            ..Default::default()
        };
        let exporter = ClickTrackExporter::new(settings, EngineConfig::default());
        let summary = exporter
            .export(TransportConfig::default(), 1.0, &path)
            .unwrap();

        assert_eq!(summary.frames, 44100);
        assert!(summary.peak > 0.1);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 88200);
    }

    #[test]
    fn test_rejects_empty_duration() {
        let exporter = ClickTrackExporter::new(ExportSettings::default(), EngineConfig::default());
        assert!(matches!(
            exporter.render(TransportConfig::default(), 0.0),
            Err(EngineError::InvalidDuration(_))
        ));
    }
}
