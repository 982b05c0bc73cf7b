// Real-time output - CPAL stream rendering scheduled clicks
//
// # Format Support
//
// Clicks are mixed in f32 mono and converted to the device's native sample
// format while being written to every channel of the interleaved buffer:
// - **F32**: native, no conversion
// - **I16**: common on Windows/WASAPI
// - **U16**: less common
//
// # Clock
//
// The audio clock is the number of frames this callback has produced. Click
// start times are converted to frame indices by the renderer, so placement
// is sample accurate no matter when the scheduler thread ran.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send, so CpalContext stays on the
// controlling thread and only the CpalRenderTarget crosses to the scheduler.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::context::{AudioContext, ContextProvider, ContextState, RenderTarget};
use super::device::AudioDeviceManager;
use super::parameters::AtomicF64;
use super::timing::AudioTiming;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::messaging::channels::{RenderConsumer, RenderProducer, create_render_channel};
use crate::messaging::command::RenderCommand;
use crate::synth::renderer::ClickRenderer;
use crate::synth::voice::ClickSpec;

/// Mono scratch size; larger device buffers are rendered in several passes
const SCRATCH_FRAMES: usize = 4096;

/// Opens the CPAL output on first use
pub struct CpalProvider {
    device_name: Option<String>,
    queue_capacity: usize,
}

impl CpalProvider {
    pub fn new(device_name: Option<String>, queue_capacity: usize) -> Self {
        Self {
            device_name,
            queue_capacity,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.output_device.clone(), config.render_queue_capacity)
    }
}

impl ContextProvider for CpalProvider {
    fn create(&mut self) -> EngineResult<Box<dyn AudioContext>> {
        let context = CpalContext::open(self.device_name.as_deref(), self.queue_capacity)?;
        Ok(Box::new(context))
    }
}

/// State owned by the audio callback
struct CallbackState {
    consumer: RenderConsumer,
    renderer: ClickRenderer,
    scratch: Vec<f32>,
    clock: AudioTiming,
    latency: AtomicF64,
    /// Clicks the voice pool had no slot for
    dropped: Arc<AtomicU64>,
    channels: usize,
}

impl CallbackState {
    // ========== SACRED ZONE ==========
    // No allocations, No I/O, No blocking locks
    fn process<T>(&mut self, data: &mut [T], info: &cpal::OutputCallbackInfo)
    where
        T: SizedSample + FromSample<f32>,
    {
        while let Some(command) = self.consumer.try_pop() {
            match command {
                RenderCommand::Play(click) => {
                    // Reported from the scheduler side, never logged here
                    if !self.renderer.submit(&click) {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                RenderCommand::Clear => self.renderer.clear(),
            }
        }

        let timestamp = info.timestamp();
        if let Some(latency) = timestamp.playback.duration_since(&timestamp.callback) {
            self.latency.set(latency.as_secs_f64());
        }

        let channels = self.channels;
        let mut position = self.clock.current_frame();
        let mut frames = 0;

        for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
            let chunk_frames = chunk.len() / channels;
            let mono = &mut self.scratch[..chunk_frames];
            self.renderer.render(mono, position);

            for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
                for channel_sample in frame.iter_mut() {
                    *channel_sample = T::from_sample(sample);
                }
            }

            position += chunk_frames as u64;
            frames += chunk_frames;
        }

        self.clock.advance(frames);
    }
    // ========== SACRED ZONE END ==========
}

pub struct CpalContext {
    _device: Device,
    stream: Option<Stream>,
    state: ContextState,
    sample_rate: f32,
    clock: AudioTiming,
    latency: AtomicF64,
    dropped: Arc<AtomicU64>,
    failed: Arc<AtomicBool>,
    producer: Arc<Mutex<RenderProducer>>,
}

impl CpalContext {
    /// Build the output stream, suspended until `resume()`
    pub fn open(device_name: Option<&str>, queue_capacity: usize) -> EngineResult<Self> {
        let manager = AudioDeviceManager::new();
        let device = manager
            .find_output_device(device_name)
            .ok_or(EngineError::NoOutputDevice)?;

        log::info!(
            "Audio device: {} ({})",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            manager.host_name()
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| EngineError::DeviceConfig(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = (supported_config.channels() as usize).max(1);
        let config: StreamConfig = supported_config.into();

        log::debug!(
            "Output config: {} Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let (producer, consumer) = create_render_channel(queue_capacity);
        let clock = AudioTiming::new(sample_rate);
        let latency = AtomicF64::unset();
        let dropped = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicBool::new(false));

        let callback_state = CallbackState {
            consumer,
            renderer: ClickRenderer::new(sample_rate),
            scratch: vec![0.0; SCRATCH_FRAMES],
            clock: clock.clone(),
            latency: latency.clone(),
            dropped: Arc::clone(&dropped),
            channels,
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, callback_state, failed.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, callback_state, failed.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, callback_state, failed.clone())
            }
            other => {
                return Err(EngineError::DeviceConfig(format!(
                    "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                    other
                )));
            }
        }?;

        // Some hosts start streams on creation; hold it until resume()
        if let Err(e) = stream.pause() {
            log::debug!("Stream could not be paused after creation: {}", e);
        }

        Ok(Self {
            _device: device,
            stream: Some(stream),
            state: ContextState::Suspended,
            sample_rate,
            clock,
            latency,
            dropped,
            failed,
            producer: Arc::new(Mutex::new(producer)),
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut callback_state: CallbackState,
        failed: Arc<AtomicBool>,
    ) -> EngineResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                    callback_state.process(data, info);
                },
                move |err| {
                    // Runs outside the audio callback, I/O is fine here
                    log::error!("Audio stream error: {}", err);
                    failed.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|e| EngineError::Stream(e.to_string()))
    }
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        if self.failed.load(Ordering::Acquire) {
            ContextState::Closed
        } else {
            self.state
        }
    }

    fn resume(&mut self) -> EngineResult<()> {
        if self.state() == ContextState::Closed {
            return Err(EngineError::ContextClosed);
        }
        let stream = self.stream.as_ref().ok_or(EngineError::ContextClosed)?;
        stream
            .play()
            .map_err(|e| EngineError::Activation(e.to_string()))?;
        self.state = ContextState::Running;
        log::info!("Audio output running at {} Hz", self.sample_rate);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn output_latency(&self) -> Option<f64> {
        self.latency.get_finite()
    }

    fn render_target(&self) -> EngineResult<Box<dyn RenderTarget>> {
        if self.state() == ContextState::Closed {
            return Err(EngineError::ContextClosed);
        }
        Ok(Box::new(CpalRenderTarget {
            clock: self.clock.clone(),
            latency: self.latency.clone(),
            dropped: Arc::clone(&self.dropped),
            reported_drops: self.dropped.load(Ordering::Relaxed),
            failed: Arc::clone(&self.failed),
            producer: Arc::clone(&self.producer),
        }))
    }

    fn close(&mut self) {
        if let Ok(mut producer) = self.producer.lock() {
            let _ = producer.try_push(RenderCommand::Clear);
        }
        self.stream = None;
        self.state = ContextState::Closed;
        log::info!("Audio output closed");
    }
}

/// Scheduler-side handle: clock reads and pushes into the render queue
struct CpalRenderTarget {
    clock: AudioTiming,
    latency: AtomicF64,
    dropped: Arc<AtomicU64>,
    reported_drops: u64,
    failed: Arc<AtomicBool>,
    producer: Arc<Mutex<RenderProducer>>,
}

impl CpalRenderTarget {
    fn report_drops(&mut self) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > self.reported_drops {
            log::warn!(
                "Voice pool full, {} click(s) dropped by the renderer",
                dropped - self.reported_drops
            );
            self.reported_drops = dropped;
        }
    }
}

impl RenderTarget for CpalRenderTarget {
    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn output_latency(&self) -> Option<f64> {
        self.latency.get_finite()
    }

    fn submit(&mut self, click: ClickSpec) -> EngineResult<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(EngineError::Stream("output stream failed".to_string()));
        }
        self.report_drops();
        let mut producer = self
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        producer
            .try_push(RenderCommand::Play(click))
            .map_err(|_| EngineError::RenderQueueFull(click.start_time))
    }
}
