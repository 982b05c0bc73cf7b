//! Transport lifecycle: output acquisition, timing fallback, observers,
//! teardown and configuration loading

use metronome_engine::sequencer::timer::ManualTimer;
use metronome_engine::{
    AudioContext, BeatCallbacks, BeatObserver, ContextState, EngineConfig, EngineState,
    HostProfile, Metronome, OfflineContext, OfflineProvider, SettingsUpdate, SoundProfile,
    TimingSource, TransportConfig,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn engine_with(provider: OfflineProvider) -> (Metronome, ManualTimer) {
    let timer = ManualTimer::new();
    let metronome = Metronome::with_parts(
        EngineConfig::default(),
        Box::new(provider),
        Box::new(timer.clone()),
        Box::new(ManualTimer::new()),
    );
    (metronome, timer)
}

#[test]
fn test_unavailable_output_keeps_engine_idle() {
    let ctx = OfflineContext::new(48000.0);
    let (mut metronome, timer) =
        engine_with(OfflineProvider::unavailable(ctx.clone()));

    assert!(!metronome.start(TransportConfig::default(), BeatCallbacks::none()));
    assert_eq!(metronome.state(), EngineState::Idle);
    assert!(!timer.is_active());
    assert!(metronome.timing_info().is_none());
    assert!(!metronome.test_click());
    assert!(ctx.submitted().is_empty());
}

#[test]
fn test_suspended_context_is_resumed() {
    let ctx = OfflineContext::new(48000.0).suspended(true);
    let (mut metronome, _timer) = engine_with(OfflineProvider::new(ctx.clone()));

    assert!(metronome.start(TransportConfig::default(), BeatCallbacks::none()));
    assert_eq!(ctx.state(), ContextState::Running);
    assert_eq!(ctx.submitted().len(), 1);
}

#[test]
fn test_unresumable_context_fails_start() {
    let ctx = OfflineContext::new(48000.0).suspended(false);
    let (mut metronome, _timer) = engine_with(OfflineProvider::new(ctx.clone()));

    assert!(!metronome.start(TransportConfig::default(), BeatCallbacks::none()));
    assert_eq!(metronome.state(), EngineState::Idle);
    assert!(ctx.submitted().is_empty());
}

#[test]
fn test_context_reused_across_stop_start() {
    let ctx = OfflineContext::new(48000.0);
    let provider = OfflineProvider::new(ctx.clone());
    let (mut metronome, _timer) = engine_with(provider.clone());

    for _ in 0..3 {
        assert!(metronome.start(TransportConfig::default(), BeatCallbacks::none()));
        metronome.stop();
    }
    assert_eq!(provider.created(), 1);

    metronome.destroy();
    assert_eq!(ctx.state(), ContextState::Closed);
    assert!(metronome.start(TransportConfig::default(), BeatCallbacks::none()));
    assert_eq!(provider.created(), 2);
}

#[test]
fn test_falls_back_when_primary_timer_fails() {
    let ctx = OfflineContext::new(48000.0);
    let fallback = ManualTimer::new();
    let mut metronome = Metronome::with_parts(
        EngineConfig::for_host(HostProfile::Mobile),
        Box::new(OfflineProvider::new(ctx.clone())),
        Box::new(ManualTimer::failing()),
        Box::new(fallback.clone()),
    );

    assert!(metronome.start(TransportConfig::default(), BeatCallbacks::none()));
    assert_eq!(metronome.state(), EngineState::Running);
    // Frame fallback runs at the host's frame interval
    assert_eq!(fallback.period(), Some(Duration::from_millis(20)));

    ctx.advance(0.45);
    assert!(fallback.fire());
    assert_eq!(ctx.submitted().len(), 2);

    metronome.stop();
    assert!(!fallback.fire());
}

#[test]
fn test_start_fails_when_no_timer_starts() {
    let ctx = OfflineContext::new(48000.0);
    let mut metronome = Metronome::with_parts(
        EngineConfig::default(),
        Box::new(OfflineProvider::new(ctx.clone())),
        Box::new(ManualTimer::failing()),
        Box::new(ManualTimer::failing()),
    );

    let beats = Arc::new(Mutex::new(Vec::new()));
    let sink = beats.clone();
    let callbacks = BeatCallbacks::none().on_beat(move |beat| sink.lock().unwrap().push(beat));
    let log = Arc::new(Mutex::new(Vec::new()));
    metronome.add_observer(Box::new(Tagged {
        tag: "o",
        log: log.clone(),
    }));

    assert!(!metronome.start(TransportConfig::default(), callbacks));
    assert_eq!(metronome.state(), EngineState::Idle);
    assert!(metronome.scheduled_events().is_empty());
    // Nothing was played or announced
    assert!(ctx.submitted().is_empty());
    assert!(beats.lock().unwrap().is_empty());
    assert!(log.lock().unwrap().is_empty());
}

struct Tagged {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl BeatObserver for Tagged {
    fn on_beat(&mut self, beat_index: u32) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.tag, beat_index));
    }
}

#[test]
fn test_observers_follow_callbacks_in_order() {
    let ctx = OfflineContext::new(48000.0);
    let (mut metronome, timer) = engine_with(OfflineProvider::new(ctx.clone()));
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = metronome.add_observer(Box::new(Tagged {
        tag: "first",
        log: log.clone(),
    }));
    metronome.add_observer(Box::new(Tagged {
        tag: "second",
        log: log.clone(),
    }));

    let sink = log.clone();
    let callbacks =
        BeatCallbacks::none().on_beat(move |beat| sink.lock().unwrap().push(format!("cb:{}", beat)));
    metronome.start(TransportConfig::default(), callbacks);

    assert_eq!(*log.lock().unwrap(), vec!["cb:0", "first:0", "second:0"]);

    assert!(metronome.remove_observer(first));
    ctx.advance(0.45);
    timer.fire();
    assert_eq!(log.lock().unwrap()[3..], ["cb:1", "second:1"]);
}

#[test]
fn test_observers_survive_restart() {
    let ctx = OfflineContext::new(48000.0);
    let (mut metronome, _timer) = engine_with(OfflineProvider::new(ctx.clone()));
    let log = Arc::new(Mutex::new(Vec::new()));
    metronome.add_observer(Box::new(Tagged {
        tag: "o",
        log: log.clone(),
    }));

    metronome.start(TransportConfig::default(), BeatCallbacks::none());
    metronome.stop();
    metronome.start(TransportConfig::default(), BeatCallbacks::none());

    assert_eq!(*log.lock().unwrap(), vec!["o:0", "o:0"]);
}

#[test]
fn test_settings_while_idle_apply_on_next_start() {
    let ctx = OfflineContext::new(48000.0);
    let (mut metronome, _timer) = engine_with(OfflineProvider::new(ctx.clone()));

    metronome.update_settings(
        SettingsUpdate::default()
            .sound_profile(SoundProfile::Sine)
            .beats_per_measure(40)
            .main_volume(-1.0),
    );
    let config = metronome.config();
    assert_eq!(config.sound_profile, SoundProfile::Sine);
    assert_eq!(config.beats_per_measure, 16);
    assert_eq!(config.main_volume, 0.0);
    assert_eq!(metronome.state(), EngineState::Idle);
}

#[test]
fn test_click_reports_context_state() {
    let ctx = OfflineContext::new(48000.0).suspended(true);
    let (mut metronome, _timer) = engine_with(OfflineProvider::new(ctx.clone()));

    assert!(metronome.test_click());
    let info = metronome.timing_info().unwrap();
    assert_eq!(info.context_state, ContextState::Running);
    assert_eq!(info.timing_source, None);
    assert_eq!(info.queue_length, 0);
    assert_eq!(ctx.submitted().len(), 1);
}

#[test]
fn test_config_file_drives_engine() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "(host: constrained, lookahead_ms: Some(40.0), transport: (tempo_bpm: 90.0, subdivision_count: 3))"
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.host, HostProfile::Constrained);

    let ctx = OfflineContext::new(48000.0);
    let timer = ManualTimer::new();
    let transport = config.transport;
    let mut metronome = Metronome::with_parts(
        config,
        Box::new(OfflineProvider::new(ctx.clone())),
        Box::new(timer.clone()),
        Box::new(ManualTimer::new()),
    );

    assert!(metronome.start(transport, BeatCallbacks::none()));
    assert_eq!(timer.period(), Some(Duration::from_millis(40)));

    let info = metronome.timing_info().unwrap();
    assert_eq!(info.host_profile, HostProfile::Constrained);
    assert_eq!(info.schedule_ahead, 0.4);
    assert_eq!(metronome.config().subdivision_count, 3);

    // Constrained hosts use the longest envelope
    assert_eq!(ctx.submitted()[0].release, 0.2);
}

#[test]
fn test_missing_config_file() {
    assert!(EngineConfig::load("/definitely/not/here.ron").is_err());
}

#[test]
fn test_drop_closes_context() {
    let ctx = OfflineContext::new(48000.0);
    {
        let (mut metronome, _timer) =
            engine_with(OfflineProvider::new(ctx.clone()));
        metronome.start(TransportConfig::default(), BeatCallbacks::none());
    }
    assert_eq!(ctx.state(), ContextState::Closed);
}
