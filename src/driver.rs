//! Sound driver
//!
//! Loads a user supplied file, decodes it, and runs play/pause/volume over an
//! [`AudioContext`]. Every `play` builds a fresh gain + buffer source pair,
//! every `pause` stops and discards them; the buffer, the volume and the
//! transport position outlive them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::{
    AudioBuffer, AudioContext, AudioNode, AudioSource, BufferSourceNode, GainNode, Target,
};
use crate::error::{DriverError, GraphError};
use crate::render::{Drawer, WaveformRenderer};

/// How a buffer source reaches the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Routing {
    /// Through the gain stage and also straight to the output, so the dry
    /// signal is always audible on top of the gained one
    #[default]
    DualPath,
    /// Through the gain stage only
    GainOnly,
}

impl Routing {
    pub const ALL: &'static [Routing] = &[Self::DualPath, Self::GainOnly];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DualPath => "Dual path",
            Self::GainOnly => "Gain only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    /// Gain used until `change_volume` is called
    pub default_volume: f32,
    pub routing: Routing,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            routing: Routing::default(),
        }
    }
}

/// Where playback stands
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transport {
    /// Never played
    Idle,
    /// Audible; `started_at` is the device time that maps to offset 0
    Running { started_at: f64 },
    /// Stopped at `offset` seconds into the buffer
    Paused { offset: f64 },
}

/// The per-play node pair
struct PlaybackNodes<C: AudioContext> {
    gain: C::Gain,
    source: C::Source,
}

impl<C: AudioContext> PlaybackNodes<C> {
    fn wire(&self, routing: Routing, output: Target) -> Result<(), GraphError> {
        self.source.connect(Target::node(&self.gain))?;
        if routing == Routing::DualPath {
            self.source.connect(output)?;
        }
        self.gain.connect(output)
    }

    /// Stop (if started) and disconnect both nodes, reporting the first failure
    fn release(mut self, started: bool) -> Result<(), GraphError> {
        let stopped = if started { self.source.stop() } else { Ok(()) };
        let source = self.source.disconnect();
        let gain = self.gain.disconnect();
        stopped.and(source).and(gain)
    }
}

/// Playback controller for one audio file
pub struct SoundDriver<C: AudioContext, R: WaveformRenderer = Drawer> {
    source: AudioSource,
    context: C,
    config: DriverConfig,
    buffer: Option<Arc<AudioBuffer>>,
    renderer: Option<R>,
    nodes: Option<PlaybackNodes<C>>,
    transport: Transport,
    volume: f32,
}

impl<C: AudioContext, R: WaveformRenderer> SoundDriver<C, R> {
    pub fn new(source: AudioSource, context: C) -> Self {
        Self::with_config(source, context, DriverConfig::default())
    }

    pub fn with_config(source: AudioSource, context: C, config: DriverConfig) -> Self {
        Self {
            source,
            context,
            config,
            buffer: None,
            renderer: None,
            nodes: None,
            transport: Transport::Idle,
            volume: config.default_volume,
        }
    }

    /// Read and decode the source, then bind the renderer to `parent`.
    ///
    /// Nothing is drawn until [`draw_chart`](Self::draw_chart).
    pub async fn init(&mut self, parent: Option<R::Mount>) -> Result<(), DriverError> {
        let mount = parent.ok_or(DriverError::MissingMount)?;

        let bytes = self.source.read().await?;
        log::debug!("Read {} bytes from {}", bytes.len(), self.source.label());

        let buffer = Arc::new(self.context.decode_audio_data(bytes).await?);
        log::info!(
            "Loaded {} ({:.2}s)",
            self.source.label(),
            buffer.duration()
        );

        self.renderer = Some(R::new(Arc::clone(&buffer), mount));
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Start or resume playback from the stored offset. No-op while running.
    pub async fn play(&mut self) -> Result<(), DriverError> {
        let buffer = self.buffer.clone().ok_or(DriverError::NoBuffer)?;

        if self.is_running() {
            return Ok(());
        }

        let offset = self.paused_at();

        let gain = self.context.create_gain()?;
        gain.set_gain(self.volume);
        let source = self.context.create_buffer_source(buffer)?;
        let mut nodes = PlaybackNodes::<C> { gain, source };

        if let Err(e) = nodes.wire(self.config.routing, self.context.destination()) {
            let _ = nodes.release(false);
            return Err(e.into());
        }

        if let Err(e) = self.context.resume().await {
            let _ = nodes.release(false);
            return Err(e.into());
        }

        if let Err(e) = nodes.source.start(offset) {
            let _ = nodes.release(false);
            return Err(e.into());
        }

        let started_at = self.context.current_time() - offset;
        log::debug!("Playing from {:.3}s (started_at={:.3})", offset, started_at);

        self.nodes = Some(nodes);
        self.transport = Transport::Running { started_at };
        Ok(())
    }

    /// Suspend output and remember where playback stopped.
    ///
    /// With `reset` the stored offset goes back to 0. Fails only if `play`
    /// never succeeded; pausing while paused keeps (or resets) the offset.
    pub async fn pause(&mut self, reset: bool) -> Result<(), DriverError> {
        match self.transport {
            Transport::Idle => Err(DriverError::NoBufferSource),
            Transport::Running { started_at } => {
                let nodes = self.nodes.take().ok_or(DriverError::NoBufferSource)?;

                if let Err(e) = self.context.suspend().await {
                    self.nodes = Some(nodes);
                    return Err(e.into());
                }

                let offset = if reset {
                    0.0
                } else {
                    (self.context.current_time() - started_at).max(0.0)
                };
                log::debug!("Paused at {:.3}s", offset);

                self.transport = Transport::Paused { offset };
                nodes.release(true)?;
                Ok(())
            }
            Transport::Paused { offset } => {
                self.context.suspend().await?;
                self.transport = Transport::Paused {
                    offset: if reset { 0.0 } else { offset },
                };
                Ok(())
            }
        }
    }

    /// Set the gain, on the live gain node if there is one and for every
    /// later `play`.
    ///
    /// No-op until the first successful `play`; once playback has started the
    /// value is kept across pauses.
    pub fn change_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            log::warn!("Ignoring non-finite volume {}", volume);
            return;
        }
        if self.transport == Transport::Idle {
            log::debug!("Ignoring volume {} before first play", volume);
            return;
        }

        if let Some(nodes) = &self.nodes {
            nodes.gain.set_gain(volume);
        }
        self.volume = volume;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Ask the renderer to draw. No-op before `init`.
    pub fn draw_chart(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.init();
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.transport, Transport::Running { .. })
    }

    /// Offset playback will resume from. 0 while running.
    pub fn paused_at(&self) -> f64 {
        match self.transport {
            Transport::Paused { offset } => offset,
            _ => 0.0,
        }
    }

    /// Device time corresponding to buffer offset 0, while running
    pub fn started_at(&self) -> Option<f64> {
        match self.transport {
            Transport::Running { started_at } => Some(started_at),
            _ => None,
        }
    }

    /// Current playback offset in seconds
    pub fn position(&self) -> f64 {
        let position = match self.transport {
            Transport::Idle => 0.0,
            Transport::Running { started_at } => self.context.current_time() - started_at,
            Transport::Paused { offset } => offset,
        };
        match self.duration() {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        }
    }

    /// Length of the decoded audio, once initialised
    pub fn duration(&self) -> Option<f64> {
        self.buffer.as_ref().map(|b| b.duration())
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::{Event, FakeContext};
    use crate::audio::{wav_bytes, NodeId};
    use crate::render::ChartMount;

    /// Two seconds of mono silence at 8 kHz
    fn silent_clip() -> AudioSource {
        AudioSource::from_bytes(wav_bytes(8000, 1, &vec![0; 16000]))
    }

    fn driver(context: &FakeContext) -> SoundDriver<FakeContext> {
        SoundDriver::new(silent_clip(), context.clone())
    }

    async fn ready(context: &FakeContext) -> SoundDriver<FakeContext> {
        let mut driver = driver(context);
        driver.init(Some(ChartMount::new())).await.unwrap();
        driver
    }

    fn created_gains(events: &[Event]) -> Vec<NodeId> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::CreateGain(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_init_keeps_default_volume() {
        let context = FakeContext::new();
        let driver = ready(&context).await;

        assert_eq!(driver.volume(), 1.0);
        assert!(!driver.is_running());
        assert!((driver.duration().unwrap() - 2.0).abs() < 1e-6);
        assert!(context.events().is_empty());
    }

    #[tokio::test]
    async fn test_init_without_mount_fails() {
        let context = FakeContext::new();
        let mut driver = driver(&context);

        let err = driver.init(None).await.unwrap_err();
        assert!(matches!(err, DriverError::MissingMount));
        assert!(driver.buffer().is_none());
    }

    #[tokio::test]
    async fn test_init_unreadable_file_fails() {
        let mut driver: SoundDriver<FakeContext> = SoundDriver::new(
            AudioSource::from_path("/no/such/dir/clip.wav"),
            FakeContext::new(),
        );

        let err = driver.init(Some(ChartMount::new())).await.unwrap_err();
        assert!(matches!(err, DriverError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_init_propagates_decode_failure() {
        let mut driver: SoundDriver<FakeContext> = SoundDriver::new(
            AudioSource::from_bytes(b"not audio at all".to_vec()),
            FakeContext::new(),
        );

        let err = driver.init(Some(ChartMount::new())).await.unwrap_err();
        assert!(matches!(err, DriverError::Decode(_)));
        assert!(driver.buffer().is_none());
    }

    #[tokio::test]
    async fn test_play_before_init_fails() {
        let context = FakeContext::new();
        let mut driver = driver(&context);

        let err = driver.play().await.unwrap_err();
        assert!(matches!(err, DriverError::NoBuffer));
        assert!(context.events().is_empty());
    }

    #[tokio::test]
    async fn test_pause_before_play_fails() {
        let context = FakeContext::new();
        let mut driver = driver(&context);
        assert!(matches!(
            driver.pause(false).await,
            Err(DriverError::NoBufferSource)
        ));

        driver.init(Some(ChartMount::new())).await.unwrap();
        assert!(matches!(
            driver.pause(true).await,
            Err(DriverError::NoBufferSource)
        ));
    }

    #[tokio::test]
    async fn test_play_wires_dual_path() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();

        let events = context.events();
        let (gain, source) = match &events[..2] {
            [Event::CreateGain(g), Event::CreateSource(s)] => (*g, *s),
            _ => panic!("unexpected events {:?}", events),
        };
        assert_eq!(
            events[2..],
            [
                Event::Connect(source, Target::Node(gain)),
                Event::Connect(source, Target::Destination),
                Event::Connect(gain, Target::Destination),
                Event::Resume,
                Event::Start(source, 0.0),
            ]
        );
        assert!(driver.is_running());
        assert!(context.is_running());
    }

    #[tokio::test]
    async fn test_gain_only_routing_skips_dry_path() {
        let context = FakeContext::new();
        let config = DriverConfig {
            routing: Routing::GainOnly,
            ..Default::default()
        };
        let mut driver: SoundDriver<FakeContext> =
            SoundDriver::with_config(silent_clip(), context.clone(), config);
        driver.init(Some(ChartMount::new())).await.unwrap();
        driver.play().await.unwrap();

        let direct = context
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Connect(_, Target::Destination)))
            .count();
        assert_eq!(direct, 1);
    }

    #[tokio::test]
    async fn test_play_is_idempotent_while_running() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        let started_at = driver.started_at();
        context.advance(0.25);
        context.clear_events();

        driver.play().await.unwrap();
        assert!(context.events().is_empty());
        assert_eq!(driver.started_at(), started_at);
    }

    #[tokio::test]
    async fn test_pause_stops_and_disconnects() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        context.clear_events();

        driver.pause(false).await.unwrap();
        let events = context.events();
        assert_eq!(events[0], Event::Suspend);
        assert!(matches!(events[1], Event::Stop(_)));
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Disconnect(_))).count(),
            2
        );
        assert!(!driver.is_running());
        assert!(!context.is_running());
    }

    #[tokio::test]
    async fn test_resume_from_paused_offset() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        context.advance(3.0); // suspended device, no effect

        driver.play().await.unwrap();
        context.advance(0.75);
        driver.pause(false).await.unwrap();
        assert!((driver.paused_at() - 0.75).abs() < 1e-9);
        assert!((driver.position() - 0.75).abs() < 1e-9);

        context.clear_events();
        driver.play().await.unwrap();
        let events = context.events();
        let offset = events.iter().find_map(|e| match e {
            Event::Start(_, offset) => Some(*offset),
            _ => None,
        });
        assert!((offset.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(driver.paused_at(), 0.0);
        let started_at = driver.started_at().unwrap();
        assert!((context.current_time() - started_at - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_every_play_builds_new_nodes() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;

        driver.play().await.unwrap();
        driver.pause(false).await.unwrap();
        driver.play().await.unwrap();

        let gains = created_gains(&context.events());
        assert_eq!(gains.len(), 2);
        assert_ne!(gains[0], gains[1]);
    }

    #[tokio::test]
    async fn test_pause_reset_goes_back_to_start() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        context.advance(1.2);

        driver.pause(true).await.unwrap();
        assert_eq!(driver.paused_at(), 0.0);
        assert_eq!(driver.position(), 0.0);
    }

    #[tokio::test]
    async fn test_pause_while_paused() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        context.advance(0.5);
        driver.pause(false).await.unwrap();
        context.clear_events();

        driver.pause(false).await.unwrap();
        assert!((driver.paused_at() - 0.5).abs() < 1e-9);
        assert_eq!(context.events(), vec![Event::Suspend]);

        driver.pause(true).await.unwrap();
        assert_eq!(driver.paused_at(), 0.0);
    }

    #[tokio::test]
    async fn test_volume_before_first_play_is_ignored() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;

        driver.change_volume(0.3);
        assert_eq!(driver.volume(), 1.0);

        driver.play().await.unwrap();
        let gain = created_gains(&context.events())[0];
        assert!(context.events().contains(&Event::SetGain(gain, 1.0)));
        assert!(!context.events().contains(&Event::SetGain(gain, 0.3)));
    }

    #[tokio::test]
    async fn test_volume_set_while_paused_seeds_next_play() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        driver.pause(false).await.unwrap();

        driver.change_volume(0.3);
        assert_eq!(driver.volume(), 0.3);

        driver.play().await.unwrap();
        let second = created_gains(&context.events())[1];
        assert!(context.events().contains(&Event::SetGain(second, 0.3)));
    }

    #[tokio::test]
    async fn test_volume_change_reaches_live_gain_and_survives_pause() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        let first = created_gains(&context.events())[0];

        driver.change_volume(0.6);
        assert!(context.events().contains(&Event::SetGain(first, 0.6)));

        driver.pause(false).await.unwrap();
        assert_eq!(driver.volume(), 0.6);

        driver.play().await.unwrap();
        let second = created_gains(&context.events())[1];
        assert!(context.events().contains(&Event::SetGain(second, 0.6)));
    }

    #[tokio::test]
    async fn test_non_finite_volume_ignored() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.change_volume(f32::NAN);
        assert_eq!(driver.volume(), 1.0);
    }

    #[tokio::test]
    async fn test_draw_chart() {
        let context = FakeContext::new();
        let mut driver = driver(&context);
        // No renderer yet
        driver.draw_chart();

        let mount = ChartMount::with_resolution(50);
        driver.init(Some(mount.clone())).await.unwrap();
        assert!(!mount.is_drawn());

        driver.draw_chart();
        let chart = mount.chart().unwrap();
        assert_eq!(chart.peaks.len(), 50);
        assert!((chart.duration - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_play_pause_scenario() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;

        driver.play().await.unwrap();
        context.advance(0.5);
        driver.pause(false).await.unwrap();
        assert!((driver.paused_at() - 0.5).abs() < 1e-9);

        driver.play().await.unwrap();
        assert!(driver.is_running());
        context.advance(0.25);
        assert!((driver.position() - 0.75).abs() < 1e-9);

        driver.pause(true).await.unwrap();
        assert_eq!(driver.paused_at(), 0.0);
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn test_position_clamped_to_duration() {
        let context = FakeContext::new();
        let mut driver = ready(&context).await;
        driver.play().await.unwrap();
        context.advance(10.0);
        assert!((driver.position() - 2.0).abs() < 1e-6);
    }
}
