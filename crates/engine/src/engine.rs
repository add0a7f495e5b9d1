//! Narration engine
//!
//! A single task owns every piece of mutable playback state (queue, cursor,
//! version, prefetch cache, driver state). Synthesis, rendering, and pacing
//! delays run in spawned tasks that report back over the internal channel,
//! tagged with the version they were issued under; results whose tag no
//! longer matches are dropped on arrival. Correctness never depends on
//! prompt cancellation of dispatched network work.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use narrator_config::NarrationConfig;
use narrator_core::{AudioHandle, EngineError, GenerationEpoch, PlaybackUnit, TtsError};
use narrator_tts::{SpeechBackend, SpeechRequest};

use crate::driver::DriverState;
use crate::prefetch::PrefetchScheduler;
use crate::queue::PlaybackQueue;
use crate::render::{AudioRenderer, RenderOutcome, RenderParams};
use crate::segment::segment_content;
use crate::session::SessionController;

/// Events emitted by the narration engine.
#[derive(Debug, Clone)]
pub enum NarrationEvent {
    /// Driver state changed.
    StateChanged(DriverState),
    /// A unit began rendering.
    UnitStarted { index: usize },
    /// A unit finished rendering.
    UnitFinished { index: usize },
    /// A unit was skipped after a synthesis or render failure.
    UnitSkipped { index: usize, reason: String },
    /// The cursor caught up with the queue; more input may still arrive.
    QueueDrained { version: u64 },
    /// Playback stopped explicitly.
    Stopped,
}

/// Snapshot of observable engine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSnapshot {
    pub driver: DriverState,
    pub is_playing: bool,
    pub cursor: usize,
    pub queue_len: usize,
    pub version: u64,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            driver: DriverState::Idle,
            is_playing: false,
            cursor: 0,
            queue_len: 0,
            version: 0,
        }
    }
}

enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
    SetRate(f32),
    BeginGeneration {
        reply: oneshot::Sender<GenerationEpoch>,
    },
    QueueSentence {
        epoch: GenerationEpoch,
        text: String,
    },
    QueueContent {
        text: String,
    },
    LoadEpisode {
        text: String,
    },
    Shutdown,
}

enum Msg {
    Cmd(Command),
    PrefetchDone {
        index: usize,
        version: u64,
        result: Result<AudioHandle, TtsError>,
    },
    ResolveDone {
        index: usize,
        version: u64,
        result: Result<AudioHandle, TtsError>,
    },
    RenderDone {
        index: usize,
        version: u64,
        seq: u64,
        outcome: RenderOutcome,
    },
}

/// Handle to a running narration engine.
///
/// Cloneable; every mutation funnels through the single engine task, so at
/// most one playback session is ever active.
#[derive(Clone)]
pub struct Narrator {
    tx: mpsc::Sender<Msg>,
    events: broadcast::Sender<NarrationEvent>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
}

impl Narrator {
    /// Spawn the engine task.
    pub fn spawn(
        config: NarrationConfig,
        synth: Arc<dyn SpeechBackend>,
        renderer: Arc<dyn AudioRenderer>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(100);
        let snapshot = Arc::new(RwLock::new(EngineSnapshot::default()));

        let actor = EngineActor::new(
            config,
            synth,
            renderer,
            tx.clone(),
            events.clone(),
            snapshot.clone(),
        );
        tokio::spawn(actor.run(rx));

        Self {
            tx,
            events,
            snapshot,
        }
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        *self.snapshot.read()
    }

    pub fn state(&self) -> DriverState {
        self.snapshot.read().driver
    }

    pub fn is_playing(&self) -> bool {
        self.snapshot.read().is_playing
    }

    pub fn cursor(&self) -> usize {
        self.snapshot.read().cursor
    }

    pub fn version(&self) -> u64 {
        self.snapshot.read().version
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .send(Msg::Cmd(command))
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Start (or resume) playback of the queued units.
    pub async fn play(&self) -> Result<(), EngineError> {
        self.send(Command::Play).await
    }

    /// Halt without losing the cursor or any already-resolved audio.
    pub async fn pause(&self) -> Result<(), EngineError> {
        self.send(Command::Pause).await
    }

    /// Resume a paused session on the same unit.
    pub async fn resume(&self) -> Result<(), EngineError> {
        self.send(Command::Resume).await
    }

    /// Stop playback: cancels the active render, clears the queue, and
    /// invalidates all in-flight work.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.send(Command::Stop).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<(), EngineError> {
        self.send(Command::SetVolume(volume)).await
    }

    pub async fn set_rate(&self, rate: f32) -> Result<(), EngineError> {
        self.send(Command::SetRate(rate)).await
    }

    /// Begin a new generation session. Captures playback intent, stops the
    /// current session, and returns the epoch that tags its sentences.
    pub async fn begin_generation(&self) -> Result<GenerationEpoch, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::BeginGeneration { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Queue one streamed sentence under a generation epoch. Sentences
    /// from a superseded epoch are dropped.
    pub async fn queue_sentence(
        &self,
        epoch: GenerationEpoch,
        text: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.send(Command::QueueSentence {
            epoch,
            text: text.into(),
        })
        .await
    }

    /// Replace the queue wholesale with segmented text.
    pub async fn queue_content(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(Command::QueueContent { text: text.into() }).await
    }

    /// Navigate to an already-generated episode: stop, requeue, and resume
    /// from unit 0 if audio was playing.
    pub async fn load_episode(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(Command::LoadEpisode { text: text.into() }).await
    }

    /// Terminate the engine task.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(Command::Shutdown).await
    }
}

struct EngineActor {
    config: NarrationConfig,
    synth: Arc<dyn SpeechBackend>,
    renderer: Arc<dyn AudioRenderer>,
    internal_tx: mpsc::Sender<Msg>,
    events: broadcast::Sender<NarrationEvent>,
    snapshot: Arc<RwLock<EngineSnapshot>>,

    queue: PlaybackQueue,
    session: SessionController,
    prefetch: PrefetchScheduler,
    driver: DriverState,
    is_playing: bool,
    /// Audio resolved for the unit at the cursor; survives pause/resume so
    /// resuming never re-fetches.
    resolved: Option<AudioHandle>,
    /// Identifies the active render; a canceled render that resolves late
    /// carries an older sequence and is dropped.
    render_seq: u64,
    volume: f32,
    rate: f32,
}

impl EngineActor {
    fn new(
        config: NarrationConfig,
        synth: Arc<dyn SpeechBackend>,
        renderer: Arc<dyn AudioRenderer>,
        internal_tx: mpsc::Sender<Msg>,
        events: broadcast::Sender<NarrationEvent>,
        snapshot: Arc<RwLock<EngineSnapshot>>,
    ) -> Self {
        let prefetch = PrefetchScheduler::new(config.prefetch_depth, 0);
        let volume = config.volume;
        let rate = config.playback_rate;
        Self {
            config,
            synth,
            renderer,
            internal_tx,
            events,
            snapshot,
            queue: PlaybackQueue::new(),
            session: SessionController::new(),
            prefetch,
            driver: DriverState::Idle,
            is_playing: false,
            resolved: None,
            render_seq: 0,
            volume,
            rate,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Msg>) {
        debug!("narration engine task started");
        while let Some(msg) = rx.recv().await {
            match msg {
                Msg::Cmd(Command::Shutdown) => break,
                Msg::Cmd(command) => self.handle_command(command),
                Msg::PrefetchDone {
                    index,
                    version,
                    result,
                } => {
                    self.prefetch
                        .complete(index, version, self.queue.cursor(), result);
                }
                Msg::ResolveDone {
                    index,
                    version,
                    result,
                } => self.on_resolve_done(index, version, result),
                Msg::RenderDone {
                    index,
                    version,
                    seq,
                    outcome,
                } => self.on_render_done(index, version, seq, outcome),
            }
            self.publish_snapshot();
        }
        debug!("narration engine task stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play | Command::Resume => {
                self.is_playing = true;
                if matches!(self.driver, DriverState::Stopped | DriverState::Paused) {
                    self.set_driver(DriverState::Idle);
                }
                self.drive();
            }

            Command::Pause => {
                if matches!(
                    self.driver,
                    DriverState::Idle | DriverState::AwaitingAudio | DriverState::Rendering
                ) && self.is_playing
                {
                    if self.driver.is_rendering() {
                        // abort the active render; the resolved handle is
                        // kept and replayed on resume
                        self.renderer.cancel();
                    }
                    self.set_driver(DriverState::Paused);
                }
            }

            Command::Stop => self.stop_session(true),

            Command::SetVolume(volume) => {
                let volume = volume.clamp(0.0, 1.0);
                self.volume = volume;
                self.renderer.set_volume(volume);
            }

            Command::SetRate(rate) => {
                if rate > 0.0 {
                    self.rate = rate;
                    self.renderer.set_rate(rate);
                }
            }

            Command::BeginGeneration { reply } => {
                let was_playing = self.is_playing;
                self.stop_session(false);
                let epoch = self.session.begin(was_playing);
                info!(%epoch, was_playing, "generation session started");
                // callers read the snapshot right after the reply arrives
                self.publish_snapshot();
                let _ = reply.send(epoch);
            }

            Command::QueueSentence { epoch, text } => {
                if !self.session.is_current(epoch) {
                    trace!(%epoch, "dropping sentence from superseded generation");
                    return;
                }
                let was_empty = self.queue.is_empty();
                let mut appended = false;
                for unit in segment_content(&text) {
                    self.queue.append(unit);
                    appended = true;
                }
                if !appended {
                    return;
                }
                if was_empty && self.session.auto_resume_armed() {
                    self.session.take_auto_resume();
                    debug!("auto-resuming playback on first queued sentence");
                    self.is_playing = true;
                    self.set_driver(DriverState::Idle);
                }
                self.schedule_prefetch();
                self.drive();
            }

            Command::QueueContent { text } => {
                self.replace_queue(segment_content(&text));
                self.schedule_prefetch();
                self.drive();
            }

            Command::LoadEpisode { text } => {
                let was_playing = self.is_playing;
                self.is_playing = false;
                self.replace_queue(segment_content(&text));
                self.session.set_auto_resume(was_playing);
                if !self.queue.is_empty() && self.session.auto_resume_armed() {
                    self.session.take_auto_resume();
                    self.is_playing = true;
                }
                self.set_driver(DriverState::Idle);
                self.schedule_prefetch();
                self.drive();
            }

            // handled in the main loop
            Command::Shutdown => {}
        }
    }

    /// Explicit stop: cancel the active render, clear the queue (bumping
    /// the version so in-flight results die on arrival), reset bookkeeping.
    fn stop_session(&mut self, emit: bool) {
        self.renderer.cancel();
        let version = self.queue.clear();
        self.prefetch.invalidate(version);
        self.resolved = None;
        self.is_playing = false;
        self.session.set_auto_resume(false);
        self.set_driver(DriverState::Stopped);
        if emit {
            let _ = self.events.send(NarrationEvent::Stopped);
        }
    }

    /// Wholesale queue replacement; the version bump invalidates every
    /// outstanding result, including the active render's.
    fn replace_queue(&mut self, units: Vec<PlaybackUnit>) {
        self.renderer.cancel();
        let version = self.queue.replace_all(units);
        self.prefetch.invalidate(version);
        self.resolved = None;
        if !matches!(self.driver, DriverState::Paused | DriverState::Stopped) {
            self.set_driver(DriverState::Idle);
        }
    }

    /// Advance the state machine as far as it can without suspending.
    fn drive(&mut self) {
        if !self.is_playing || !self.driver.can_issue_work() {
            return;
        }

        if self.queue.is_drained() {
            // caught up; wait for more input
            self.set_driver(DriverState::Idle);
            return;
        }

        self.schedule_prefetch();

        let cursor = self.queue.cursor();
        match self.resolved.take().or_else(|| self.prefetch.take(cursor)) {
            Some(handle) => self.start_render(cursor, handle),
            None => {
                self.set_driver(DriverState::AwaitingAudio);
                self.spawn_resolve(cursor);
            }
        }
    }

    fn schedule_prefetch(&mut self) {
        let version = self.queue.version();
        for index in self.prefetch.plan(self.queue.cursor(), self.queue.len()) {
            let Some(unit) = self.queue.get(index) else {
                continue;
            };
            let request = self.speech_request(&unit.text);
            let synth = self.synth.clone();
            let tx = self.internal_tx.clone();
            let deadline = Duration::from_secs(self.config.synthesis_timeout_secs);
            trace!(index, version, "prefetching audio");
            tokio::spawn(async move {
                let result = synthesize_with_deadline(synth, request, deadline).await;
                let _ = tx.send(Msg::PrefetchDone {
                    index,
                    version,
                    result,
                })
                .await;
            });
        }
    }

    fn spawn_resolve(&mut self, index: usize) {
        let Some(unit) = self.queue.get(index) else {
            return;
        };
        let request = self.speech_request(&unit.text);
        let version = self.queue.version();
        let synth = self.synth.clone();
        let tx = self.internal_tx.clone();
        let deadline = Duration::from_secs(self.config.synthesis_timeout_secs);
        debug!(index, version, "generating audio on demand");
        tokio::spawn(async move {
            let result = synthesize_with_deadline(synth, request, deadline).await;
            let _ = tx.send(Msg::ResolveDone {
                index,
                version,
                result,
            })
            .await;
        });
    }

    fn start_render(&mut self, index: usize, handle: AudioHandle) {
        let version = self.queue.version();
        self.render_seq += 1;
        let seq = self.render_seq;
        let params = RenderParams {
            volume: self.volume,
            rate: self.rate,
        };
        let pause = self
            .queue
            .get(index)
            .filter(|unit| unit.is_paragraph_start)
            .map(|_| Duration::from_millis(self.config.paragraph_pause_ms))
            .filter(|delay| !delay.is_zero());

        // keep the handle so pause/resume can replay without re-fetching
        self.resolved = Some(handle.clone());
        self.set_driver(DriverState::Rendering);
        let _ = self.events.send(NarrationEvent::UnitStarted { index });

        let renderer = self.renderer.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            if let Some(delay) = pause {
                tokio::time::sleep(delay).await;
            }
            let outcome = renderer.render(&handle, params).await;
            let _ = tx.send(Msg::RenderDone {
                index,
                version,
                seq,
                outcome,
            })
            .await;
        });
    }

    fn on_resolve_done(
        &mut self,
        index: usize,
        version: u64,
        result: Result<AudioHandle, TtsError>,
    ) {
        if version != self.queue.version() {
            // a newer operation owns the session
            trace!(index, version, "discarding stale on-demand result");
            return;
        }
        if index != self.queue.cursor() {
            trace!(index, cursor = self.queue.cursor(), "on-demand result for a passed unit");
            return;
        }

        match self.driver {
            DriverState::AwaitingAudio => match result {
                Ok(handle) => self.start_render(index, handle),
                Err(err) => {
                    // skipped, not retried: stalling narration on one bad
                    // unit is worse than losing it
                    warn!(index, %err, "audio generation failed, skipping unit");
                    let _ = self.events.send(NarrationEvent::UnitSkipped {
                        index,
                        reason: err.to_string(),
                    });
                    self.advance();
                }
            },
            DriverState::Paused => {
                // keep the resolved audio for resume; a failure here is
                // retried on demand once the session resumes
                if let Ok(handle) = result {
                    self.resolved = Some(handle);
                }
            }
            _ => {}
        }
    }

    fn on_render_done(&mut self, index: usize, version: u64, seq: u64, outcome: RenderOutcome) {
        if version != self.queue.version() || seq != self.render_seq {
            // stale render signal: the queue was stopped or replaced, or a
            // canceled render resolved after its successor started. Errors
            // from a cleared render target land here by design of the
            // version bump and are ignored.
            trace!(index, version, seq, "discarding stale render signal");
            return;
        }
        if !self.driver.is_rendering() || index != self.queue.cursor() {
            trace!(index, ?outcome, "render signal outside an active render");
            return;
        }

        match outcome {
            RenderOutcome::Finished => {
                let _ = self.events.send(NarrationEvent::UnitFinished { index });
            }
            RenderOutcome::Failed(reason) => {
                // render errors skip forward exactly like completions
                warn!(index, %reason, "render failed, skipping unit");
                let _ = self.events.send(NarrationEvent::UnitSkipped { index, reason });
            }
        }
        self.advance();
    }

    fn advance(&mut self) {
        self.resolved = None;
        let cursor = self.queue.advance_cursor();
        self.prefetch.evict_behind(cursor);
        self.set_driver(DriverState::Idle);
        if self.queue.is_drained() {
            let _ = self.events.send(NarrationEvent::QueueDrained {
                version: self.queue.version(),
            });
        }
        self.drive();
    }

    fn speech_request(&self, text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.to_string(),
            voice: self.config.voice.clone(),
            provider_id: self.config.provider_id,
            voice_clone_id: self.config.voice_clone_id,
            speed: self.rate,
        }
    }

    fn set_driver(&mut self, state: DriverState) {
        if self.driver != state {
            trace!(from = ?self.driver, to = ?state, "driver state changed");
            self.driver = state;
            let _ = self.events.send(NarrationEvent::StateChanged(state));
        }
    }

    fn publish_snapshot(&self) {
        *self.snapshot.write() = EngineSnapshot {
            driver: self.driver,
            is_playing: self.is_playing,
            cursor: self.queue.cursor(),
            queue_len: self.queue.len(),
            version: self.queue.version(),
        };
    }
}

async fn synthesize_with_deadline(
    synth: Arc<dyn SpeechBackend>,
    request: SpeechRequest,
    deadline: Duration,
) -> Result<AudioHandle, TtsError> {
    match tokio::time::timeout(deadline, synth.synthesize(&request)).await {
        Ok(result) => result,
        Err(_) => Err(TtsError::Timeout(deadline.as_millis() as u64)),
    }
}
