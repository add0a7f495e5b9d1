//! Session and epoch control

use narrator_core::GenerationEpoch;

/// Tracks the live generation epoch and the one-shot auto-resume flag.
///
/// Auto-resume covers the race where playback intent is captured before the
/// new session has queued anything: resuming against an empty queue would
/// immediately self-terminate, so the intent is parked until the queue
/// first turns non-empty under the new version.
#[derive(Debug, Default)]
pub struct SessionController {
    epoch: GenerationEpoch,
    auto_resume: bool,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> GenerationEpoch {
        self.epoch
    }

    /// Whether a command tagged with `epoch` belongs to the live session.
    pub fn is_current(&self, epoch: GenerationEpoch) -> bool {
        self.epoch == epoch
    }

    /// Begin a new generation session: bump the epoch and park the given
    /// playback intent. Returns the new epoch.
    pub fn begin(&mut self, was_playing: bool) -> GenerationEpoch {
        self.epoch = self.epoch.next();
        self.auto_resume = was_playing;
        self.epoch
    }

    /// Arm (or disarm) auto-resume outside a generation session, e.g. when
    /// navigating between already-generated episodes.
    pub fn set_auto_resume(&mut self, armed: bool) {
        self.auto_resume = armed;
    }

    pub fn auto_resume_armed(&self) -> bool {
        self.auto_resume
    }

    /// Fire the one-shot flag. Returns whether playback should start now.
    pub fn take_auto_resume(&mut self) -> bool {
        std::mem::take(&mut self.auto_resume)
    }
}
