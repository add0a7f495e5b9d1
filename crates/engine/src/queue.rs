//! Ordered, versioned playback queue

use narrator_core::PlaybackUnit;

/// Ordered list of playback units with a version tag.
///
/// Every mutation that replaces the unit sequence bumps `version`; the
/// version is the sole mechanism for telling live async results from stale
/// ones. Appends within a session keep the version, so in-flight work for
/// the live session stays valid.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    units: Vec<PlaybackUnit>,
    version: u64,
    cursor: usize,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Unit at the cursor, if any.
    pub fn current(&self) -> Option<&PlaybackUnit> {
        self.units.get(self.cursor)
    }

    pub fn get(&self, index: usize) -> Option<&PlaybackUnit> {
        self.units.get(index)
    }

    /// Replace the whole queue for a new episode or a fresh generation.
    /// Resets the cursor and invalidates all outstanding async work.
    /// Returns the new version.
    pub fn replace_all(&mut self, units: Vec<PlaybackUnit>) -> u64 {
        self.units = units;
        self.cursor = 0;
        self.version += 1;
        self.version
    }

    /// Append one unit to the live session without invalidating it.
    pub fn append(&mut self, unit: PlaybackUnit) {
        self.units.push(unit);
    }

    /// Empty the queue on explicit stop. Returns the new version.
    pub fn clear(&mut self) -> u64 {
        self.units.clear();
        self.cursor = 0;
        self.version += 1;
        self.version
    }

    /// Advance the cursor past a finished (or skipped) unit.
    ///
    /// Only the playback driver calls this; the cursor never moves backward
    /// except through `replace_all`/`clear`, and never past `len`.
    pub fn advance_cursor(&mut self) -> usize {
        if self.cursor < self.units.len() {
            self.cursor += 1;
        }
        self.cursor
    }

    /// Caught up: every queued unit has been consumed, more input may come.
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.units.len()
    }
}
