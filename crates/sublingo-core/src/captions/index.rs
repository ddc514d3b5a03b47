//! Playback-time to active-cue resolution
//!
//! [`CueIndex`] answers "which cue is active at time t". Monotonic playback
//! advances a forward cursor (amortized O(1) per tick); a backward seek
//! rebuilds the cursor with a binary search over cue starts.
//!
//! Active means `start <= t <= end`. When several cues cover `t` the one
//! with the latest start wins; equal starts break toward the later cue in
//! sort order.

use super::models::{sort_cues, Cue};
use crate::TimeSec;

/// Index over a sorted cue sequence for active-cue lookup.
#[derive(Debug, Clone)]
pub struct CueIndex {
    cues: Vec<Cue>,
    /// Count of cues with `start <= last queried time`
    cursor: usize,
    last_time: TimeSec,
    /// Longest cue duration; bounds the backward covering scan
    max_duration: TimeSec,
}

impl CueIndex {
    /// Builds an index over the given cues, sorting them by start time.
    pub fn new(mut cues: Vec<Cue>) -> Self {
        sort_cues(&mut cues);
        let max_duration = cues.iter().map(|c| c.duration()).fold(0.0, f64::max);
        Self {
            cues,
            cursor: 0,
            last_time: f64::NEG_INFINITY,
            max_duration,
        }
    }

    /// Number of indexed cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// The cue at a sorted position.
    pub fn cue(&self, position: usize) -> Option<&Cue> {
        self.cues.get(position)
    }

    /// All cues in sorted order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Resolves the active cue at the given playback time.
    ///
    /// Returns the cue's sorted position (stable identity within one track)
    /// plus the cue itself, or `None` when no cue covers `time`. The same
    /// time always resolves to the same cue regardless of query history.
    pub fn active_cue_at(&mut self, time: TimeSec) -> Option<(usize, &Cue)> {
        if !time.is_finite() {
            return None;
        }
        if time < self.last_time {
            // backward seek: recompute the cursor instead of walking back
            self.cursor = self.cues.partition_point(|c| c.start_sec <= time);
        }
        self.last_time = time;
        while self.cursor < self.cues.len() && self.cues[self.cursor].start_sec <= time {
            self.cursor += 1;
        }

        // walk back through already-started cues; the first one still
        // covering `time` is the latest-starting active cue. Any covering
        // cue must start within `max_duration` of `time`, which bounds the
        // scan.
        let floor = time - self.max_duration;
        let mut i = self.cursor;
        while i > 0 {
            i -= 1;
            let cue = &self.cues[i];
            if cue.start_sec < floor {
                break;
            }
            if cue.end_sec >= time {
                return Some((i, &self.cues[i]));
            }
        }
        None
    }
}
