//! Bit-level frame synchronization with graduated error tolerance.
//!
//! The [Synchronizer] walks a [BitSequence] looking for a [SyncMarker]. While unlocked it
//! checks every bit position. Once a marker is found it only checks where the next marker
//! is expected, one frame stride later, and tolerates more bit errors the longer the lock
//! has been held:
//!
//! ```text
//!  UNLOCKED --match--> SOFT_LOCK --5 accepts--> HARD_LOCK
//!     ^                 |    ^                     |
//!     |        2 misses |    | match          miss |
//!     |                 v    |                     |
//!     +--bit budget--- RESYNC                      |
//!                           SOFT_LOCK <------------+
//! ```
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{debug, span, trace, Level};

use crate::bits::{hamming_distance, BitSequence};

/// Fixed bit pattern marking the start of a frame, along with the nominal distance
/// between successive markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMarker {
    pattern: u128,
    width: usize,
    stride: usize,
}

impl SyncMarker {
    /// Create a marker from its bytes in transmission order. `stride` is the frame length
    /// in bytes, marker included.
    ///
    /// # Panics
    /// If `pattern` is empty or longer than 16 bytes.
    #[must_use]
    pub fn new(pattern: &[u8], stride: usize) -> Self {
        assert!(
            !pattern.is_empty() && pattern.len() * 8 <= BitSequence::MAX_WINDOW,
            "sync marker must be 1 to 16 bytes"
        );
        SyncMarker {
            pattern: pattern
                .iter()
                .fold(0u128, |acc, b| (acc << 8) | u128::from(*b)),
            width: pattern.len() * 8,
            stride,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> u128 {
        self.pattern
    }

    /// Marker width in bits.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame stride in bytes.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn stride_bits(&self) -> usize {
        self.stride * 8
    }
}

/// Maximum Hamming distance accepted in each [LockState].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub unlocked: u32,
    pub soft_lock: u32,
    pub resync: u32,
    pub hard_lock: u32,
}

impl Thresholds {
    /// Exact matching in every state.
    pub const EXACT: Thresholds = Thresholds {
        unlocked: 0,
        soft_lock: 0,
        resync: 0,
        hard_lock: 0,
    };

    #[must_use]
    pub fn for_state(&self, state: LockState) -> u32 {
        match state {
            LockState::Unlocked => self.unlocked,
            LockState::SoftLock => self.soft_lock,
            LockState::Resync => self.resync,
            LockState::HardLock => self.hard_lock,
        }
    }
}

/// Counter limits driving the lock state transitions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Consecutive soft-lock accepts required for hard lock.
    pub lock_after: u32,
    /// Consecutive soft-lock rejects that drop the lock entirely.
    pub unlock_after: u32,
    /// Soft-lock rejects, consecutive or not, that trigger a resync.
    pub resync_after: u32,
    /// Bit positions scanned in resync before giving up.
    pub resync_budget: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            lock_after: 5,
            unlock_after: 5,
            resync_after: 2,
            resync_budget: 3072 * 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    SoftLock,
    Resync,
    HardLock,
}

impl Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LockState::Unlocked => "UNLOCKED",
            LockState::SoftLock => "SOFT_LOCK",
            LockState::Resync => "RESYNC",
            LockState::HardLock => "HARD_LOCK",
        };
        f.write_str(name)
    }
}

/// Outcome of checking a single candidate position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// Synchronizer lock state along with the counters that drive its transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameLock {
    state: LockState,
    good: u32,
    bad: u32,
    misses: u32,
    resync_bits: usize,
}

impl FrameLock {
    fn enter(state: LockState) -> Self {
        FrameLock {
            state,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn state(&self) -> LockState {
        self.state
    }

    /// Bits to advance before checking the next candidate.
    #[must_use]
    pub fn scan_step(&self, stride_bits: usize) -> usize {
        match self.state {
            LockState::Unlocked | LockState::Resync => 1,
            LockState::SoftLock | LockState::HardLock => stride_bits,
        }
    }

    /// Compute the next lock given the Hamming `distance` of the current candidate.
    #[must_use]
    pub fn next(self, distance: u32, thresholds: &Thresholds, tuning: &Tuning) -> (Self, Verdict) {
        let accept = distance <= thresholds.for_state(self.state);
        match (self.state, accept) {
            (LockState::Unlocked, true) | (LockState::Resync, true) => {
                (Self::enter(LockState::SoftLock), Verdict::Accept)
            }
            (LockState::Unlocked, false) => (self, Verdict::Reject),
            (LockState::SoftLock, true) => {
                let good = self.good + 1;
                if good >= tuning.lock_after {
                    (Self::enter(LockState::HardLock), Verdict::Accept)
                } else {
                    let lock = FrameLock {
                        good,
                        bad: 0,
                        ..self
                    };
                    (lock, Verdict::Accept)
                }
            }
            (LockState::SoftLock, false) => {
                let bad = self.bad + 1;
                let misses = self.misses + 1;
                if bad >= tuning.unlock_after {
                    (Self::enter(LockState::Unlocked), Verdict::Reject)
                } else if misses >= tuning.resync_after {
                    (Self::enter(LockState::Resync), Verdict::Reject)
                } else {
                    let lock = FrameLock {
                        good: 0,
                        bad,
                        misses,
                        ..self
                    };
                    (lock, Verdict::Reject)
                }
            }
            (LockState::Resync, false) => {
                let resync_bits = self.resync_bits + 1;
                if resync_bits >= tuning.resync_budget {
                    (Self::enter(LockState::Unlocked), Verdict::Reject)
                } else {
                    (
                        FrameLock {
                            resync_bits,
                            ..self
                        },
                        Verdict::Reject,
                    )
                }
            }
            (LockState::HardLock, true) => (self, Verdict::Accept),
            (LockState::HardLock, false) => (Self::enter(LockState::SoftLock), Verdict::Reject),
        }
    }
}

/// A verified marker location.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStart {
    /// Bit offset of the first marker bit.
    pub bit: usize,
    /// State the synchronizer was in when the marker was accepted.
    pub state: LockState,
    /// Hamming distance between the marker and the stream at `bit`.
    pub distance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Full lock tracking.
    Track,
    /// Unlocked-only matching at fixed `step` bit increments.
    Search { step: usize },
}

/// Locates frame starts in a [BitSequence].
///
/// # Example
/// ```
/// use hrpt::bits::BitSequence;
/// use hrpt::framing::{SyncMarker, Synchronizer, Thresholds, ASM};
///
/// let mut dat = vec![0u8; 3 * 16];
/// for frame in dat.chunks_mut(16) {
///     frame[..4].copy_from_slice(&ASM);
/// }
/// let thresholds = Thresholds { unlocked: 0, soft_lock: 2, resync: 6, hard_lock: 12 };
/// let starts = Synchronizer::new(SyncMarker::new(&ASM, 16), thresholds)
///     .run(&BitSequence::from_bytes(dat));
///
/// let bits: Vec<usize> = starts.iter().map(|s| s.bit).collect();
/// assert_eq!(bits, vec![0, 128, 256]);
/// ```
#[derive(Debug, Clone)]
pub struct Synchronizer {
    marker: SyncMarker,
    thresholds: Thresholds,
    tuning: Tuning,
    mode: SyncMode,
    compare: fn(u128, u128) -> u32,
}

impl Synchronizer {
    #[must_use]
    pub fn new(marker: SyncMarker, thresholds: Thresholds) -> Self {
        Synchronizer {
            marker,
            thresholds,
            tuning: Tuning::default(),
            mode: SyncMode::Track,
            compare: hamming_distance,
        }
    }

    /// Exact-match synchronizer that never locks, checking every `step` bits and
    /// skipping past each marker found.
    #[must_use]
    pub fn search(marker: SyncMarker, step: usize) -> Self {
        Synchronizer {
            marker,
            thresholds: Thresholds::EXACT,
            tuning: Tuning::default(),
            mode: SyncMode::Search { step: step.max(1) },
            compare: hamming_distance,
        }
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Replace the default [hamming_distance] comparison.
    #[must_use]
    pub fn with_comparator(mut self, compare: fn(u128, u128) -> u32) -> Self {
        self.compare = compare;
        self
    }

    #[must_use]
    pub fn marker(&self) -> &SyncMarker {
        &self.marker
    }

    /// Scan `bits` and return the accepted frame starts in stream order. No markers is
    /// not an error, the result is simply empty.
    #[must_use]
    pub fn run(&self, bits: &BitSequence) -> Vec<FrameStart> {
        match self.mode {
            SyncMode::Track => self.track(bits),
            SyncMode::Search { step } => self.scan(bits, step),
        }
    }

    fn track(&self, bits: &BitSequence) -> Vec<FrameStart> {
        let span = span!(
            Level::DEBUG,
            "track",
            width = self.marker.width,
            stride = self.marker.stride
        );
        let _guard = span.enter();

        let stride = self.marker.stride_bits().max(1);
        let mut starts = Vec::new();
        let mut lock = FrameLock::default();
        let mut transitions = 0usize;
        let mut pos = 0usize;

        while let Some(window) = bits.window(pos, self.marker.width) {
            let distance = (self.compare)(window, self.marker.pattern);
            let (next, verdict) = lock.next(distance, &self.thresholds, &self.tuning);
            if verdict == Verdict::Accept {
                starts.push(FrameStart {
                    bit: pos,
                    state: lock.state,
                    distance,
                });
            }
            if next.state != lock.state {
                trace!(bit = pos, distance, from = %lock.state, to = %next.state, "lock transition");
                transitions += 1;
            }
            lock = next;
            pos += lock.scan_step(stride);
        }

        debug!(
            frames = starts.len(),
            transitions,
            bits = bits.len(),
            final_state = %lock.state,
            "synchronization complete"
        );
        starts
    }

    fn scan(&self, bits: &BitSequence, step: usize) -> Vec<FrameStart> {
        let mut starts = Vec::new();
        let mut pos = 0usize;

        while let Some(window) = bits.window(pos, self.marker.width) {
            let distance = (self.compare)(window, self.marker.pattern);
            if distance <= self.thresholds.unlocked {
                starts.push(FrameStart {
                    bit: pos,
                    state: LockState::Unlocked,
                    distance,
                });
                pos += self.marker.width;
            } else {
                pos += step;
            }
        }

        debug!(
            frames = starts.len(),
            bits = bits.len(),
            "marker search complete"
        );
        starts
    }
}
