//! Engagement-score arithmetic.
//!
//! A subscriber's engagement score is a bounded integer in
//! [`MIN_SCORE`]..=[`MAX_SCORE`], created at [`BASELINE_SCORE`] on first
//! event. Deltas are applied as atomic increments against storage without a
//! prior read, so the clamp is a follow-up corrective write; the stored value
//! may transiently leave the bounds between the two steps.

/// Score assigned when an engagement record is first created.
pub const BASELINE_SCORE: i32 = 50;

/// Lower bound of the stored score after the corrective step.
pub const MIN_SCORE: i32 = 0;

/// Upper bound of the stored score after the corrective step.
pub const MAX_SCORE: i32 = 100;

/// Score adjustment for one engagement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDelta {
    /// First unique open within the dedup window: +5.
    Open,
    /// Any click: +10.
    Click,
    /// Unsubscribe: -50.
    Unsubscribe,
    /// Spam complaint: the score is forced to exactly 0, not adjusted.
    Spam,
}

impl ScoreDelta {
    /// The signed increment, or `None` for the spam hard reset.
    pub fn increment(&self) -> Option<i32> {
        match self {
            Self::Open => Some(5),
            Self::Click => Some(10),
            Self::Unsubscribe => Some(-50),
            Self::Spam => None,
        }
    }
}

/// Clamp a raw post-increment score into the stored bounds.
pub fn clamp_score(raw: i32) -> i32 {
    raw.clamp(MIN_SCORE, MAX_SCORE)
}
