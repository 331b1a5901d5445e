//! Score normalization policy
//!
//! The engine reports raw scores on a scale that depends on its version.
//! Three fixed policies translate between that scale and the public 0..=100
//! score used by thresholds and match results.

use tracing::debug;

use crate::engine::EngineVersion;

/// Public score offset applied by offset-mode policies
pub const OFFSET: i32 = 35;

/// Highest public score
pub const MAX_SCORE: i32 = 100;

/// How raw scores relate to public scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// `public = (raw - step) / multiplier`
    Linear,
    /// `public = (raw - step) / multiplier + 35`
    Offset,
}

/// Version-keyed score policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    pub mode: ScoreMode,
    /// Raw threshold applied at session start
    pub base: i32,
    pub step: i32,
    pub multiplier: i32,
    /// Engine speed setting
    pub speed: i32,
}

impl ScorePolicy {
    /// Select the policy for an engine version
    pub fn for_version(version: EngineVersion) -> Self {
        let policy = if version.major > 2 {
            Self {
                mode: ScoreMode::Offset,
                base: 85,
                step: 40,
                multiplier: 5,
                speed: 4,
            }
        } else if version.minor > 0x45 {
            Self {
                mode: ScoreMode::Offset,
                base: 220,
                step: 120,
                multiplier: 5,
                speed: 7,
            }
        } else {
            Self {
                mode: ScoreMode::Linear,
                base: 12300,
                step: 8000,
                multiplier: 100,
                speed: 7,
            }
        };
        debug!(%version, ?policy, "Selected score policy");
        policy
    }
    
    /// Map a raw engine score onto the public scale
    ///
    /// Results are clamped to `0..=100`; non-positive raw scores map to 0.
    pub fn normalize(&self, raw: i32) -> i32 {
        if raw <= 0 {
            return 0;
        }
        let mut score = (raw - self.step) / self.multiplier;
        if self.mode == ScoreMode::Offset {
            score += OFFSET;
        }
        score.clamp(0, MAX_SCORE)
    }
    
    /// Map a public threshold onto the engine's raw scale
    pub fn engine_threshold(&self, public: i32) -> i32 {
        let public = public.min(MAX_SCORE);
        let scaled = match self.mode {
            ScoreMode::Offset => self.multiplier * (public - OFFSET),
            ScoreMode::Linear => self.multiplier * public,
        };
        (scaled + self.step).max(self.step)
    }
}

/// Public match thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Applied during 1:1 matching
    pub verify: i32,
    /// Applied the rest of the time
    pub identify: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            verify: 35,
            identify: 55,
        }
    }
}
