//! Enrollment fusion
//!
//! Three captures of the same finger are checked against each other and
//! folded into one registration template with the engine's help.

use tracing::{debug, warn};

use crate::{
    cipher,
    constants::template::EXPORT_LEN,
    engine::MatchingEngine,
    error::{Error, Result},
};

/// Number of captures taken during enrollment
pub const ENROLL_CAPTURES: usize = 3;

/// Which captures end up in the registration template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum MergeMode {
    /// Only the highest quality capture
    #[default]
    Representative = 1,
    /// Everything except the lowest quality capture
    BestTwo = 2,
}

impl TryFrom<i32> for MergeMode {
    type Error = i32;
    
    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        match value {
            1 => Ok(Self::Representative),
            2 => Ok(Self::BestTwo),
            other => Err(other),
        }
    }
}

/// Outcome of a fusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fused {
    /// Encoded registration template
    pub template: Vec<u8>,
    /// Quality of the representative capture (absent for pass-through)
    pub quality: Option<i32>,
}

/// Index of the best capture; ties go to the later capture
fn best_of(q: &[i32; 3]) -> usize {
    let mut best = if q[0] <= q[1] { 1 } else { 0 };
    if q[best] <= q[2] {
        best = 2;
    }
    best
}

/// Index of the worst capture; ties go to the later capture
fn worst_of(q: &[i32; 3]) -> usize {
    let mut worst = if q[0] >= q[1] { 1 } else { 0 };
    if q[2] <= q[worst] {
        worst = 2;
    }
    worst
}

/// Fuse enrollment captures into one encoded registration template
///
/// One capture is copied through untouched. Three captures must pairwise
/// match the first one (score > 0); `user` is used as scratch space and is
/// left holding the fused template.
pub fn fuse<E: MatchingEngine>(
    engine: &mut E,
    user: E::User,
    captures: &[&[u8]],
    mode: MergeMode,
) -> Result<Fused> {
    match captures.len() {
        1 => {
            return Ok(Fused {
                template: captures[0].to_vec(),
                quality: None,
            });
        }
        ENROLL_CAPTURES => {}
        n => return Err(Error::UnsupportedCount(n)),
    }
    
    let decoded = captures
        .iter()
        .map(|c| cipher::decode(c))
        .collect::<Result<Vec<_>>>()?;
    
    engine.clear_user(user)?;
    let mut quality = [0i32; ENROLL_CAPTURES];
    for (i, plain) in decoded.iter().enumerate() {
        engine.import_template(user, plain)?;
        quality[i] = engine.fingerprint_quality(user, i)?;
    }
    
    for other in [2, 1] {
        let score = engine.match_fingerprints(user, 0, other)?;
        debug!(index = other, score, "Enrollment cross-match");
        if score <= 0 {
            warn!(index = other, "Enrollment capture does not match the first one");
            return Err(Error::CapturesDiffer { first: 0, second: other });
        }
    }
    
    let best = best_of(&quality);
    let worst = worst_of(&quality);
    debug!(?quality, best, worst, ?mode, "Fusing enrollment captures");
    
    engine.clear_user(user)?;
    match mode {
        MergeMode::Representative => engine.import_template(user, &decoded[best])?,
        MergeMode::BestTwo => {
            for (i, plain) in decoded.iter().enumerate() {
                if i != worst {
                    engine.import_template(user, plain)?;
                }
            }
        }
    }
    
    let exported = engine.export_template(user, EXPORT_LEN)?;
    if exported.len() > EXPORT_LEN {
        return Err(Error::TooLarge {
            size: exported.len(),
            max: EXPORT_LEN,
        });
    }
    
    Ok(Fused {
        template: cipher::encode(&exported)?,
        quality: Some(quality[best]),
    })
}
