//! Relationship tiers
//!
//! Boundaries: `>= 70` bonded, `[20, 70)` friendly, `(-20, 20)` neutral,
//! `[-69, -20]` tense, `< -69` antagonistic. The bands leave no gap. Tense
//! is closed at -69 and antagonistic is open below it, so -70 is the highest
//! antagonistic score; that asymmetric bound is kept literally.

use crate::error::{MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest valid relationship score.
pub const MIN_SCORE: i32 = -100;

/// Highest valid relationship score.
pub const MAX_SCORE: i32 = 100;

/// Discrete relationship classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipTier {
    Bonded,
    Friendly,
    Neutral,
    Tense,
    Antagonistic,
}

impl RelationshipTier {
    /// All tiers, warmest first.
    pub const ALL: [RelationshipTier; 5] = [
        RelationshipTier::Bonded,
        RelationshipTier::Friendly,
        RelationshipTier::Neutral,
        RelationshipTier::Tense,
        RelationshipTier::Antagonistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipTier::Bonded => "bonded",
            RelationshipTier::Friendly => "friendly",
            RelationshipTier::Neutral => "neutral",
            RelationshipTier::Tense => "tense",
            RelationshipTier::Antagonistic => "antagonistic",
        }
    }
}

impl fmt::Display for RelationshipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipTier {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| MatrixError::UnknownTier(s.to_string()))
    }
}

/// Classify a relationship score.
pub fn tier(score: i32) -> MatrixResult<RelationshipTier> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(MatrixError::InvalidScore(score));
    }

    let tier = if score >= 70 {
        RelationshipTier::Bonded
    } else if score >= 20 {
        RelationshipTier::Friendly
    } else if score > -20 {
        RelationshipTier::Neutral
    } else if score >= -69 {
        RelationshipTier::Tense
    } else {
        RelationshipTier::Antagonistic
    };

    Ok(tier)
}
