//! # Ghostpaw Matrix - Behavioral style from relationship and mood
//!
//! Maps a spirit's relationship score toward a peer onto a discrete
//! [`RelationshipTier`], then crosses that tier with the spirit's current
//! [`Mood`] to get the [`StyleToken`] the dashboard renders.
//!
//! Everything here is pure and safe to call from any thread.
//!
//! ```rust
//! use ghostpaw_matrix::{Mood, RelationshipMatrix, RelationshipTier};
//!
//! let tier = RelationshipMatrix::tier(72).unwrap();
//! assert_eq!(tier, RelationshipTier::Bonded);
//! assert_eq!(RelationshipMatrix::style(Mood::Focused, tier).as_str(), "deep collab");
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod profile;
pub mod style;
pub mod tier;

pub use error::{MatrixError, MatrixResult};
pub use profile::{RelationshipEntry, SpiritProfile};
pub use style::{style, Mood, StyleToken};
pub use tier::{tier, RelationshipTier, MAX_SCORE, MIN_SCORE};

/// Facade over the tier and style lookups.
pub struct RelationshipMatrix;

impl RelationshipMatrix {
    /// Classify a relationship score. Scores outside `[-100, 100]` are rejected.
    pub fn tier(score: i32) -> MatrixResult<RelationshipTier> {
        tier::tier(score)
    }

    /// Look up the behavioral style for a mood and tier.
    pub fn style(mood: Mood, tier: RelationshipTier) -> StyleToken {
        style::style(mood, tier)
    }

    /// Tier and style in one step.
    pub fn style_for_score(mood: Mood, score: i32) -> MatrixResult<StyleToken> {
        Ok(Self::style(mood, Self::tier(score)?))
    }
}
