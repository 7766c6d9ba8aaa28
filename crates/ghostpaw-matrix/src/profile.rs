//! Spirit profiles: mood plus relationship scores toward peers.

use crate::error::{MatrixError, MatrixResult};
use crate::style::{style, Mood, StyleToken};
use crate::tier::{tier, RelationshipTier, MAX_SCORE, MIN_SCORE};
use ghostpaw_types::SpiritId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score toward a single peer spirit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipEntry<'a> {
    pub peer: &'a SpiritId,
    pub score: i32,
}

impl RelationshipEntry<'_> {
    pub fn tier(&self) -> MatrixResult<RelationshipTier> {
        tier(self.score)
    }
}

/// Profile of a spirit as maintained by the relationship-update collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiritProfile {
    pub id: SpiritId,
    pub name: String,
    #[serde(default)]
    pub mood: Mood,
    /// Peer spirit id to score in `[-100, 100]`
    #[serde(default)]
    pub relationships: BTreeMap<SpiritId, i32>,
}

impl SpiritProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mood: Mood) -> Self {
        Self {
            id: SpiritId::new(id),
            name: name.into(),
            mood,
            relationships: BTreeMap::new(),
        }
    }

    /// Add a relationship, rejecting out-of-range scores.
    pub fn with_relationship(mut self, peer: impl Into<String>, score: i32) -> MatrixResult<Self> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(MatrixError::InvalidScore(score));
        }
        self.relationships.insert(SpiritId::new(peer), score);
        Ok(self)
    }

    /// Check every stored score. Profiles deserialized from outside go through this.
    pub fn validate(&self) -> MatrixResult<()> {
        for entry in self.relationships() {
            entry.tier()?;
        }
        Ok(())
    }

    pub fn relationships(&self) -> impl Iterator<Item = RelationshipEntry<'_>> {
        self.relationships
            .iter()
            .map(|(peer, score)| RelationshipEntry { peer, score: *score })
    }

    pub fn score_toward(&self, peer: &SpiritId) -> Option<i32> {
        self.relationships.get(peer).copied()
    }

    /// Tier toward a peer, `None` if the peer is unknown to this spirit.
    pub fn tier_toward(&self, peer: &SpiritId) -> MatrixResult<Option<RelationshipTier>> {
        self.score_toward(peer).map(tier).transpose()
    }

    /// Behavioral style toward a peer given the current mood.
    pub fn style_toward(&self, peer: &SpiritId) -> MatrixResult<Option<StyleToken>> {
        Ok(self.tier_toward(peer)?.map(|t| style(self.mood, t)))
    }
}
