//! Mood and behavioral style lookup

use crate::error::MatrixError;
use crate::tier::RelationshipTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete emotional-state tag of a spirit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Positive,
    Focused,
    Low,
    Defensive,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Neutral,
        Mood::Positive,
        Mood::Focused,
        Mood::Low,
        Mood::Defensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Positive => "positive",
            Mood::Focused => "focused",
            Mood::Low => "low",
            Mood::Defensive => "defensive",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| MatrixError::UnknownMood(s.to_string()))
    }
}

/// Behavioral style token rendered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StyleToken(&'static str);

impl StyleToken {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StyleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Behavioral style for a mood toward a peer in the given tier.
pub fn style(mood: Mood, tier: RelationshipTier) -> StyleToken {
    use Mood as M;
    use RelationshipTier as T;

    let token = match (tier, mood) {
        (T::Bonded, M::Positive) => "playful banter",
        (T::Bonded, M::Neutral) => "calm sync",
        (T::Bonded, M::Focused) => "deep collab",
        (T::Bonded, M::Low) => "supportive concern",
        (T::Bonded, M::Defensive) => "protective",

        (T::Friendly, M::Positive) => "uplifting",
        (T::Friendly, M::Neutral) => "cooperative",
        (T::Friendly, M::Focused) => "efficient",
        (T::Friendly, M::Low) => "encouraging",
        (T::Friendly, M::Defensive) => "careful pushback",

        (T::Neutral, M::Positive) => "polite",
        (T::Neutral, M::Neutral) => "transactional",
        (T::Neutral, M::Focused) => "minimal",
        (T::Neutral, M::Low) => "distant",
        (T::Neutral, M::Defensive) => "guarded",

        (T::Tense, M::Positive) => "sarcastic",
        (T::Tense, M::Neutral) => "cold",
        (T::Tense, M::Focused) => "rivalrous",
        (T::Tense, M::Low) => "bitter",
        (T::Tense, M::Defensive) => "openly critical",

        (T::Antagonistic, M::Positive) => "mocking",
        (T::Antagonistic, M::Neutral) => "dismissive",
        (T::Antagonistic, M::Focused) => "sabotage risk",
        (T::Antagonistic, M::Low) => "toxic silence",
        (T::Antagonistic, M::Defensive) => "aggressive",
    };

    StyleToken(token)
}
