//! Classification result types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Genre label, in the classifier's output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    /// Blues
    Blues,
    /// Classical
    Classical,
    /// Country
    Country,
    /// Disco
    Disco,
    /// Hip-hop
    Hiphop,
    /// Jazz
    Jazz,
    /// Metal
    Metal,
    /// Pop
    Pop,
    /// Reggae
    Reggae,
    /// Rock
    Rock,
}

/// All labels; index `i` matches probability `i` of the model output
pub const GENRES: [Genre; 10] = [
    Genre::Blues,
    Genre::Classical,
    Genre::Country,
    Genre::Disco,
    Genre::Hiphop,
    Genre::Jazz,
    Genre::Metal,
    Genre::Pop,
    Genre::Reggae,
    Genre::Rock,
];

impl Genre {
    /// Lowercase label as used in responses (e.g. `"hiphop"`)
    pub fn label(&self) -> &'static str {
        match self {
            Genre::Blues => "blues",
            Genre::Classical => "classical",
            Genre::Country => "country",
            Genre::Disco => "disco",
            Genre::Hiphop => "hiphop",
            Genre::Jazz => "jazz",
            Genre::Metal => "metal",
            Genre::Pop => "pop",
            Genre::Reggae => "reggae",
            Genre::Rock => "rock",
        }
    }

    /// Position in the model's probability vector
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Label at position `index` of the model's probability vector
    pub fn from_index(index: usize) -> Option<Genre> {
        GENRES.get(index).copied()
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GENRES
            .iter()
            .find(|g| g.label().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown genre: {}", s))
    }
}

/// One classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Most probable genre
    pub top: Genre,

    /// Wall-clock time from request start to classification, in milliseconds
    pub latency_ms: f32,

    /// Probability per genre
    pub probs: BTreeMap<Genre, f32>,
}

impl Prediction {
    /// Probability assigned to `genre`
    pub fn probability(&self, genre: Genre) -> f32 {
        self.probs.get(&genre).copied().unwrap_or(0.0)
    }

    /// Genres sorted by probability, highest first
    pub fn ranked(&self) -> Vec<(Genre, f32)> {
        let mut ranked: Vec<(Genre, f32)> = self.probs.iter().map(|(&g, &p)| (g, p)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Response to one streamed chunk
///
/// Serializes as `{"ready": false, "needed_samples": N}` while the session
/// is filling, and as the prediction fields plus `"ready": true` after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkResponse {
    /// Whether a prediction was made
    pub ready: bool,

    /// Samples still needed (only when not ready)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needed_samples: Option<usize>,

    /// Prediction (only when ready)
    #[serde(flatten)]
    pub prediction: Option<Prediction>,
}

impl ChunkResponse {
    /// Not enough audio buffered yet
    pub fn not_ready(needed_samples: usize) -> Self {
        Self {
            ready: false,
            needed_samples: Some(needed_samples),
            prediction: None,
        }
    }

    /// A prediction for the latest window
    pub fn ready(prediction: Prediction) -> Self {
        Self {
            ready: true,
            needed_samples: None,
            prediction: Some(prediction),
        }
    }
}
