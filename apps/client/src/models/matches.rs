use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the marketplace an entity identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Seeker,
    Job,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Seeker => "seeker",
            EntityType::Job => "job",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScores {
    pub experience: f64,
    pub development: f64,
    pub personality: f64,
}

/// One match above the service's threshold.
/// Seeker lookups return job openings (`job_id`, `company`, `title`);
/// job lookups return seekers (`seeker_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub seeker_id: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub scores: MatchScores,
    pub average_score: f64,
}

impl MatchEntry {
    /// Identifier of the matched counterpart, whichever side it is.
    pub fn counterpart_id(&self) -> Option<&str> {
        self.job_id.as_deref().or(self.seeker_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchEntry>,
    pub visualization_url: String,
}
