//! Types shared by the scoreboard client, the reconciler and the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const MIN_MEMBERS: usize = 1;
pub const MAX_MEMBERS: usize = 5;

/// A team as served by the scoreboard backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Most recent modification time (falls back to creation time)
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Backend ids come as either JSON strings or integers
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Single-step rank movement between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Compare a rank with the previously observed one (lower rank = better)
    pub fn between(current_rank: u32, previous_rank: u32) -> Self {
        match current_rank.cmp(&previous_rank) {
            std::cmp::Ordering::Less => Self::Up,
            std::cmp::Ordering::Greater => Self::Down,
            std::cmp::Ordering::Equal => Self::Stable,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Stable => "→",
        }
    }
}

/// A team placed on the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTeam {
    #[serde(flatten)]
    pub team: Team,
    pub rank: u32,
    pub previous_rank: u32,
    pub trend: Trend,
}

/// Payload for creating or fully replacing a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDraft {
    pub name: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub score: u64,
}

impl TeamDraft {
    /// Trim the name, drop blank members and check the member bounds.
    pub fn normalized(&self) -> Result<Self, String> {
        let name = normalize_name(&self.name)?;
        let members = normalize_members(&self.members)?;
        Ok(Self {
            name,
            members,
            score: self.score,
        })
    }
}

/// Partial update; absent fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
}

impl TeamPatch {
    pub fn score(score: u64) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.members.is_none() && self.score.is_none()
    }

    pub fn normalized(&self) -> Result<Self, String> {
        if self.is_empty() {
            return Err("Nothing to update".into());
        }
        let name = self.name.as_deref().map(normalize_name).transpose()?;
        let members = self
            .members
            .as_deref()
            .map(normalize_members)
            .transpose()?;
        Ok(Self {
            name,
            members,
            score: self.score,
        })
    }
}

fn normalize_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Team name is required".into());
    }
    Ok(name.to_string())
}

fn normalize_members(members: &[String]) -> Result<Vec<String>, String> {
    let members: Vec<String> = members
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if members.len() < MIN_MEMBERS {
        return Err(format!("At least {} member is required", MIN_MEMBERS));
    }
    if members.len() > MAX_MEMBERS {
        return Err(format!("At most {} members are allowed", MAX_MEMBERS));
    }
    Ok(members)
}
