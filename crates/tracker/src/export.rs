//! Leaderboard export (CSV / JSON)

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use crate::types::RankedTeam;

const CSV_HEADERS: [&str; 6] = ["Rank", "Team", "Members", "Score", "Created", "Updated"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// `leaderboard-YYYY-MM-DD.<ext>`
    pub fn default_file_name(&self, date: NaiveDate) -> String {
        format!("leaderboard-{}.{}", date.format("%Y-%m-%d"), self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown export format '{}' (expected csv or json)", other),
        }
    }
}

pub fn export(leaderboard: &[RankedTeam], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => to_csv(leaderboard),
        ExportFormat::Json => to_json(leaderboard),
    }
}

pub fn to_json(leaderboard: &[RankedTeam]) -> Result<String> {
    Ok(serde_json::to_string_pretty(leaderboard)?)
}

pub fn to_csv(leaderboard: &[RankedTeam]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for entry in leaderboard {
        writer.write_record([
            entry.rank.to_string(),
            entry.team.name.clone(),
            entry.team.members.join("; "),
            entry.team.score.to_string(),
            format_timestamp(entry.team.created_at),
            format_timestamp(entry.team.updated_at),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}
