use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::schema::{
    ColumnMap, Field, JOINED_FIELDS, PERFORMANCE_FIELDS, SUBSTITUTION_FIELDS, Unmapped,
    normalize_label, resolve_columns,
};
use crate::source::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubRecommendation {
    #[serde(rename = "Sub Early")]
    SubEarly,
    #[serde(rename = "Monitor")]
    Monitor,
    #[serde(rename = "Keep In Game")]
    KeepInGame,
}

impl SubRecommendation {
    pub const ALL: [SubRecommendation; 3] = [
        SubRecommendation::SubEarly,
        SubRecommendation::Monitor,
        SubRecommendation::KeepInGame,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubRecommendation::SubEarly => "Sub Early",
            SubRecommendation::Monitor => "Monitor",
            SubRecommendation::KeepInGame => "Keep In Game",
        }
    }
}

impl fmt::Display for SubRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecommendation(pub String);

impl fmt::Display for UnknownRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sub recommendation `{}`", self.0)
    }
}

impl std::error::Error for UnknownRecommendation {}

impl FromStr for SubRecommendation {
    type Err = UnknownRecommendation;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(raw.trim());
        SubRecommendation::ALL
            .into_iter()
            .find(|rec| rec.label() == label)
            .ok_or_else(|| UnknownRecommendation(raw.to_string()))
    }
}

/// Performance row after projection: only the key and the two impact fields survive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformanceRecord {
    pub player: String,
    pub actual_impact: Option<f64>,
    pub predicted_impact: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRecord {
    pub player: String,
    pub position: String,
    pub minutes: u32,
    pub fatigue_score: f64,
    pub sub_recommendation: SubRecommendation,
    /// Cells of the undeclared columns, aligned with `SubstitutionTable::extra_columns`.
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    pub extra_columns: Vec<String>,
    pub rows: Vec<SubstitutionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub player: String,
    pub position: String,
    pub minutes: u32,
    pub fatigue_score: f64,
    pub sub_recommendation: SubRecommendation,
    pub extras: Vec<String>,
    pub actual_impact: Option<f64>,
    pub predicted_impact: Option<f64>,
}

impl MergedRecord {
    pub fn overperformance(&self) -> Option<f64> {
        Some(self.actual_impact? - self.predicted_impact?)
    }

    pub fn has_impact(&self) -> bool {
        self.actual_impact.is_some() && self.predicted_impact.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MergedTable {
    pub extra_columns: Vec<String>,
    pub rows: Vec<MergedRecord>,
    pub loaded_at: DateTime<Utc>,
}

impl MergedTable {
    /// Full normalized header set in output order.
    pub fn columns(&self) -> Vec<String> {
        let mut out = [
            Field::Player,
            Field::Position,
            Field::Minutes,
            Field::FatigueScore,
            Field::SubRecommendation,
        ]
        .iter()
        .map(|f| f.label().to_string())
        .collect::<Vec<_>>();
        out.extend(self.extra_columns.iter().cloned());
        out.extend(JOINED_FIELDS.iter().map(|f| f.label().to_string()));
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, player: &str) -> Option<&MergedRecord> {
        self.rows.iter().find(|row| row.player == player)
    }
}

pub fn parse_performance(table: &RawTable) -> Result<Vec<PlayerPerformanceRecord>, PipelineError> {
    let path = table.origin.as_path();
    let map = resolve_columns(path, &table.headers, PERFORMANCE_FIELDS, Unmapped::Drop)?;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(table.rows.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let row_no = idx + 1;
        let player = required_key(path, row, &map, row_no)?;
        if !seen.insert(player.clone()) {
            return Err(PipelineError::malformed(
                path,
                format!("row {row_no}: duplicate player `{player}`"),
            ));
        }
        out.push(PlayerPerformanceRecord {
            actual_impact: optional_f64(path, row, &map, Field::ActualImpact, row_no)?,
            predicted_impact: optional_f64(path, row, &map, Field::PredictedImpact, row_no)?,
            player,
        });
    }

    Ok(out)
}

pub fn parse_substitutions(table: &RawTable) -> Result<SubstitutionTable, PipelineError> {
    let path = table.origin.as_path();
    let map = resolve_columns(path, &table.headers, SUBSTITUTION_FIELDS, Unmapped::Keep)?;

    for (_, label) in map.passthrough() {
        if JOINED_FIELDS.iter().any(|f| f.label() == label.as_str()) {
            return Err(PipelineError::malformed(
                path,
                format!("column `{label}` collides with a joined column"),
            ));
        }
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(table.rows.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let row_no = idx + 1;
        let player = required_key(path, row, &map, row_no)?;
        if !seen.insert(player.clone()) {
            return Err(PipelineError::malformed(
                path,
                format!("row {row_no}: duplicate player `{player}`"),
            ));
        }

        let minutes = parse_minutes(cell(row, &map, Field::Minutes)).ok_or_else(|| {
            PipelineError::malformed(
                path,
                format!(
                    "row {row_no}: `Minutes` must be a non-negative integer, got `{}`",
                    cell(row, &map, Field::Minutes)
                ),
            )
        })?;

        let fatigue_raw = cell(row, &map, Field::FatigueScore);
        let fatigue_score = fatigue_raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| {
                PipelineError::malformed(
                    path,
                    format!("row {row_no}: `Fatigue Score` must be >= 0, got `{fatigue_raw}`"),
                )
            })?;

        let sub_recommendation = cell(row, &map, Field::SubRecommendation)
            .parse::<SubRecommendation>()
            .map_err(|err| PipelineError::malformed(path, format!("row {row_no}: {err}")))?;

        rows.push(SubstitutionRecord {
            player,
            position: cell(row, &map, Field::Position).to_string(),
            minutes,
            fatigue_score,
            sub_recommendation,
            extras: map
                .passthrough()
                .iter()
                .map(|(col, _)| row.get(*col).cloned().unwrap_or_default())
                .collect(),
        });
    }

    Ok(SubstitutionTable {
        extra_columns: map.passthrough().iter().map(|(_, l)| l.clone()).collect(),
        rows,
    })
}

fn cell<'a>(row: &'a [String], map: &ColumnMap, field: Field) -> &'a str {
    map.index(field)
        .and_then(|idx| row.get(idx))
        .map(|s| s.as_str())
        .unwrap_or("")
}

// The key is taken verbatim; only an all-blank value is rejected.
fn required_key(
    path: &Path,
    row: &[String],
    map: &ColumnMap,
    row_no: usize,
) -> Result<String, PipelineError> {
    let raw = cell(row, map, Field::Player);
    if raw.trim().is_empty() {
        return Err(PipelineError::malformed(
            path,
            format!("row {row_no}: blank `Player`"),
        ));
    }
    Ok(raw.to_string())
}

fn optional_f64(
    path: &Path,
    row: &[String],
    map: &ColumnMap,
    field: Field,
    row_no: usize,
) -> Result<Option<f64>, PipelineError> {
    let raw = cell(row, map, field).trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PipelineError::malformed(
            path,
            format!("row {row_no}: `{field}` is not numeric: `{raw}`"),
        )),
    }
}

fn parse_minutes(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
