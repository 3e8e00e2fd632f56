use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Canonical fields known to the pipeline. Every other source column is either
/// projected away (performance table) or carried through verbatim under its
/// normalized label (substitution table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Player,
    Position,
    Minutes,
    FatigueScore,
    SubRecommendation,
    ActualImpact,
    PredictedImpact,
    Overperformance,
}

impl Field {
    pub const fn label(self) -> &'static str {
        match self {
            Field::Player => "Player",
            Field::Position => "Position",
            Field::Minutes => "Minutes",
            Field::FatigueScore => "Fatigue Score",
            Field::SubRecommendation => "Sub Recommendation",
            Field::ActualImpact => "Actual Impact",
            Field::PredictedImpact => "Predicted Impact",
            Field::Overperformance => "Overperformance",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub aliases: &'static [&'static str],
}

pub const PERFORMANCE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Player,
        aliases: &["player_name"],
    },
    FieldSpec {
        field: Field::ActualImpact,
        aliases: &["actual"],
    },
    FieldSpec {
        field: Field::PredictedImpact,
        aliases: &["predicted", "expected_impact"],
    },
];

pub const SUBSTITUTION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Player,
        aliases: &["player_name"],
    },
    FieldSpec {
        field: Field::Position,
        aliases: &["pos"],
    },
    FieldSpec {
        field: Field::Minutes,
        aliases: &["minutes_played", "mins"],
    },
    FieldSpec {
        field: Field::FatigueScore,
        aliases: &["fatigue"],
    },
    FieldSpec {
        field: Field::SubRecommendation,
        aliases: &["recommendation", "substitution_recommendation"],
    },
];

/// Labels the join and derivation introduce; a passthrough column may not reuse them.
pub const JOINED_FIELDS: [Field; 3] = [
    Field::ActualImpact,
    Field::PredictedImpact,
    Field::Overperformance,
];

/// Replaces `_` with a space, then capitalizes the first letter of every word
/// and lowercases the rest. A word starts after any non-alphabetic character.
/// Applying it twice yields the same label.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if at_word_start {
                // `ß` uppercases to "SS"; keep only the first letter capital.
                let mut upper = ch.to_uppercase();
                if let Some(first) = upper.next() {
                    out.push(first);
                }
                for rest in upper {
                    out.extend(rest.to_lowercase());
                }
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Where each declared field lives in a source's header row, plus the
/// undeclared columns in source order.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
    passthrough: Vec<(usize, String)>,
}

impl ColumnMap {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    /// Undeclared columns as `(source index, normalized label)`.
    pub fn passthrough(&self) -> &[(usize, String)] {
        &self.passthrough
    }
}

fn matches_spec(label: &str, spec: &FieldSpec) -> bool {
    if label == spec.field.label() {
        return true;
    }
    spec.aliases
        .iter()
        .any(|alias| normalize_label(alias) == label)
}

/// What happens to source columns that no declared field claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmapped {
    /// Carried into the output under their normalized label, so the label must
    /// be non-empty and unique.
    Keep,
    /// Projected away without inspection.
    Drop,
}

/// Resolves a header row against the declared field list. Every declared field
/// is required and may be claimed by one column only. Undeclared columns are
/// validated only when they are kept.
pub fn resolve_columns(
    path: &Path,
    headers: &[String],
    specs: &[FieldSpec],
    unmapped: Unmapped,
) -> Result<ColumnMap, PipelineError> {
    let mut map = ColumnMap::default();
    let mut kept_labels: HashMap<String, usize> = HashMap::new();

    for (idx, header) in headers.iter().enumerate() {
        let label = normalize_label(header.trim());

        if let Some(spec) = specs.iter().find(|spec| matches_spec(&label, spec)) {
            if let Some(prev) = map.indices.insert(spec.field, idx) {
                return Err(PipelineError::malformed(
                    path,
                    format!(
                        "columns {} and {} both map to `{}`",
                        prev + 1,
                        idx + 1,
                        spec.field
                    ),
                ));
            }
            continue;
        }

        if unmapped == Unmapped::Drop {
            continue;
        }
        if label.is_empty() {
            return Err(PipelineError::malformed(
                path,
                format!("column {} has an empty header", idx + 1),
            ));
        }
        if let Some(prev) = kept_labels.insert(label.clone(), idx) {
            return Err(PipelineError::malformed(
                path,
                format!(
                    "columns {} and {} both resolve to `{label}`",
                    prev + 1,
                    idx + 1
                ),
            ));
        }
        map.passthrough.push((idx, label));
    }

    for spec in specs {
        if !map.indices.contains_key(&spec.field) {
            return Err(PipelineError::malformed(
                path,
                format!("missing required column `{}`", spec.field),
            ));
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_replaces_underscores_and_title_cases() {
        assert_eq!(normalize_label("fatigue_score"), "Fatigue Score");
        assert_eq!(normalize_label("SUB_RECOMMENDATION"), "Sub Recommendation");
        assert_eq!(normalize_label("xg_per90"), "Xg Per90");
        assert_eq!(normalize_label("Overperformance"), "Overperformance");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "actual_impact",
            "Predicted Impact",
            "minutes__played",
            "o'neil_rating",
            "  padded_name ",
            "",
        ] {
            let once = normalize_label(raw);
            assert_eq!(normalize_label(&once), once, "raw={raw:?}");
        }
    }

    #[test]
    fn resolves_aliases_and_collects_passthrough() {
        let path = Path::new("subs.csv");
        let map = resolve_columns(
            path,
            &headers(&[
                "player",
                "pos",
                "minutes_played",
                "fatigue_score",
                "team_name",
                "recommendation",
            ]),
            SUBSTITUTION_FIELDS,
            Unmapped::Keep,
        )
        .expect("headers should resolve");
        assert_eq!(map.index(Field::Player), Some(0));
        assert_eq!(map.index(Field::Position), Some(1));
        assert_eq!(map.index(Field::Minutes), Some(2));
        assert_eq!(map.index(Field::SubRecommendation), Some(5));
        assert_eq!(map.passthrough(), &[(4, "Team Name".to_string())]);
    }

    #[test]
    fn missing_required_column_is_malformed() {
        let err = resolve_columns(
            Path::new("perf.csv"),
            &headers(&["Player", "Predicted Impact", "Drop Off"]),
            PERFORMANCE_FIELDS,
            Unmapped::Drop,
        )
        .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("Actual Impact"));
    }

    #[test]
    fn duplicate_normalized_headers_are_rejected() {
        let err = resolve_columns(
            Path::new("perf.csv"),
            &headers(&["Player", "actual_impact", "Actual Impact", "Predicted Impact"]),
            PERFORMANCE_FIELDS,
            Unmapped::Drop,
        )
        .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn dropped_columns_are_not_validated() {
        let map = resolve_columns(
            Path::new("perf.csv"),
            &headers(&["", "Player", "drop_off", "Drop Off", "Actual Impact", "Predicted Impact"]),
            PERFORMANCE_FIELDS,
            Unmapped::Drop,
        )
        .expect("unused columns should be skipped");
        assert_eq!(map.index(Field::Player), Some(1));
        assert_eq!(map.index(Field::ActualImpact), Some(4));
        assert!(map.passthrough().is_empty());
    }

    #[test]
    fn kept_columns_need_unique_non_empty_labels() {
        let base = ["Player", "Position", "Minutes", "Fatigue Score", "Sub Recommendation"];

        let mut blank = base.to_vec();
        blank.push("");
        let err = resolve_columns(
            Path::new("subs.csv"),
            &headers(&blank),
            SUBSTITUTION_FIELDS,
            Unmapped::Keep,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty header"));

        let mut twice = base.to_vec();
        twice.extend(["team_name", "Team Name"]);
        let err = resolve_columns(
            Path::new("subs.csv"),
            &headers(&twice),
            SUBSTITUTION_FIELDS,
            Unmapped::Keep,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Team Name"));
    }
}
