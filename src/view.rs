use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::records::{MergedRecord, MergedTable, SubRecommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericColumn {
    Minutes,
    FatigueScore,
    ActualImpact,
    PredictedImpact,
    Overperformance,
}

impl NumericColumn {
    pub fn value(self, row: &MergedRecord) -> Option<f64> {
        match self {
            NumericColumn::Minutes => Some(row.minutes as f64),
            NumericColumn::FatigueScore => Some(row.fatigue_score),
            NumericColumn::ActualImpact => row.actual_impact,
            NumericColumn::PredictedImpact => row.predicted_impact,
            NumericColumn::Overperformance => row.overperformance(),
        }
    }
}

impl FromStr for NumericColumn {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        let key = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['_', ' ', '-'], "");
        match key.as_str() {
            "minutes" => Ok(NumericColumn::Minutes),
            "fatigue" | "fatiguescore" => Ok(NumericColumn::FatigueScore),
            "actual" | "actualimpact" => Ok(NumericColumn::ActualImpact),
            "predicted" | "predictedimpact" => Ok(NumericColumn::PredictedImpact),
            "overperformance" => Ok(NumericColumn::Overperformance),
            _ => Err(anyhow::anyhow!("unknown numeric column `{raw}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FatigueThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for FatigueThresholds {
    fn default() -> Self {
        Self {
            moderate: 1.0,
            high: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FatigueLevel {
    Low,
    Moderate,
    High,
}

impl FatigueLevel {
    pub fn classify(score: f64, thresholds: &FatigueThresholds) -> Self {
        if score < thresholds.moderate {
            FatigueLevel::Low
        } else if score < thresholds.high {
            FatigueLevel::Moderate
        } else {
            FatigueLevel::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FatigueLevel::Low => "Low",
            FatigueLevel::Moderate => "Moderate",
            FatigueLevel::High => "High",
        }
    }
}

/// Ordered selection of rows over a shared, immutable table. Every operation
/// returns a new view.
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    table: &'a MergedTable,
    indices: Vec<usize>,
}

impl<'a> TableView<'a> {
    pub fn new(table: &'a MergedTable) -> Self {
        Self {
            table,
            indices: (0..table.rows.len()).collect(),
        }
    }

    pub fn table(&self) -> &'a MergedTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a MergedRecord> + '_ {
        let table = self.table;
        self.indices.iter().map(move |&idx| &table.rows[idx])
    }

    fn retain(&self, keep: impl Fn(&MergedRecord) -> bool) -> Self {
        Self {
            table: self.table,
            indices: self
                .indices
                .iter()
                .copied()
                .filter(|&idx| keep(&self.table.rows[idx]))
                .collect(),
        }
    }

    pub fn filter_recommendation(&self, allowed: &[SubRecommendation]) -> Self {
        if allowed.is_empty() {
            return self.clone();
        }
        self.retain(|row| allowed.contains(&row.sub_recommendation))
    }

    pub fn filter_position(&self, needle: &str) -> Self {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        self.retain(|row| row.position.to_lowercase().contains(&needle))
    }

    /// Stable sort; rows without a value go last in either order.
    pub fn sort_by(&self, column: NumericColumn, order: SortOrder) -> Self {
        let mut indices = self.indices.clone();
        indices.sort_by(|&a, &b| {
            let va = column.value(&self.table.rows[a]);
            let vb = column.value(&self.table.rows[b]);
            compare_missing_last(va, vb, order)
        });
        Self {
            table: self.table,
            indices,
        }
    }

    pub fn top_by_overperformance(&self, n: usize) -> Self {
        let mut view = self
            .retain(|row| row.overperformance().is_some())
            .sort_by(NumericColumn::Overperformance, SortOrder::Descending);
        view.indices.truncate(n);
        view
    }

    pub fn fatigue_levels(
        &self,
        thresholds: &FatigueThresholds,
    ) -> Vec<(&'a MergedRecord, FatigueLevel)> {
        self.rows()
            .map(|row| (row, FatigueLevel::classify(row.fatigue_score, thresholds)))
            .collect()
    }

    pub fn summary(&self) -> ViewSummary {
        let mut by_recommendation = BTreeMap::new();
        for rec in SubRecommendation::ALL {
            by_recommendation.insert(rec.label().to_string(), 0usize);
        }
        let mut sum = 0.0;
        let mut defined = 0usize;
        let mut missing_impact = 0usize;

        for row in self.rows() {
            *by_recommendation
                .entry(row.sub_recommendation.label().to_string())
                .or_insert(0) += 1;
            match row.overperformance() {
                Some(v) => {
                    sum += v;
                    defined += 1;
                }
                None => missing_impact += 1,
            }
        }

        ViewSummary {
            rows: self.len(),
            by_recommendation,
            mean_overperformance: (defined > 0).then(|| sum / defined as f64),
            missing_impact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    pub rows: usize,
    pub by_recommendation: BTreeMap<String, usize>,
    pub mean_overperformance: Option<f64>,
    pub missing_impact: usize,
}

fn compare_missing_last(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.total_cmp(&b);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(player: &str, position: &str, rec: SubRecommendation, impact: Option<(f64, f64)>) -> MergedRecord {
        MergedRecord {
            player: player.to_string(),
            position: position.to_string(),
            minutes: 60,
            fatigue_score: 1.2,
            sub_recommendation: rec,
            extras: Vec::new(),
            actual_impact: impact.map(|(a, _)| a),
            predicted_impact: impact.map(|(_, p)| p),
        }
    }

    fn sample() -> MergedTable {
        MergedTable {
            extra_columns: Vec::new(),
            rows: vec![
                row("A", "Fwd", SubRecommendation::Monitor, Some((0.8, 0.5))),
                row("B", "Mid", SubRecommendation::SubEarly, None),
                row("C", "Def/Mid", SubRecommendation::KeepInGame, Some((0.2, 0.6))),
                row("D", "FWD", SubRecommendation::SubEarly, Some((1.0, 0.1))),
            ],
            loaded_at: Utc::now(),
        }
    }

    fn players(view: &TableView<'_>) -> Vec<String> {
        view.rows().map(|r| r.player.clone()).collect()
    }

    #[test]
    fn position_filter_is_case_insensitive_substring() {
        let table = sample();
        let view = TableView::new(&table).filter_position("mid");
        assert_eq!(players(&view), vec!["B", "C"]);
        let view = TableView::new(&table).filter_position("fwd");
        assert_eq!(players(&view), vec!["A", "D"]);
    }

    #[test]
    fn sort_puts_missing_last_in_both_orders() {
        let table = sample();
        let asc = TableView::new(&table).sort_by(NumericColumn::Overperformance, SortOrder::Ascending);
        assert_eq!(players(&asc), vec!["C", "A", "D", "B"]);
        let desc = TableView::new(&table).sort_by(NumericColumn::Overperformance, SortOrder::Descending);
        assert_eq!(players(&desc), vec!["D", "A", "C", "B"]);
    }

    #[test]
    fn top_n_skips_missing() {
        let table = sample();
        let top = TableView::new(&table).top_by_overperformance(10);
        assert_eq!(players(&top), vec!["D", "A", "C"]);
        let top = TableView::new(&table).top_by_overperformance(1);
        assert_eq!(players(&top), vec!["D"]);
    }

    #[test]
    fn fatigue_buckets() {
        let t = FatigueThresholds::default();
        assert_eq!(FatigueLevel::classify(0.0, &t), FatigueLevel::Low);
        assert_eq!(FatigueLevel::classify(1.0, &t), FatigueLevel::Moderate);
        assert_eq!(FatigueLevel::classify(2.5, &t), FatigueLevel::High);
    }

    #[test]
    fn summary_counts() {
        let table = sample();
        let summary = TableView::new(&table)
            .filter_recommendation(&[SubRecommendation::SubEarly])
            .summary();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.by_recommendation["Sub Early"], 2);
        assert_eq!(summary.by_recommendation["Monitor"], 0);
        assert_eq!(summary.missing_impact, 1);
        assert!((summary.mean_overperformance.unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn column_names_parse() {
        assert_eq!("fatigue_score".parse::<NumericColumn>().unwrap(), NumericColumn::FatigueScore);
        assert_eq!("Overperformance".parse::<NumericColumn>().unwrap(), NumericColumn::Overperformance);
        assert!("player".parse::<NumericColumn>().is_err());
    }
}
