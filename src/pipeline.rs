use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::records::{
    MergedRecord, MergedTable, PlayerPerformanceRecord, SubstitutionTable, parse_performance,
    parse_substitutions,
};
use crate::source::{RawTable, load_table};

/// Identity of a file-based source: canonical path plus the metadata that
/// changes when the file is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceId {
    /// Stats `path` without reading its contents.
    ///
    /// A rewrite that keeps the byte length and lands within the filesystem's
    /// mtime resolution (or restores the old mtime) yields an equal identity,
    /// so the stale cached table is returned. Call
    /// [`DataPipeline::invalidate`] after such in-place edits.
    pub fn stat(path: &Path) -> Result<Self, PipelineError> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::not_found(path));
            }
            Err(err) => {
                return Err(PipelineError::malformed(path, format!("unreadable: {err}")));
            }
        };
        if !meta.is_file() {
            return Err(PipelineError::malformed(path, "not a regular file"));
        }
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(Self {
            path: canonical,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

type CacheKey = (SourceId, SourceId);

/// Loads, joins and derives the merged table, memoizing one result per pair of
/// source identities for the lifetime of the instance.
#[derive(Debug, Default)]
pub struct DataPipeline {
    cache: HashMap<CacheKey, Arc<MergedTable>>,
}

impl DataPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        performance: &Path,
        substitutions: &Path,
    ) -> Result<Arc<MergedTable>, PipelineError> {
        let key = (SourceId::stat(performance)?, SourceId::stat(substitutions)?);
        if let Some(hit) = self.cache.get(&key) {
            debug!(
                performance = %performance.display(),
                substitutions = %substitutions.display(),
                "merged table cache hit"
            );
            return Ok(Arc::clone(hit));
        }

        debug!(
            performance = %performance.display(),
            substitutions = %substitutions.display(),
            "merged table cache miss"
        );
        let perf = load_table(performance)?;
        let subs = load_table(substitutions)?;
        let merged = Arc::new(merge_tables(&perf, &subs)?);
        info!(
            rows = merged.len(),
            unmatched = merged.rows.iter().filter(|r| !r.has_impact()).count(),
            "merged substitution and performance tables"
        );
        self.cache.insert(key, Arc::clone(&merged));
        Ok(merged)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

/// Typed parsing plus the join, for tables that are already in memory.
pub fn merge_tables(
    performance: &RawTable,
    substitutions: &RawTable,
) -> Result<MergedTable, PipelineError> {
    let perf = parse_performance(performance)?;
    let subs = parse_substitutions(substitutions)?;
    Ok(left_join(&perf, subs))
}

/// Left-outer join of the substitution rows with the projected performance
/// rows. Keys compare by exact string equality.
pub fn left_join(performance: &[PlayerPerformanceRecord], subs: SubstitutionTable) -> MergedTable {
    let by_player = performance
        .iter()
        .map(|p| (p.player.as_str(), p))
        .collect::<HashMap<_, _>>();

    let rows = subs
        .rows
        .into_iter()
        .map(|sub| {
            let matched = by_player.get(sub.player.as_str());
            MergedRecord {
                actual_impact: matched.and_then(|p| p.actual_impact),
                predicted_impact: matched.and_then(|p| p.predicted_impact),
                player: sub.player,
                position: sub.position,
                minutes: sub.minutes,
                fatigue_score: sub.fatigue_score,
                sub_recommendation: sub.sub_recommendation,
                extras: sub.extras,
            }
        })
        .collect();

    MergedTable {
        extra_columns: subs.extra_columns,
        rows,
        loaded_at: Utc::now(),
    }
}
