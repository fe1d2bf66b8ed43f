//! Analysis aggregation
//!
//! Routines of a kind and all its ancestors are collected (a kind may
//! replace an ancestor's routine of the same name), sorted by name, filtered
//! and run one after another. Each result is merged over the previous ones,
//! so later routines win on key collisions.

use crate::config::ConfigOverrides;
use crate::error::{MediaError, Result};
use crate::handler::{self, HandlerKind};
use crate::media_file::MediaFile;
use crate::result::AnalysisResult;
use crate::routines;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type RoutineFn = fn(&mut MediaFile) -> Result<AnalysisResult>;

/// A named analysis step.
#[derive(Clone, Copy)]
pub struct Routine {
    pub name: &'static str,
    pub run: RoutineFn,
}

impl std::fmt::Debug for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routine").field("name", &self.name).finish()
    }
}

/// Selects which routines run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineFilter {
    pub prefix: String,
    pub suffix: String,
    /// Explicit routine names. Every name must exist for the file's kind.
    pub names: Option<Vec<String>>,
}

impl Default for RoutineFilter {
    fn default() -> Self {
        Self {
            prefix: "analyze_".to_string(),
            suffix: String::new(),
            names: None,
        }
    }
}

impl RoutineFilter {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.suffix)
    }
}

/// Outcome of a single routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoutineOutcome {
    Ok { keys: usize },
    Skipped { reason: String },
}

/// Merged result plus what happened to each routine, in run order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub routines: Vec<(String, RoutineOutcome)>,
}

impl AnalysisReport {
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routines.iter().filter_map(|(name, outcome)| match outcome {
            RoutineOutcome::Skipped { reason } => Some((name.as_str(), reason.as_str())),
            RoutineOutcome::Ok { .. } => None,
        })
    }
}

/// Routines available to `kind`, sorted by name. A routine defined on a more
/// derived kind replaces the ancestor's routine of the same name.
pub fn routines(kind: HandlerKind) -> Vec<Routine> {
    let mut by_name: BTreeMap<&'static str, Routine> = BTreeMap::new();
    for ancestor in kind.lineage().into_iter().rev() {
        for routine in routines::routines_for(ancestor) {
            by_name.insert(routine.name, *routine);
        }
    }
    by_name.into_values().collect()
}

pub fn analyze(file: &mut MediaFile, filter: &RoutineFilter) -> Result<AnalysisResult> {
    Ok(analyze_report(file, filter)?.result)
}

pub fn analyze_report(file: &mut MediaFile, filter: &RoutineFilter) -> Result<AnalysisReport> {
    let available = routines(file.kind());
    analyze_routines(file, &available, filter)
}

/// Run an explicit routine table against `file`.
pub fn analyze_routines(
    file: &mut MediaFile,
    available: &[Routine],
    filter: &RoutineFilter,
) -> Result<AnalysisReport> {
    let mut selected: Vec<Routine> = match &filter.names {
        Some(names) => names
            .iter()
            .map(|name| {
                available
                    .iter()
                    .find(|r| r.name == name.as_str())
                    .copied()
                    .ok_or_else(|| MediaError::UnknownRoutine(name.clone()))
            })
            .collect::<Result<_>>()?,
        None => available.to_vec(),
    };
    selected.retain(|r| filter.matches(r.name));
    selected.sort_by_key(|r| r.name);
    selected.dedup_by_key(|r| r.name);

    let mut report = AnalysisReport::default();
    for routine in selected {
        debug!("Running {} on {}", routine.name, file.path().display());
        match (routine.run)(file) {
            Ok(fragment) => {
                report.routines.push((
                    routine.name.to_string(),
                    RoutineOutcome::Ok {
                        keys: fragment.len(),
                    },
                ));
                report.result.merge(fragment);
            }
            Err(e) if e.is_recoverable() => {
                warn!("{} skipped for {}: {}", routine.name, file.path().display(), e);
                report.routines.push((
                    routine.name.to_string(),
                    RoutineOutcome::Skipped {
                        reason: e.to_string(),
                    },
                ));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Resolve and analyze each path on the rayon pool. Output order matches
/// input order.
pub fn analyze_paths<P>(
    paths: &[P],
    overrides: &ConfigOverrides,
    filter: &RoutineFilter,
) -> Vec<(PathBuf, Result<AnalysisResult>)>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let outcome = handler::resolve_with(path, overrides).and_then(|mut file| {
                let result = analyze(&mut file, filter);
                file.close();
                result
            });
            (path.to_path_buf(), outcome)
        })
        .collect()
}
