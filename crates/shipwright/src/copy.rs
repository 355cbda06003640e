//! Pass-through copying for [`CopyRule`]s.
//!
//! Planning and executing are separate so the dev server can serve copied
//! files from memory without touching the output directory.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use shipwright_config::CopyRule;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::CopyError;

/// One file to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Expand every rule into concrete file copies.
///
/// A rule whose source is missing is skipped when it tolerates that, and is
/// an error otherwise.
pub fn plan_copy_rules(rules: &[CopyRule]) -> Result<Vec<PlannedCopy>, CopyError> {
    let mut plan = Vec::new();
    for rule in rules {
        let root = rule.source_root();
        if !root.exists() {
            if rule.no_error_on_missing {
                debug!(source = %root.display(), "copy source missing, skipping");
                continue;
            }
            return Err(CopyError::MissingSource(root.to_path_buf()));
        }

        let before = plan.len();
        match &rule.context {
            Some(context) => plan_glob(rule, context, &mut plan)?,
            None => plan_dir(rule, &mut plan)?,
        }

        if plan.len() == before && !rule.no_error_on_missing {
            return Err(CopyError::MissingSource(rule.from.clone()));
        }
    }
    Ok(plan)
}

fn plan_dir(rule: &CopyRule, plan: &mut Vec<PlannedCopy>) -> Result<(), CopyError> {
    if rule.from.is_file() {
        let name = rule.from.file_name().map(PathBuf::from).unwrap_or_default();
        plan.push(PlannedCopy {
            from: rule.from.clone(),
            to: rule.to.join(name),
        });
        return Ok(());
    }

    for entry in WalkDir::new(&rule.from).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_to(entry.path(), &rule.from);
        plan.push(PlannedCopy {
            from: entry.path().to_path_buf(),
            to: rule.to.join(relative),
        });
    }
    Ok(())
}

fn plan_glob(
    rule: &CopyRule,
    context: &Path,
    plan: &mut Vec<PlannedCopy>,
) -> Result<(), CopyError> {
    let raw = rule.from.to_string_lossy().replace('\\', "/");
    let pattern = Pattern::new(&raw).map_err(|source| CopyError::Pattern {
        pattern: raw.clone(),
        source,
    })?;
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };

    for entry in WalkDir::new(context).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_to(entry.path(), context);
        let candidate = relative.to_string_lossy().replace('\\', "/");
        if pattern.matches_with(&candidate, options) {
            trace!(file = %candidate, pattern = %raw, "copy glob matched");
            plan.push(PlannedCopy {
                from: entry.path().to_path_buf(),
                to: rule.to.join(relative),
            });
        }
    }
    Ok(())
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Copy planned files, creating parent directories. Returns the destinations.
pub fn execute_plan(plan: &[PlannedCopy]) -> Result<Vec<PathBuf>, CopyError> {
    let mut written = Vec::with_capacity(plan.len());
    for copy in plan {
        if let Some(parent) = copy.to.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CopyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(&copy.from, &copy.to).map_err(|source| CopyError::Io {
            path: copy.from.clone(),
            source,
        })?;
        written.push(copy.to.clone());
    }
    Ok(written)
}
