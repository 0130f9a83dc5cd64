use std::collections::HashMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::cli::ResolveArgs;
use crate::commands::locate::locate_empty;
use crate::model::{FilledValues, SchemaNode, SchemaPath};
use crate::util::{WorkLayout, read_json, write_json_pretty};

mod classify;
mod markup;

pub use markup::{MarkupArchive, MarkupResolver, MarkupSnapshot, snapshot_file_name};

use markup::cell_text;

pub fn run(args: ResolveArgs) -> Result<()> {
    let layout = WorkLayout::new(&args.work_root);
    let models_dir = args.models_dir.unwrap_or_else(|| layout.models_dir());
    let filled_objects_path = args
        .filled_objects_path
        .unwrap_or_else(|| layout.filled_objects_path());

    let paths = match args.from_document {
        Some(document_path) => {
            let doc: SchemaNode = read_json(&document_path)?;
            locate_empty(&doc)
        }
        None => {
            let empty_objects_path = args
                .empty_objects_path
                .unwrap_or_else(|| layout.empty_objects_path());
            load_empty_paths(&empty_objects_path)?
        }
    };

    info!(
        models_dir = %models_dir.display(),
        empty_leaves = paths.len(),
        "resolving empty leaves"
    );

    let resolver = MarkupResolver::new()?;
    let mut archive = MarkupArchive::from_dir(&models_dir);
    let outcome = resolve_all(&paths, &mut archive, &resolver)?;

    write_json_pretty(&filled_objects_path, &outcome.filled)?;
    info!(path = %filled_objects_path.display(), "wrote filled-objects manifest");
    info!(
        resolved = outcome.resolved_count,
        skipped = outcome.skipped.len(),
        keys = outcome.filled.len(),
        "resolve completed"
    );

    Ok(())
}

fn load_empty_paths(path: &Path) -> Result<Vec<SchemaPath>> {
    let manifest: FilledValues = read_json(path)?;
    manifest
        .keys()
        .map(|key| {
            key.parse::<SchemaPath>()
                .with_context(|| format!("invalid path key in {}", path.display()))
        })
        .collect()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    NoPropertyPath,
    MissingSnapshot,
    UnresolvedType,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPropertyPath => "no property path below entity",
            Self::MissingSnapshot => "markup snapshot missing",
            Self::UnresolvedType => "type not found in markup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    pub path: SchemaPath,
    pub reason: SkipReason,
}

impl SkippedPath {
    pub fn describe(&self) -> String {
        match (self.reason, self.path.split_entity()) {
            (SkipReason::MissingSnapshot, Some((entity, _))) => format!(
                "{}: {} ({})",
                self.path,
                self.reason.as_str(),
                snapshot_file_name(entity)
            ),
            _ => format!("{}: {}", self.path, self.reason.as_str()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolveOutcome {
    pub filled: FilledValues,
    pub resolved_count: usize,
    pub skipped: Vec<SkippedPath>,
}

/// Resolves each empty-leaf path against the markup of its entity.
///
/// Results are keyed by the path with the entity name stripped. When two
/// paths share a key the first resolved value is kept.
pub fn resolve_all(
    paths: &[SchemaPath],
    archive: &mut MarkupArchive,
    resolver: &MarkupResolver,
) -> Result<ResolveOutcome> {
    let mut outcome = ResolveOutcome::default();

    for path in paths {
        let Some((entity, property_path)) = path.split_entity() else {
            outcome.skip(path, SkipReason::NoPropertyPath);
            continue;
        };

        let names = property_path.property_names();
        if names.is_empty() {
            outcome.skip(path, SkipReason::NoPropertyPath);
            continue;
        }

        let Some(snapshot) = archive.snapshot(entity)? else {
            warn!(
                path = %path,
                entity = %entity,
                file = %snapshot_file_name(entity),
                "markup snapshot missing; skipping"
            );
            outcome.skip(path, SkipReason::MissingSnapshot);
            continue;
        };

        let Some(value) = resolver.resolve_type(snapshot, &names) else {
            warn!(path = %path, "could not resolve type from markup; skipping");
            outcome.skip(path, SkipReason::UnresolvedType);
            continue;
        };

        // Trailing indices address elements, so drop the matching array levels.
        let value = value.peel_arrays(property_path.trailing_index_count());

        match outcome.filled.entry(property_path.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(existing) if existing.get() != &value => {
                debug!(
                    key = %existing.key(),
                    path = %path,
                    "filled key already resolved; keeping first value"
                );
            }
            Entry::Occupied(_) => {}
        }
        outcome.resolved_count += 1;
    }

    Ok(outcome)
}

impl ResolveOutcome {
    fn skip(&mut self, path: &SchemaPath, reason: SkipReason) {
        if reason == SkipReason::NoPropertyPath {
            warn!(path = %path, reason = reason.as_str(), "skipping empty leaf");
        }
        self.skipped.push(SkippedPath {
            path: path.clone(),
            reason,
        });
    }
}
