use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::cli::MergeArgs;
use crate::commands::locate::locate_empty;
use crate::model::{FilledValues, SchemaNode, SchemaPath, Segment};
use crate::util::{WorkLayout, read_json, write_json_pretty};

mod matcher;
mod patcher;

pub use matcher::match_path;
pub use patcher::{PatchError, patch};

pub fn run(args: MergeArgs) -> Result<()> {
    let layout = WorkLayout::new(&args.work_root);
    let document_path = args
        .document_path
        .unwrap_or_else(|| layout.document_path());
    let filled_objects_path = args
        .filled_objects_path
        .unwrap_or_else(|| layout.filled_objects_path());
    let output_path = args.output_path.unwrap_or_else(|| layout.output_path());

    let mut doc: SchemaNode = read_json(&document_path)?;
    let filled: FilledValues = read_json(&filled_objects_path)?;

    let paths = locate_empty(&doc);
    let outcome = apply_filled_values(&mut doc, &paths, &filled);

    write_json_pretty(&output_path, &doc)?;
    info!(path = %output_path.display(), "wrote updated document");
    info!(
        empty_leaves = paths.len(),
        updated = outcome.update_count,
        unmatched = outcome.unmatched.len(),
        patch_failures = outcome.patch_failures.len(),
        "merge completed"
    );

    Ok(())
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub update_count: usize,
    pub unmatched: Vec<SchemaPath>,
    pub patch_failures: Vec<(SchemaPath, PatchError)>,
}

/// Patches every empty-leaf path that has a matching filled value.
///
/// Paths carry their entity name; it is stripped before matching. A failed
/// patch is recorded and does not stop the remaining paths.
pub fn apply_filled_values(
    doc: &mut SchemaNode,
    paths: &[SchemaPath],
    filled: &FilledValues,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for path in paths {
        let matched = path
            .split_entity()
            .and_then(|(_, property_path)| match_path(&property_path, filled));

        let Some(key) = matched else {
            warn!(path = %path, "no matching filled value");
            outcome.unmatched.push(path.clone());
            continue;
        };

        let value = filled[key].clone();
        match patch(doc, path, value) {
            Ok(()) => {
                info!(path = %path, matched = %key, "updated empty leaf");
                outcome.update_count += 1;
            }
            Err(err) => {
                warn!(path = %path, error = %err, "failed to patch empty leaf");
                outcome.patch_failures.push((path.clone(), err));
            }
        }
    }

    outcome
}
