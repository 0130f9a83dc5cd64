use anyhow::Result;
use tracing::{info, warn};

use crate::cli::RepairArgs;
use crate::commands::locate::locate_empty;
use crate::commands::merge::apply_filled_values;
use crate::commands::resolve::{MarkupArchive, MarkupResolver, SkippedPath, resolve_all};
use crate::model::{FilledValues, RepairCounts, RepairReport, SchemaNode};
use crate::util::{WorkLayout, now_utc_string, read_json, sha256_file, write_json_pretty};

pub fn run(args: RepairArgs) -> Result<()> {
    let layout = WorkLayout::new(&args.work_root);
    let document_path = args
        .document_path
        .unwrap_or_else(|| layout.document_path());
    let models_dir = args.models_dir.unwrap_or_else(|| layout.models_dir());
    let output_path = args.output_path.unwrap_or_else(|| layout.output_path());

    info!(
        document = %document_path.display(),
        models_dir = %models_dir.display(),
        "starting repair"
    );

    let doc: SchemaNode = read_json(&document_path)?;
    let resolver = MarkupResolver::new()?;
    let mut archive = MarkupArchive::from_dir(&models_dir);

    let outcome = repair(doc, &mut archive, &resolver)?;

    write_json_pretty(&output_path, &outcome.document)?;
    info!(path = %output_path.display(), "wrote updated document");

    if let Some(filled_objects_path) = &args.filled_objects_path {
        write_json_pretty(filled_objects_path, &outcome.filled)?;
        info!(path = %filled_objects_path.display(), "wrote filled-objects manifest");
    }

    if !args.no_report {
        let report_path = args.report_path.unwrap_or_else(|| layout.report_path());
        let report = RepairReport {
            manifest_version: 1,
            generated_at: now_utc_string(),
            document_path: document_path.display().to_string(),
            document_sha256: sha256_file(&document_path)?,
            models_dir: models_dir.display().to_string(),
            output_path: output_path.display().to_string(),
            counts: outcome.counts.clone(),
            unresolved_paths: outcome.unresolved.clone(),
            warnings: outcome.warnings.clone(),
        };
        write_json_pretty(&report_path, &report)?;
        info!(path = %report_path.display(), "wrote repair report");
    }

    for path in &outcome.unresolved {
        warn!(path = %path, "empty leaf left unresolved");
    }
    info!(
        empty_leaves = outcome.counts.empty_leaves,
        resolved = outcome.counts.resolved,
        patched = outcome.counts.patched,
        unresolved = outcome.unresolved.len(),
        "repair completed"
    );

    Ok(())
}

#[derive(Debug)]
pub struct RepairOutcome {
    pub document: SchemaNode,
    pub filled: FilledValues,
    pub counts: RepairCounts,
    pub unresolved: Vec<String>,
    pub warnings: Vec<String>,
}

/// Fills empty leaves of `doc` with types inferred from the markup archive.
///
/// Only unreadable snapshots are fatal. Leaves that cannot be resolved,
/// matched or patched stay empty and are listed in `unresolved`.
pub fn repair(
    mut doc: SchemaNode,
    archive: &mut MarkupArchive,
    resolver: &MarkupResolver,
) -> Result<RepairOutcome> {
    let empty_paths = locate_empty(&doc);
    let resolved = resolve_all(&empty_paths, archive, resolver)?;

    let mut warnings: Vec<String> = resolved
        .skipped
        .iter()
        .map(SkippedPath::describe)
        .collect();

    // No patch has been applied yet, so the second pass sees the same leaves.
    let patch_paths = locate_empty(&doc);
    let merged = apply_filled_values(&mut doc, &patch_paths, &resolved.filled);

    warnings.extend(
        merged
            .patch_failures
            .iter()
            .map(|(path, err)| format!("{path}: patch failed: {err}")),
    );

    let mut unresolved: Vec<String> = merged
        .unmatched
        .iter()
        .chain(merged.patch_failures.iter().map(|(path, _)| path))
        .map(ToString::to_string)
        .collect();
    unresolved.sort();

    let counts = RepairCounts {
        empty_leaves: empty_paths.len(),
        resolved: resolved.resolved_count,
        patched: merged.update_count,
        unmatched: merged.unmatched.len(),
        patch_failures: merged.patch_failures.len(),
    };

    Ok(RepairOutcome {
        document: doc,
        filled: resolved.filled,
        counts,
        unresolved,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const WORK_MARKUP: &str = r#"
    <span class="model-box">
      <span class="model-title">Work</span>
      <table class="model"><tbody>
        <tr class="property-row">
          <td>author</td>
          <td><span class="model"><table class="model"><tbody>
            <tr class="property-row"><td>&lt;*&gt;</td><td><span class="prop-type">string</span></td></tr>
          </tbody></table></span></td>
        </tr>
      </tbody></table>
    </span>
    "#;

    fn node(value: serde_json::Value) -> SchemaNode {
        serde_json::from_value(value).expect("fixture should be a schema document")
    }

    fn run_repair(doc: SchemaNode, archive: &mut MarkupArchive) -> RepairOutcome {
        let resolver = MarkupResolver::new().expect("resolver should compile");
        repair(doc, archive, &resolver).expect("repair should succeed")
    }

    #[test]
    fn wildcard_mapping_of_string_fills_the_leaf() {
        let mut archive = MarkupArchive::from_markup([("Work", WORK_MARKUP)]);
        let outcome = run_repair(node(json!({"Work": {"author": {}}})), &mut archive);

        assert_eq!(outcome.document, node(json!({"Work": {"author": "string"}})));
        assert_eq!(outcome.counts.patched, 1);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn leaves_without_snapshot_stay_empty() {
        let mut archive = MarkupArchive::from_markup([("Work", WORK_MARKUP)]);
        let doc = node(json!({"Work": {"author": {}}, "Member": {"id": {}}}));
        let outcome = run_repair(doc, &mut archive);

        assert_eq!(
            outcome.document,
            node(json!({"Work": {"author": "string"}, "Member": {"id": {}}}))
        );
        assert_eq!(outcome.counts.patched, 1);
        assert_eq!(outcome.counts.empty_leaves, 2);
        assert_eq!(outcome.counts.resolved, 1);
        assert_eq!(outcome.counts.unmatched, 1);
        assert_eq!(outcome.unresolved, vec!["Member.id".to_string()]);
        assert_eq!(
            outcome.warnings,
            vec!["Member.id: markup snapshot missing (Member.html)".to_string()]
        );
    }

    #[test]
    fn repeated_runs_on_the_same_input_agree() {
        let doc = node(json!({"Work": {"author": {}, "title": {}}, "Member": {"id": {}}}));

        let mut first_archive = MarkupArchive::from_markup([("Work", WORK_MARKUP)]);
        let first = run_repair(doc.clone(), &mut first_archive);
        let mut second_archive = MarkupArchive::from_markup([("Work", WORK_MARKUP)]);
        let second = run_repair(doc, &mut second_archive);

        assert_eq!(first.counts.patched, second.counts.patched);
        assert_eq!(first.unresolved, second.unresolved);
        assert_eq!(first.unresolved, vec!["Member.id", "Work.title"]);
    }

    #[test]
    fn run_writes_document_filled_map_and_report() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let layout = WorkLayout::new(temp.path());
        fs::create_dir_all(layout.models_dir()).expect("create models dir");
        fs::write(layout.models_dir().join("Work.html"), WORK_MARKUP).expect("write snapshot");
        write_json_pretty(
            &layout.document_path(),
            &json!({"Work": {"author": {}}, "Member": {"id": {}}}),
        )
        .expect("write document");
        let filled_objects_path = temp.path().join("filled.json");

        run(RepairArgs {
            work_root: temp.path().to_path_buf(),
            document_path: None,
            models_dir: None,
            output_path: None,
            filled_objects_path: Some(filled_objects_path.clone()),
            report_path: None,
            no_report: false,
        })
        .expect("repair command should succeed");

        let updated: serde_json::Value =
            read_json(&layout.output_path()).expect("output should exist");
        assert_eq!(updated, json!({"Work": {"author": "string"}, "Member": {"id": {}}}));

        let filled: serde_json::Value =
            read_json(&filled_objects_path).expect("filled map should exist");
        assert_eq!(filled, json!({"author": "string"}));

        let report: serde_json::Value =
            read_json(&layout.report_path()).expect("report should exist");
        assert_eq!(report["counts"]["empty_leaves"], json!(2));
        assert_eq!(report["counts"]["patched"], json!(1));
        assert_eq!(report["unresolved_paths"], json!(["Member.id"]));
        assert_eq!(
            report["document_sha256"].as_str().map(str::len),
            Some(64)
        );
    }

    #[test]
    fn unreadable_snapshot_aborts_the_repair() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("Work.html"), [0xff, 0xfe, 0x00]).expect("write snapshot");

        let resolver = MarkupResolver::new().expect("resolver should compile");
        let mut archive = MarkupArchive::from_dir(temp.path());
        let result = repair(node(json!({"Work": {"author": {}}})), &mut archive, &resolver);

        assert!(result.is_err());
    }

    #[test]
    fn unreadable_document_is_fatal() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let layout = WorkLayout::new(temp.path());
        fs::write(layout.document_path(), "{\"Work\": {\"count\": 3}}").expect("write document");

        let result = run(RepairArgs {
            work_root: temp.path().to_path_buf(),
            document_path: None,
            models_dir: None,
            output_path: None,
            filled_objects_path: None,
            report_path: None,
            no_report: true,
        });

        assert!(result.is_err());
        assert!(!layout.output_path().exists());
    }
}
