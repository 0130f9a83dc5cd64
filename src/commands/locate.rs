use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::cli::LocateArgs;
use crate::model::{SchemaNode, SchemaPath};
use crate::util::{WorkLayout, read_json, write_json_pretty};

pub fn run(args: LocateArgs) -> Result<()> {
    let layout = WorkLayout::new(&args.work_root);
    let document_path = args
        .document_path
        .unwrap_or_else(|| layout.document_path());

    let doc: SchemaNode = read_json(&document_path)?;
    let paths = locate_empty(&doc);

    if args.dry_run {
        info!(
            document = %document_path.display(),
            empty_leaves = paths.len(),
            "locate dry-run complete"
        );
        return Ok(());
    }

    let empty_objects_path = args
        .empty_objects_path
        .unwrap_or_else(|| layout.empty_objects_path());

    write_json_pretty(&empty_objects_path, &empty_objects_manifest(&paths))?;
    info!(path = %empty_objects_path.display(), "wrote empty-objects manifest");
    info!(empty_leaves = paths.len(), "locate completed");

    Ok(())
}

/// Depth-first list of every empty mapping below the document root.
pub fn locate_empty(doc: &SchemaNode) -> Vec<SchemaPath> {
    let mut paths = Vec::new();
    collect_empty(doc, &SchemaPath::default(), &mut paths);
    paths
}

fn collect_empty(node: &SchemaNode, path: &SchemaPath, paths: &mut Vec<SchemaPath>) {
    match node {
        SchemaNode::Object(entries) => {
            for (key, value) in entries {
                visit_child(value, path.child_key(key), paths);
            }
        }
        SchemaNode::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                visit_child(item, path.child_index(index), paths);
            }
        }
        SchemaNode::Type(_) => {}
    }
}

fn visit_child(child: &SchemaNode, path: SchemaPath, paths: &mut Vec<SchemaPath>) {
    if child.is_empty_object() {
        paths.push(path);
    } else {
        collect_empty(child, &path, paths);
    }
}

pub fn empty_objects_manifest(paths: &[SchemaPath]) -> BTreeMap<String, SchemaNode> {
    paths
        .iter()
        .map(|path| (path.to_string(), SchemaNode::empty_object()))
        .collect()
}
