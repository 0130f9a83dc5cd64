use super::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("missing key `{key}` under `{parent}`")]
    MissingKey { key: String, parent: String },

    #[error("index {index} out of range for sequence of length {len} under `{parent}`")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        parent: String,
    },

    #[error("segment `{segment}` cannot address a {found} under `{parent}`")]
    KindMismatch {
        segment: String,
        found: &'static str,
        parent: String,
    },
}

/// Overwrites the node at `path` with `value`. An empty path is a no-op.
///
/// Every segment but the last must already exist. A missing final mapping
/// key is inserted; a missing final sequence slot is an error.
pub fn patch(doc: &mut SchemaNode, path: &SchemaPath, value: SchemaNode) -> Result<(), PatchError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(());
    };

    let mut current = doc;
    for (depth, segment) in parents.iter().enumerate() {
        current = child_mut(current, segment, &parents[..depth])?;
    }

    match (current, last) {
        (SchemaNode::Object(entries), Segment::Key(key)) => {
            entries.insert(key.clone(), value);
            Ok(())
        }
        (SchemaNode::Array(items), Segment::Index(index)) => {
            let len = items.len();
            let slot = items.get_mut(*index).ok_or_else(|| PatchError::IndexOutOfRange {
                index: *index,
                len,
                parent: describe(parents),
            })?;
            *slot = value;
            Ok(())
        }
        (node, segment) => Err(PatchError::KindMismatch {
            segment: segment.to_string(),
            found: node.kind_name(),
            parent: describe(parents),
        }),
    }
}

fn child_mut<'a>(
    node: &'a mut SchemaNode,
    segment: &Segment,
    parent: &[Segment],
) -> Result<&'a mut SchemaNode, PatchError> {
    match (node, segment) {
        (SchemaNode::Object(entries), Segment::Key(key)) => {
            entries.get_mut(key).ok_or_else(|| PatchError::MissingKey {
                key: key.clone(),
                parent: describe(parent),
            })
        }
        (SchemaNode::Array(items), Segment::Index(index)) => {
            let len = items.len();
            items.get_mut(*index).ok_or_else(|| PatchError::IndexOutOfRange {
                index: *index,
                len,
                parent: describe(parent),
            })
        }
        (node, segment) => Err(PatchError::KindMismatch {
            segment: segment.to_string(),
            found: node.kind_name(),
            parent: describe(parent),
        }),
    }
}

fn describe(segments: &[Segment]) -> String {
    if segments.is_empty() {
        "<root>".to_string()
    } else {
        SchemaPath::new(segments.to_vec()).to_string()
    }
}
