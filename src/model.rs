use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One node of a scraped schema model.
///
/// An empty `Object` is the placeholder for a property whose type the
/// scraper could not determine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Type(String),
    Array(Vec<SchemaNode>),
    Object(BTreeMap<String, SchemaNode>),
}

impl SchemaNode {
    pub fn empty_object() -> Self {
        Self::Object(BTreeMap::new())
    }

    pub fn is_empty_object(&self) -> bool {
        matches!(self, Self::Object(entries) if entries.is_empty())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Type(_) => "type tag",
            Self::Array(_) => "sequence",
            Self::Object(_) => "mapping",
        }
    }

    /// Wraps the node in `depth` levels of single-element arrays.
    pub fn wrap_in_arrays(self, depth: usize) -> Self {
        (0..depth).fold(self, |inner, _| Self::Array(vec![inner]))
    }

    /// Removes up to `depth` levels of single-element array wrapping.
    pub fn peel_arrays(self, depth: usize) -> Self {
        let mut node = self;
        for _ in 0..depth {
            node = match node {
                Self::Array(mut items) if items.len() == 1 => items.remove(0),
                other => return other,
            };
        }
        node
    }
}

/// Flat map from entity-stripped path to the value inferred for it.
pub type FilledValues = BTreeMap<String, SchemaNode>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Location of a node inside a [`SchemaNode`] tree, rendered as `A.B[2].C`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaPath {
    segments: Vec<Segment>,
}

impl SchemaPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn suffix(&self, start: usize) -> Self {
        Self {
            segments: self.segments.get(start..).unwrap_or_default().to_vec(),
        }
    }

    /// Splits off the leading entity name. Returns `None` when the path does
    /// not start with a property name.
    pub fn split_entity(&self) -> Option<(&str, SchemaPath)> {
        match self.segments.split_first()? {
            (Segment::Key(entity), rest) => Some((entity.as_str(), Self::new(rest.to_vec()))),
            (Segment::Index(_), _) => None,
        }
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Key(key) => Some(key.as_str()),
                Segment::Index(_) => None,
            })
            .collect()
    }

    pub fn last_property_name(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|segment| match segment {
            Segment::Key(key) => Some(key.as_str()),
            Segment::Index(_) => None,
        })
    }

    pub fn trailing_index_count(&self) -> usize {
        self.segments
            .iter()
            .rev()
            .take_while(|segment| matches!(segment, Segment::Index(_)))
            .count()
    }

    /// Read-only traversal of `doc` along this path.
    pub fn get<'a>(&self, doc: &'a SchemaNode) -> Option<&'a SchemaNode> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| match (node, segment) {
                (SchemaNode::Object(entries), Segment::Key(key)) => entries.get(key),
                (SchemaNode::Array(items), Segment::Index(index)) => items.get(*index),
                _ => None,
            })
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 && matches!(segment, Segment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for SchemaPath {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = raw.chars();
        let mut prev: Option<char> = None;

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if prev != Some(']') {
                        bail!("empty property name in path: {raw}");
                    }
                }
                '[' => {
                    if prev == Some('.') {
                        bail!("index must not follow `.` in path: {raw}");
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(next);
                    }
                    if !closed {
                        bail!("unterminated index in path: {raw}");
                    }
                    let index = digits
                        .parse::<usize>()
                        .with_context(|| format!("invalid index `{digits}` in path: {raw}"))?;
                    segments.push(Segment::Index(index));
                    prev = Some(']');
                    continue;
                }
                ']' => bail!("unexpected `]` in path: {raw}"),
                _ => {
                    if prev == Some(']') {
                        bail!("property name must follow `.` after an index in path: {raw}");
                    }
                    key.push(ch);
                }
            }
            prev = Some(ch);
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if raw.ends_with('.') {
            bail!("empty property name in path: {raw}");
        }

        Ok(Self { segments })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairCounts {
    pub empty_leaves: usize,
    pub resolved: usize,
    pub patched: usize,
    pub unmatched: usize,
    pub patch_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub document_path: String,
    pub document_sha256: String,
    pub models_dir: String,
    pub output_path: String,
    pub counts: RepairCounts,
    pub unresolved_paths: Vec<String>,
    pub warnings: Vec<String>,
}
