use super::*;

/// Finds the filled-values key for an entity-stripped path.
///
/// Suffixes are tried longest first, each starting at a property name.
/// Last resort is the final property name on its own.
pub fn match_path<'a>(path: &SchemaPath, filled: &'a FilledValues) -> Option<&'a str> {
    let suffix_hit = path
        .segments()
        .iter()
        .enumerate()
        .filter(|(_, segment)| matches!(segment, Segment::Key(_)))
        .find_map(|(start, _)| filled.get_key_value(&path.suffix(start).to_string()));

    suffix_hit
        .or_else(|| filled.get_key_value(path.last_property_name()?))
        .map(|(key, _)| key.as_str())
}
