use super::*;

// First match wins; `integer($int64)` must be checked before `integer`.
const PRIMITIVE_MARKERS: [&str; 5] = ["integer($int64)", "integer", "string", "boolean", "number"];

const DEFAULT_TYPE: &str = "string";

impl MarkupResolver {
    /// Infers the type of a property from its type cell.
    ///
    /// Every `[` in the raw cell markup counts as one level of array
    /// nesting. The base type is the first primitive marker found in the
    /// raw markup, then the value type of a wildcard `<name>` row, then
    /// `string`.
    pub(super) fn classify_type_cell(&self, type_cell: ElementRef<'_>) -> SchemaNode {
        let raw = type_cell.html();
        let array_depth = raw.matches('[').count();

        let base_type = PRIMITIVE_MARKERS
            .iter()
            .find(|marker| raw.contains(*marker))
            .map(|marker| marker.to_string())
            .or_else(|| self.wildcard_type(type_cell))
            .unwrap_or_else(|| DEFAULT_TYPE.to_string());

        SchemaNode::Type(base_type).wrap_in_arrays(array_depth)
    }

    fn wildcard_type(&self, type_cell: ElementRef<'_>) -> Option<String> {
        // Only text-only cells can hold a placeholder name; outer cells also
        // carry the text of their nested tables.
        let name_cell = self.cells(type_cell).find(|cell| {
            cell.children().all(|child| !child.value().is_element())
                && self.is_wildcard_name(&cell_text(*cell))
        })?;

        let value_cell = name_cell
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|sibling| sibling.value().name() == "td")?;

        let value_type = cell_text(value_cell);
        if value_type.contains("string") {
            Some("string".to_string())
        } else {
            Some(value_type)
        }
    }
}
