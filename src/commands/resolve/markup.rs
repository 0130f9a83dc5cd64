use super::*;

/// Parsed markup of one model box.
pub struct MarkupSnapshot {
    html: Html,
}

impl MarkupSnapshot {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_fragment(raw),
        }
    }

    fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }
}

pub fn snapshot_file_name(entity: &str) -> String {
    format!("{}.html", entity.replace(char::is_whitespace, "_"))
}

/// Per-entity snapshots, loaded from disk on first reference.
pub struct MarkupArchive {
    models_dir: Option<PathBuf>,
    snapshots: HashMap<String, Option<MarkupSnapshot>>,
}

impl MarkupArchive {
    pub fn from_dir(models_dir: &Path) -> Self {
        Self {
            models_dir: Some(models_dir.to_path_buf()),
            snapshots: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn from_markup<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            models_dir: None,
            snapshots: entries
                .into_iter()
                .map(|(entity, raw)| (entity.to_string(), Some(MarkupSnapshot::parse(raw))))
                .collect(),
        }
    }

    pub fn snapshot(&mut self, entity: &str) -> Result<Option<&MarkupSnapshot>> {
        if !self.snapshots.contains_key(entity) {
            let loaded = self.load(entity)?;
            self.snapshots.insert(entity.to_string(), loaded);
        }
        Ok(self.snapshots.get(entity).and_then(Option::as_ref))
    }

    fn load(&self, entity: &str) -> Result<Option<MarkupSnapshot>> {
        let Some(models_dir) = &self.models_dir else {
            return Ok(None);
        };

        let path = models_dir.join(snapshot_file_name(entity));
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read markup snapshot {}", path.display()))?;
        debug!(entity = %entity, path = %path.display(), "loaded markup snapshot");
        Ok(Some(MarkupSnapshot::parse(&raw)))
    }
}

pub struct MarkupResolver {
    row: Selector,
    cell: Selector,
    nested_table: Selector,
    wildcard_name: Regex,
}

impl MarkupResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            row: compile_selector("tr")?,
            cell: compile_selector("td")?,
            nested_table: compile_selector("table.model")?,
            wildcard_name: Regex::new(r"<[^<>]*>")
                .context("failed to compile wildcard property regex")?,
        })
    }

    /// Walks nested property tables along `names` and classifies the type
    /// cell of the final property.
    pub fn resolve_type(&self, snapshot: &MarkupSnapshot, names: &[&str]) -> Option<SchemaNode> {
        let (leaf, parents) = names.split_last()?;

        let mut scope = snapshot.root();
        for name in parents {
            scope = self
                .matching_type_cells(scope, name)
                .find_map(|type_cell| type_cell.select(&self.nested_table).next())?;
        }

        let type_cell = self.matching_type_cells(scope, leaf).next()?;
        Some(self.classify_type_cell(type_cell))
    }

    fn matching_type_cells<'a>(
        &self,
        scope: ElementRef<'a>,
        name: &str,
    ) -> impl Iterator<Item = ElementRef<'a>> {
        scope.select(&self.row).filter_map(move |row| {
            let mut cells = row.select(&self.cell);
            let name_cell = cells.next()?;
            let type_cell = cells.next()?;
            (property_name(name_cell) == name).then_some(type_cell)
        })
    }

    /// Cells below `scope`, excluding `scope` itself.
    pub(super) fn cells<'a>(&self, scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
        scope
            .select(&self.cell)
            .filter(move |cell| cell.id() != scope.id())
    }

    pub(super) fn is_wildcard_name(&self, text: &str) -> bool {
        self.wildcard_name.is_match(text)
    }
}

fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("failed to compile selector `{css}`: {err:?}"))
}

pub(super) fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

fn property_name(cell: ElementRef<'_>) -> String {
    cell_text(cell).replace('*', "").trim().to_string()
}
