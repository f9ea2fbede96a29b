use std::fmt;
use std::sync::Arc;

use csvq_value::Primary;

use crate::error::{EvalError, EvalResult};

/// One column identity within a [`Header`]: the view (table/alias) it came
/// from, its name, and whether it was materialized from an actual table
/// column as opposed to a computed expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnIdentity {
    pub view_name: Option<String>,
    pub column_name: String,
    pub is_from_table: bool,
}

impl ColumnIdentity {
    pub fn new(view_name: impl Into<Option<String>>, column_name: impl Into<String>) -> Self {
        ColumnIdentity {
            view_name: view_name.into(),
            column_name: column_name.into(),
            is_from_table: true,
        }
    }

    pub fn computed(column_name: impl Into<String>) -> Self {
        ColumnIdentity {
            view_name: None,
            column_name: column_name.into(),
            is_from_table: false,
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        self.column_name.eq_ignore_ascii_case(name)
    }

    fn matches_table(&self, table: &str) -> bool {
        self.view_name
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case(table))
            .unwrap_or(false)
    }
}

impl fmt::Display for ColumnIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.view_name {
            Some(view) => write!(f, "{}.{}", view, self.column_name),
            None => f.write_str(&self.column_name),
        }
    }
}

/// The ordered column list of a [`View`]. Resolution of bare and qualified
/// names happens here; ambiguity is reported rather than silently resolved
/// to the first match.
#[derive(Clone, Debug, Default)]
pub struct Header {
    columns: Vec<ColumnIdentity>,
}

impl Header {
    pub fn new(columns: Vec<ColumnIdentity>) -> Self {
        Header { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnIdentity] {
        &self.columns
    }

    pub fn push(&mut self, column: ColumnIdentity) {
        self.columns.push(column);
    }

    /// Resolves a bare column name. Errors if zero or more than one column
    /// matches (ambiguity is a semantic error surfaced here, not at parse time).
    pub fn resolve(&self, name: &str) -> EvalResult<usize> {
        let mut found = None;
        for (i, col) in self.columns.iter().enumerate() {
            if col.matches_name(name) {
                if found.is_some() {
                    return Err(EvalError::ambiguous_column(name));
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| EvalError::unknown_column(name))
    }

    /// Resolves `table.column`.
    pub fn resolve_field(&self, table: &str, name: &str) -> EvalResult<usize> {
        let mut found = None;
        for (i, col) in self.columns.iter().enumerate() {
            if col.matches_table(table) && col.matches_name(name) {
                if found.is_some() {
                    return Err(EvalError::ambiguous_column(format!("{}.{}", table, name)));
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| EvalError::unknown_column(format!("{}.{}", table, name)))
    }

    /// Indices of every column belonging to `table`, for `table.*` expansion.
    pub fn indices_for_table(&self, table: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches_table(table))
            .map(|(i, _)| i)
            .collect()
    }

    /// Appends `other`'s columns, keeping `self`'s identities for columns
    /// named in `shared` (used by `USING`/`NATURAL JOIN` coalescing).
    pub fn merge(mut self, other: Header, shared: &[String]) -> Header {
        for col in other.columns {
            if shared.iter().any(|s| col.matches_name(s)) {
                continue;
            }
            self.columns.push(col);
        }
        self
    }

    /// Column names shared (case-insensitively) between two headers, in the
    /// order they appear in `self`. Used to derive `NATURAL JOIN`'s implicit
    /// `USING` list.
    pub fn shared_column_names(&self, other: &Header) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| {
                other
                    .columns
                    .iter()
                    .any(|o| o.column_name.eq_ignore_ascii_case(&c.column_name))
            })
            .map(|c| c.column_name.clone())
            .collect()
    }
}

/// A single field within a [`Record`]. After aggregation, a cell also keeps
/// the list of source values it was computed from (e.g. the inputs to
/// `SUM`), indexed into the owning [`RecordSet`]'s value pool so cells stay
/// cheap to clone.
#[derive(Clone, Debug)]
pub struct Cell {
    pub value: Primary,
    sources: Option<Arc<Vec<Primary>>>,
}

impl Cell {
    pub fn new(value: Primary) -> Self {
        Cell {
            value,
            sources: None,
        }
    }

    pub fn with_sources(value: Primary, sources: Vec<Primary>) -> Self {
        Cell {
            value,
            sources: Some(Arc::new(sources)),
        }
    }

    pub fn sources(&self) -> &[Primary] {
        self.sources.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One row: exactly `Header::len()` cells, parallel to the header.
#[derive(Clone, Debug, Default)]
pub struct Record {
    cells: Vec<Cell>,
}

impl Record {
    pub fn new(cells: Vec<Cell>) -> Self {
        Record { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn value(&self, index: usize) -> Option<&Primary> {
        self.cells.get(index).map(|c| &c.value)
    }

    pub fn set(&mut self, index: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }
}

/// An ordered list of [`Record`]s sharing one [`Header`].
pub type RecordSet = Vec<Record>;

/// A relational result: header metadata plus the records it describes.
/// The fundamental unit the evaluator's pipeline stages pass between each
/// other.
#[derive(Clone, Debug, Default)]
pub struct View {
    pub header: Header,
    pub records: RecordSet,
}

impl View {
    pub fn new(header: Header, records: RecordSet) -> EvalResult<Self> {
        for record in &records {
            if record.len() != header.len() {
                return Err(EvalError::internal(
                    "record width does not match header width",
                ));
            }
        }
        Ok(View { header, records })
    }

    pub fn empty() -> Self {
        View {
            header: Header::default(),
            records: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// A single-column view holding the given values, aliased `c1`. Backs
    /// pseudo-cursors and bare `VALUES(...)` literal lists.
    pub fn single_column(values: Vec<Primary>) -> Self {
        let header = Header::new(vec![ColumnIdentity::computed("c1")]);
        let records = values
            .into_iter()
            .map(|v| Record::new(vec![Cell::new(v)]))
            .collect();
        View { header, records }
    }

    /// The synthetic single-row, zero-column table that `FROM` resolves to
    /// when a query has no real table source (e.g. `SELECT 1 + 1`).
    pub fn dual() -> Self {
        View {
            header: Header::default(),
            records: vec![Record::new(Vec::new())],
        }
    }
}
