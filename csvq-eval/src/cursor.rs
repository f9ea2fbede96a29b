use std::sync::Mutex;

use csvq_ast::SelectQuery;
use csvq_value::Primary;

use crate::error::{EvalError, EvalResult};
use crate::view::{Record, View};

/// The position argument of a `FETCH`, independent of the AST so the
/// evaluator can synthesize one for `WHILE ... IN CURSOR` iteration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchPosition {
    Next,
    Prior,
    First,
    Last,
    Absolute(i64),
    Relative(i64),
}

impl From<&csvq_ast::statement::FetchPosition> for FetchPosition {
    fn from(p: &csvq_ast::statement::FetchPosition) -> Self {
        use csvq_ast::statement::FetchPosition as Ast;
        match p {
            Ast::Next => FetchPosition::Next,
            Ast::Prior => FetchPosition::Prior,
            Ast::First => FetchPosition::First,
            Ast::Last => FetchPosition::Last,
            Ast::Absolute(n) => FetchPosition::Absolute(*n),
            Ast::Relative(n) => FetchPosition::Relative(*n),
        }
    }
}

/// What FETCH found: a row's cells, or that the cursor ran off either end.
pub enum FetchOutcome {
    Row(Record),
    NoRow,
}

/// Mutable cursor state, guarded by a mutex because FETCH/OPEN/CLOSE may be
/// invoked from different worker contexts when user-defined aggregates
/// iterate cursors concurrently.
struct State {
    view: Option<View>,
    index: i64,
    fetched: bool,
}

/// A named, stateful position over a materialized view: **regular**
/// (backed by a query not yet executed) or **pseudo** (backed by a fixed
/// value list, presented as a single-column view aliased `c1`).
pub struct Cursor {
    name: String,
    kind: CursorKind,
    state: Mutex<State>,
}

enum CursorKind {
    Regular(Box<SelectQuery>),
    Pseudo,
}

impl Cursor {
    /// A regular cursor, created closed.
    pub fn regular(name: impl Into<String>, query: Box<SelectQuery>) -> Self {
        Cursor {
            name: name.into(),
            kind: CursorKind::Regular(query),
            state: Mutex::new(State {
                view: None,
                index: -1,
                fetched: false,
            }),
        }
    }

    /// A pseudo-cursor, open from the moment it is declared, backed by an
    /// already-materialized single-column view.
    pub fn pseudo(name: impl Into<String>, values: Vec<Primary>) -> Self {
        Cursor {
            name: name.into(),
            kind: CursorKind::Pseudo,
            state: Mutex::new(State {
                view: Some(View::single_column(values)),
                index: -1,
                fetched: false,
            }),
        }
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self.kind, CursorKind::Pseudo)
    }

    pub fn query(&self) -> Option<&SelectQuery> {
        match &self.kind {
            CursorKind::Regular(q) => Some(q),
            CursorKind::Pseudo => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().expect("cursor mutex poisoned").view.is_some()
    }

    /// Installs the view produced by running this cursor's query.
    pub fn open(&self, view: View) -> EvalResult<()> {
        let mut state = self.state.lock().expect("cursor mutex poisoned");
        if state.view.is_some() {
            return Err(EvalError::cursor_open(&self.name));
        }
        state.view = Some(view);
        state.index = -1;
        state.fetched = false;
        Ok(())
    }

    pub fn close(&self) -> EvalResult<()> {
        if self.is_pseudo() {
            return Err(EvalError::pseudo_cursor(&self.name));
        }
        let mut state = self.state.lock().expect("cursor mutex poisoned");
        state.view = None;
        state.index = -1;
        state.fetched = false;
        Ok(())
    }

    /// A clone of the cursor's currently materialized view, for use as a
    /// `FROM` row source (`SELECT * FROM CURSOR c`). Errors if the cursor
    /// has not been opened.
    pub fn snapshot(&self) -> EvalResult<View> {
        let state = self.state.lock().expect("cursor mutex poisoned");
        state.view.clone().ok_or_else(|| EvalError::cursor_closed(&self.name))
    }

    pub fn row_count(&self) -> EvalResult<usize> {
        let state = self.state.lock().expect("cursor mutex poisoned");
        state
            .view
            .as_ref()
            .map(|v| v.row_count())
            .ok_or_else(|| EvalError::cursor_closed(&self.name))
    }

    /// Repositions the cursor and returns the row at the new index, or
    /// `NoRow` with the index clamped just past the relevant end.
    pub fn fetch(&self, position: FetchPosition) -> EvalResult<FetchOutcome> {
        let mut state = self.state.lock().expect("cursor mutex poisoned");
        let row_count = state
            .view
            .as_ref()
            .map(|v| v.row_count() as i64)
            .ok_or_else(|| EvalError::cursor_closed(&self.name))?;

        let new_index = match position {
            FetchPosition::Next => state.index + 1,
            FetchPosition::Prior => state.index - 1,
            FetchPosition::First => 0,
            FetchPosition::Last => row_count - 1,
            FetchPosition::Absolute(n) => n,
            FetchPosition::Relative(n) => state.index + n,
        };

        if new_index < 0 {
            state.index = -1;
            state.fetched = true;
            return Ok(FetchOutcome::NoRow);
        }
        if new_index >= row_count {
            state.index = row_count;
            state.fetched = true;
            return Ok(FetchOutcome::NoRow);
        }

        state.index = new_index;
        state.fetched = true;
        let record = state.view.as_ref().expect("checked above").records[new_index as usize].clone();
        Ok(FetchOutcome::Row(record))
    }

    /// `UNKNOWN` until the first successful FETCH, then `TRUE` in bounds,
    /// `FALSE` once past either end.
    pub fn is_in_range(&self) -> EvalResult<csvq_value::Ternary> {
        let state = self.state.lock().expect("cursor mutex poisoned");
        let row_count = state
            .view
            .as_ref()
            .map(|v| v.row_count() as i64)
            .ok_or_else(|| EvalError::cursor_closed(&self.name))?;
        if !state.fetched {
            return Ok(csvq_value::Ternary::Unknown);
        }
        Ok(csvq_value::Ternary::from_bool(
            state.index >= 0 && state.index < row_count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ColumnIdentity, Header};

    fn sample_view() -> View {
        let header = Header::new(vec![ColumnIdentity::computed("n")]);
        let records = vec![
            Record::new(vec![crate::view::Cell::new(Primary::Integer(10))]),
            Record::new(vec![crate::view::Cell::new(Primary::Integer(20))]),
            Record::new(vec![crate::view::Cell::new(Primary::Integer(30))]),
        ];
        View::new(header, records).unwrap()
    }

    #[test]
    fn fetch_sequence_matches_cursor_monotonicity_scenario() {
        let cursor = Cursor::regular("c", Box::new(dummy_query()));
        cursor.open(sample_view()).unwrap();

        let row = |c: &Cursor, pos: FetchPosition| match c.fetch(pos).unwrap() {
            FetchOutcome::Row(r) => r.value(0).cloned(),
            FetchOutcome::NoRow => None,
        };

        assert_eq!(row(&cursor, FetchPosition::Next), Some(Primary::Integer(10)));
        assert_eq!(row(&cursor, FetchPosition::Next), Some(Primary::Integer(20)));
        assert_eq!(
            row(&cursor, FetchPosition::Relative(-1)),
            Some(Primary::Integer(10))
        );
        assert_eq!(row(&cursor, FetchPosition::Last), Some(Primary::Integer(30)));
        assert_eq!(row(&cursor, FetchPosition::Next), None);
        assert_eq!(cursor.is_in_range().unwrap(), csvq_value::Ternary::False);
    }

    #[test]
    fn pseudo_cursor_rejects_close_and_dispose() {
        let cursor = Cursor::pseudo("c", vec![Primary::Integer(1)]);
        assert!(cursor.close().is_err());
    }

    fn dummy_query() -> SelectQuery {
        use csvq_ast::location::Location;
        use csvq_ast::query::{SelectEntity, SelectSet};

        SelectQuery {
            with: None,
            body: SelectSet::Entity(Box::new(SelectEntity {
                distinct: false,
                projection: vec![],
                from: None,
                filter: None,
                group_by: vec![],
                having: None,
                location: Location::synthetic(),
            })),
            order_by: vec![],
            limit: None,
            offset: None,
            location: Location::synthetic(),
        }
    }
}
