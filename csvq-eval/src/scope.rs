use std::collections::HashMap;
use std::sync::Arc;

use csvq_ast::statement::{AggregateDeclaration, FunctionDeclaration};
use csvq_value::Primary;

use crate::cursor::Cursor;
use crate::error::{EvalError, EvalResult};
use crate::view::View;

/// One lexical frame: variable bindings, named cursors, inline tables
/// (views installed by a `WITH` clause), temporary tables (from
/// `DECLARE TABLE`), and user-declared functions/aggregates. Frames are
/// arranged in an arena and chained by parent index rather than by
/// pointer, so nested function/block scopes can be pushed and popped
/// without touching earlier frames.
#[derive(Default)]
struct Frame {
    parent: Option<usize>,
    variables: HashMap<String, Primary>,
    cursors: HashMap<String, Cursor>,
    inline_tables: HashMap<String, View>,
    temp_tables: HashMap<String, View>,
    functions: HashMap<String, Arc<FunctionDeclaration>>,
    aggregates: HashMap<String, Arc<AggregateDeclaration>>,
}

fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// The scope chain for one session or one nested procedure call. Lookups
/// walk from the current frame toward the root; declarations always write
/// the current (innermost) frame.
pub struct ScopeChain {
    frames: Vec<Frame>,
    current: usize,
}

impl Default for ScopeChain {
    fn default() -> Self {
        ScopeChain {
            frames: vec![Frame::default()],
            current: 0,
        }
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new child frame and makes it current, returning a marker to
    /// restore with [`ScopeChain::pop`].
    pub fn push(&mut self) -> usize {
        let parent = self.current;
        self.frames.push(Frame {
            parent: Some(parent),
            ..Frame::default()
        });
        self.current = self.frames.len() - 1;
        parent
    }

    /// Restores the frame that was current before the matching [`push`].
    pub fn pop(&mut self, restore_to: usize) {
        self.current = restore_to;
    }

    fn walk<'a, T>(
        &'a self,
        mut get: impl FnMut(&'a Frame) -> Option<&'a T>,
    ) -> Option<&'a T> {
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            let frame = &self.frames[i];
            if let Some(found) = get(frame) {
                return Some(found);
            }
            idx = frame.parent;
        }
        None
    }

    fn owning_frame_index(&self, has: impl Fn(&Frame) -> bool) -> Option<usize> {
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            if has(&self.frames[i]) {
                return Some(i);
            }
            idx = self.frames[i].parent;
        }
        None
    }

    // -- variables ----------------------------------------------------

    pub fn declare_variable(&mut self, name: &str, value: Primary) -> EvalResult<()> {
        let k = key(name);
        let frame = &mut self.frames[self.current];
        if frame.variables.contains_key(&k) {
            return Err(EvalError::redeclared_variable(name));
        }
        frame.variables.insert(k, value);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> EvalResult<Primary> {
        let k = key(name);
        self.walk(|f| f.variables.get(&k))
            .cloned()
            .ok_or_else(|| EvalError::undeclared_variable(name))
    }

    /// Writes to the innermost frame that already declares `name`.
    pub fn set_variable(&mut self, name: &str, value: Primary) -> EvalResult<()> {
        let k = key(name);
        let idx = self
            .owning_frame_index(|f| f.variables.contains_key(&k))
            .ok_or_else(|| EvalError::undeclared_variable(name))?;
        self.frames[idx].variables.insert(k, value);
        Ok(())
    }

    // -- cursors --------------------------------------------------------

    pub fn declare_cursor(&mut self, name: &str, cursor: Cursor) -> EvalResult<()> {
        let k = key(name);
        let frame = &mut self.frames[self.current];
        if frame.cursors.contains_key(&k) {
            return Err(EvalError::redeclared_cursor(name));
        }
        frame.cursors.insert(k, cursor);
        Ok(())
    }

    pub fn cursor(&self, name: &str) -> EvalResult<&Cursor> {
        let k = key(name);
        self.walk(|f| f.cursors.get(&k))
            .ok_or_else(|| EvalError::undeclared_cursor(name))
    }

    pub fn cursor_mut(&mut self, name: &str) -> EvalResult<&mut Cursor> {
        let k = key(name);
        let idx = self
            .owning_frame_index(|f| f.cursors.contains_key(&k))
            .ok_or_else(|| EvalError::undeclared_cursor(name))?;
        Ok(self.frames[idx].cursors.get_mut(&k).expect("checked above"))
    }

    pub fn dispose_cursor(&mut self, name: &str) -> EvalResult<()> {
        let k = key(name);
        let idx = self
            .owning_frame_index(|f| f.cursors.contains_key(&k))
            .ok_or_else(|| EvalError::undeclared_cursor(name))?;
        self.frames[idx].cursors.remove(&k);
        Ok(())
    }

    // -- inline tables (WITH) -------------------------------------------

    pub fn declare_inline_table(&mut self, name: &str, view: View) {
        let frame = &mut self.frames[self.current];
        frame.inline_tables.insert(key(name), view);
    }

    pub fn inline_table(&self, name: &str) -> Option<&View> {
        let k = key(name);
        self.walk(|f| f.inline_tables.get(&k))
    }

    // -- temporary tables (DECLARE TABLE) --------------------------------

    pub fn declare_temp_table(&mut self, name: &str, view: View) -> EvalResult<()> {
        let k = key(name);
        let frame = &mut self.frames[self.current];
        if frame.temp_tables.contains_key(&k) {
            return Err(EvalError::semantic(format!("table {} is redeclared", name)));
        }
        frame.temp_tables.insert(k, view);
        Ok(())
    }

    pub fn temp_table(&self, name: &str) -> Option<&View> {
        let k = key(name);
        self.walk(|f| f.temp_tables.get(&k))
    }

    // -- user-declared functions/aggregates ------------------------------

    pub fn declare_function(&mut self, name: &str, decl: FunctionDeclaration) -> EvalResult<()> {
        let k = key(name);
        let frame = &mut self.frames[self.current];
        if frame.functions.contains_key(&k) {
            return Err(EvalError::semantic(format!("function {} is redeclared", name)));
        }
        frame.functions.insert(k, Arc::new(decl));
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<Arc<FunctionDeclaration>> {
        let k = key(name);
        self.walk(|f| f.functions.get(&k)).cloned()
    }

    pub fn declare_aggregate(&mut self, name: &str, decl: AggregateDeclaration) -> EvalResult<()> {
        let k = key(name);
        let frame = &mut self.frames[self.current];
        if frame.aggregates.contains_key(&k) {
            return Err(EvalError::semantic(format!(
                "aggregate function {} is redeclared",
                name
            )));
        }
        frame.aggregates.insert(k, Arc::new(decl));
        Ok(())
    }

    pub fn aggregate(&self, name: &str) -> Option<Arc<AggregateDeclaration>> {
        let k = key(name);
        self.walk(|f| f.aggregates.get(&k)).cloned()
    }

    /// A copy usable to run an independent subquery or function/aggregate
    /// body: the same variable bindings, inline tables, temp tables, and
    /// user declarations, but with no open cursors of its own. A subquery
    /// does not inherit the enclosing query's cursor positions, and
    /// `Cursor` cannot itself be cloned (it owns a mutex).
    pub fn fork(&self) -> ScopeChain {
        let frames = self
            .frames
            .iter()
            .map(|f| Frame {
                parent: f.parent,
                variables: f.variables.clone(),
                cursors: HashMap::new(),
                inline_tables: f.inline_tables.clone(),
                temp_tables: f.temp_tables.clone(),
                functions: f.functions.clone(),
                aggregates: f.aggregates.clone(),
            })
            .collect();
        ScopeChain {
            frames,
            current: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_and_reads_variable() {
        let mut scope = ScopeChain::new();
        scope.declare_variable("x", Primary::Integer(1)).unwrap();
        assert_eq!(scope.get_variable("x").unwrap(), Primary::Integer(1));
    }

    #[test]
    fn redeclaring_a_variable_is_an_error() {
        let mut scope = ScopeChain::new();
        scope.declare_variable("x", Primary::Integer(1)).unwrap();
        assert!(scope.declare_variable("x", Primary::Integer(2)).is_err());
    }

    #[test]
    fn child_frame_sees_parent_variables_and_writes_through() {
        let mut scope = ScopeChain::new();
        scope.declare_variable("x", Primary::Integer(1)).unwrap();
        let marker = scope.push();
        assert_eq!(scope.get_variable("x").unwrap(), Primary::Integer(1));
        scope.set_variable("x", Primary::Integer(2)).unwrap();
        scope.pop(marker);
        assert_eq!(scope.get_variable("x").unwrap(), Primary::Integer(2));
    }

    #[test]
    fn undeclared_variable_lookup_errors() {
        let scope = ScopeChain::new();
        assert!(scope.get_variable("missing").is_err());
    }
}
