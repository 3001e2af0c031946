use std::sync::{Arc, Mutex};

use crate::ast::Value;
use crate::error::SorrelError;
use crate::expr::Expr;
use crate::position::Position;
use crate::value_format;

type Cell = Arc<Mutex<Value>>;

/// Dynamically scoped variable frames. A rule's `let` declarations push one
/// frame for the duration of that invocation; descendants reach the nearest
/// cell of a given name, so writes are visible to later siblings under the
/// same ancestor.
#[derive(Default)]
pub struct Vars {
    frames: Vec<Frame>,
}

#[derive(Default)]
struct Frame {
    cells: Vec<(String, Cell)>,
}

impl Vars {
    pub fn new() -> Self {
        Vars::default()
    }

    pub fn push_frame(&mut self, bindings: &[(String, Value)]) {
        let cells = bindings
            .iter()
            .map(|(name, init)| (name.clone(), Arc::new(Mutex::new(init.clone()))))
            .collect();
        self.frames.push(Frame { cells });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn lookup(&self, name: &str) -> Option<&Cell> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .cells
                .iter()
                .find(|(cell_name, _)| cell_name == name)
                .map(|(_, cell)| cell)
        })
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Read the nearest cell named `name`. Unbound reads are fatal: the
    /// rule was invoked outside the context it requires.
    pub fn get(&self, name: &str) -> Result<Value, SorrelError> {
        match self.lookup(name) {
            Some(cell) => Ok(cell.lock().unwrap().clone()),
            None => Err(SorrelError::unbound_external(name)),
        }
    }

    /// Write the nearest cell named `name`.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), SorrelError> {
        match self.lookup(name) {
            Some(cell) => {
                *cell.lock().unwrap() = value;
                Ok(())
            }
            None => Err(SorrelError::unbound_external(name)),
        }
    }
}

/// The arguments a rule was invoked with, kept as unevaluated expressions:
/// a parameter reference in the body replays the caller's expression at the
/// current position.
pub(crate) struct ParamFrame {
    pub names: Vec<String>,
    pub args: Vec<Expr>,
}

impl ParamFrame {
    pub fn arg_for(&self, name: &str) -> Option<&Expr> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.args.get(i))
    }
}

/// Everything threaded through a parse besides the position: dynamic
/// bindings, parameter frames, the in-progress rule invocations used for
/// left-recursion detection, and the tracing state.
#[derive(Default)]
pub struct Context {
    pub vars: Vars,
    pub(crate) params: Vec<ParamFrame>,
    in_progress: Vec<(String, Position)>,
    pub(crate) forced_trace: usize,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Dispatch depth, which is also the trace indentation level.
    pub fn depth(&self) -> usize {
        self.in_progress.len()
    }

    /// Record a rule invocation, refusing re-entry at the same position.
    /// The in-progress list mirrors the call stack, so a linear scan stays
    /// cheap.
    pub(crate) fn enter_rule(&mut self, name: &str, pos: &Position) -> Result<(), SorrelError> {
        if self
            .in_progress
            .iter()
            .any(|(n, p)| n == name && p == pos)
        {
            return Err(SorrelError::left_recursion(
                name,
                value_format::position_summary(pos),
            ));
        }
        self.in_progress.push((name.to_string(), pos.clone()));
        Ok(())
    }

    pub(crate) fn leave_rule(&mut self) {
        self.in_progress.pop();
    }

    #[cfg(test)]
    pub(crate) fn is_pristine(&self) -> bool {
        self.vars.frame_count() == 0 && self.params.is_empty() && self.in_progress.is_empty()
    }
}
