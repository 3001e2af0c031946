use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::Value;
use crate::compile::Formals;
use crate::error::SorrelError;
use crate::expr::Expr;
use crate::process::Processor;

/// Per-rule tracing switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceOpts {
    /// Also trace every rule dispatched within this rule's dynamic extent.
    pub recursive: bool,
}

/// A compiled rule: the unit the registry stores and the dispatcher runs.
#[derive(Clone, Debug)]
pub struct Rule {
    pub name: String,
    pub formals: Formals,
    pub body: Expr,
    pub processors: Vec<Processor>,
    /// Cells introduced for this rule's dynamic extent, with initial values.
    pub lets: Vec<(String, Value)>,
    /// Names this rule expects an ancestor to have bound.
    pub externals: Vec<String>,
    pub doc: Option<String>,
    pub trace: Option<TraceOpts>,
}

impl Rule {
    pub fn new(name: impl Into<String>, formals: Formals, body: Expr) -> Self {
        Rule {
            name: name.into(),
            formals,
            body,
            processors: Vec::new(),
            lets: Vec::new(),
            externals: Vec::new(),
            doc: None,
            trace: None,
        }
    }
}

/// The rule table consulted by the dispatcher. Rules are held behind `Arc`,
/// so overlay snapshots copy the table, never the rules. Mutation happens
/// only through definition operations, never during a parse.
#[derive(Clone, Default)]
pub struct Registry {
    rules: HashMap<String, Arc<Rule>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn define(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), Arc::new(rule));
    }

    /// Remove a rule. Returns whether it existed.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Rule>> {
        self.rules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Flip a rule's trace switches; `None` turns tracing off.
    pub fn set_trace(&mut self, name: &str, opts: Option<TraceOpts>) -> Result<(), SorrelError> {
        let current = self
            .rules
            .get(name)
            .ok_or_else(|| SorrelError::undefined_rule(name))?;
        let mut rule = (**current).clone();
        rule.trace = opts;
        self.rules.insert(name.to_string(), Arc::new(rule));
        Ok(())
    }

    /// Run `f` against a fresh, empty rule table; the previous table is
    /// restored verbatim afterwards, whatever `f` returned.
    pub fn with_isolated<R>(&mut self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let saved = std::mem::take(&mut self.rules);
        let out = f(self);
        self.rules = saved;
        out
    }

    /// Run `f` against a snapshot of the current table: definitions inside
    /// the scope land in the snapshot only and are discarded on exit.
    pub fn with_inherited<R>(&mut self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let saved = self.rules.clone();
        let out = f(self);
        self.rules = saved;
        out
    }
}
