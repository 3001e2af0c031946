//! sorrel-lang: the declaration surface over the sorrel engine. A
//! [`Grammar`] owns a rule registry and exposes definition, tracing,
//! overlay scopes and the parse entry points; [`RuleDef`] is the builder a
//! definition goes through; [`sexp`] has the constructors for writing rule
//! bodies as data.

pub mod sexp;

pub use sorrel_core::{
    Context, Expr, Formals, ItemKind, NativeFn, Outcome, ParseOptions, Pattern, Position,
    Processor, Registry, RepBound, RepSpec, Rule, SeqKind, SorrelError, TraceOpts, Value, Vars,
};
pub use sorrel_core::{process, trace};

use sorrel_core::compile::compile;

/// One rule definition on its way into a grammar.
pub struct RuleDef {
    name: String,
    formals: Formals,
    body: Value,
    processors: Vec<Processor>,
    lets: Vec<(String, Value)>,
    externals: Vec<String>,
    doc: Option<String>,
}

impl RuleDef {
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        RuleDef {
            name: name.into(),
            formals: Formals::none(),
            body,
            processors: Vec::new(),
            lets: Vec::new(),
            externals: Vec::new(),
            doc: None,
        }
    }

    pub fn formals(mut self, names: &[&str]) -> Self {
        self.formals.required = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn rest(mut self, name: &str) -> Self {
        self.formals.rest = Some(name.to_string());
        self
    }

    pub fn processor(mut self, processor: Processor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Introduce a dynamically scoped cell for this rule's extent,
    /// initially nil unless given a value.
    pub fn let_var(mut self, name: &str, init: Value) -> Self {
        self.lets.push((name.to_string(), init));
        self
    }

    /// Declare that this rule uses a cell bound by an ancestor.
    pub fn external(mut self, name: &str) -> Self {
        self.externals.push(name.to_string());
        self
    }

    pub fn doc(mut self, text: &str) -> Self {
        self.doc = Some(text.to_string());
        self
    }
}

/// A rule registry plus the operations users reach for: define, undefine,
/// trace, overlay scopes and parsing.
#[derive(Default)]
pub struct Grammar {
    registry: Registry,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    /// Compile and register a rule. Redefinition replaces the old rule.
    pub fn define(&mut self, def: RuleDef) -> Result<(), SorrelError> {
        let body = compile(&def.body, &def.formals).map_err(|e| e.in_rule(&def.name))?;
        let mut rule = Rule::new(def.name, def.formals, body);
        rule.processors = def.processors;
        rule.lets = def.lets;
        rule.externals = def.externals;
        rule.doc = def.doc;
        self.registry.define(rule);
        Ok(())
    }

    pub fn undefine(&mut self, name: &str) -> bool {
        self.registry.undefine(name)
    }

    pub fn trace(&mut self, name: &str, opts: TraceOpts) -> Result<(), SorrelError> {
        self.registry.set_trace(name, Some(opts))
    }

    pub fn untrace(&mut self, name: &str) -> Result<(), SorrelError> {
        self.registry.set_trace(name, None)
    }

    pub fn parse(&self, rule: &str, input: Value) -> Result<Option<Value>, SorrelError> {
        sorrel_core::parse(&self.registry, rule, input, ParseOptions::new())
    }

    pub fn parse_with(
        &self,
        rule: &str,
        input: Value,
        opts: ParseOptions,
    ) -> Result<Option<Value>, SorrelError> {
        sorrel_core::parse(&self.registry, rule, input, opts)
    }

    /// Parse with a call form as the root, so the start rule can take
    /// arguments.
    pub fn parse_call(&self, call: &Value, input: Value) -> Result<Option<Value>, SorrelError> {
        sorrel_core::parse_call(&self.registry, call, input, ParseOptions::new())
    }

    pub fn parse_call_with(
        &self,
        call: &Value,
        input: Value,
        opts: ParseOptions,
    ) -> Result<Option<Value>, SorrelError> {
        sorrel_core::parse_call(&self.registry, call, input, opts)
    }

    /// Run `f` with an empty rule table: outer rules are invisible inside
    /// and the outer table is restored verbatim afterwards.
    pub fn with_isolated<R>(&mut self, f: impl FnOnce(&mut Grammar) -> R) -> R {
        let saved = std::mem::take(&mut self.registry);
        let out = f(self);
        self.registry = saved;
        out
    }

    /// Run `f` with a snapshot of the rule table: outer rules stay
    /// callable, definitions inside are discarded on exit.
    pub fn with_inherited<R>(&mut self, f: impl FnOnce(&mut Grammar) -> R) -> R {
        let saved = self.registry.clone();
        let out = f(self);
        self.registry = saved;
        out
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}
