//! sorrel-core: a parsing-expression-grammar engine whose input is not text
//! but arbitrary nested data. A single grammar can walk a list of vectors
//! of strings, descending into containers where the rules say so. Ordered
//! choice, greedy repetition and syntactic predicates follow PEG semantics;
//! positions are immutable values, so backtracking is just keeping the old
//! cursor.

pub mod ast;
pub mod compile;
pub mod context;
pub mod error;
pub mod eval;
pub mod expr;
pub mod position;
pub mod process;
pub mod registry;
pub mod symbols;
pub mod trace;
mod unordered;
pub mod value_format;

pub use ast::Value;
pub use compile::{compile, Formals};
pub use context::{Context, Vars};
pub use error::SorrelError;
pub use eval::Outcome;
pub use expr::{Expr, ItemKind, RepBound, RepSpec, SeqKind};
pub use position::Position;
pub use process::{NativeFn, Pattern, Processor};
pub use registry::{Registry, Rule, TraceOpts};

/// Driver options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Accept a match that leaves input behind.
    pub junk_allowed: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        ParseOptions::default()
    }

    pub fn junk_allowed(mut self, allowed: bool) -> Self {
        self.junk_allowed = allowed;
        self
    }
}

/// Parse `input` with the named rule. `Ok(Some(value))` is a successful
/// parse; `Ok(None)` is a parse failure, including a match that left junk
/// behind when `junk_allowed` is off. Fatal conditions (undefined rules,
/// left recursion, usage errors) come back as `Err`.
///
/// Input that is not itself a sequence is wrapped in a synthetic
/// one-element list, so single items can be parsed directly.
pub fn parse(
    reg: &Registry,
    rule: &str,
    input: Value,
    opts: ParseOptions,
) -> Result<Option<Value>, SorrelError> {
    let root = Expr::Call {
        name: rule.to_string(),
        args: Vec::new(),
    };
    run(reg, &root, input, opts)
}

/// Parse with a call expression written as data, e.g. `(frame 3)`, so the
/// root rule can receive arguments.
pub fn parse_call(
    reg: &Registry,
    call: &Value,
    input: Value,
    opts: ParseOptions,
) -> Result<Option<Value>, SorrelError> {
    let root = compile::compile(call, &Formals::none())?;
    match root {
        Expr::Call { .. } => run(reg, &root, input, opts),
        _ => Err(SorrelError::grammar(
            "top-level parse expects a rule name or a call form",
        )),
    }
}

fn run(
    reg: &Registry,
    root: &Expr,
    input: Value,
    opts: ParseOptions,
) -> Result<Option<Value>, SorrelError> {
    let seq = if input.is_sequence() {
        input
    } else {
        Value::list([input])
    };
    let pos = Position::start(seq);
    let mut ctx = Context::new();
    match eval::eval(root, &pos, &mut ctx, reg)? {
        Outcome::Matched { value, pos: end } if opts.junk_allowed || end.at_end() => {
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_call, ParseOptions};
    use crate::ast::Value;
    use crate::compile::Formals;
    use crate::error::SorrelError;
    use crate::expr::Expr;
    use crate::registry::{Registry, Rule};

    fn sym(name: &str) -> Value {
        Value::symbol(name)
    }

    fn single_a_registry() -> Registry {
        let mut reg = Registry::new();
        reg.define(Rule::new("a", Formals::none(), Expr::Lit(sym("a"))));
        reg
    }

    #[test]
    fn junk_fails_a_parse_unless_allowed() {
        let reg = single_a_registry();
        let input = Value::list([sym("a"), sym("b")]);
        let strict = parse(&reg, "a", input.clone(), ParseOptions::new()).unwrap();
        assert_eq!(strict, None);
        let lax = parse(&reg, "a", input, ParseOptions::new().junk_allowed(true)).unwrap();
        assert_eq!(lax, Some(sym("a")));
    }

    #[test]
    fn non_sequence_input_is_wrapped() {
        let reg = single_a_registry();
        let got = parse(&reg, "a", sym("a"), ParseOptions::new()).unwrap();
        assert_eq!(got, Some(sym("a")));
    }

    #[test]
    fn call_expressions_can_drive_the_parse() {
        let mut reg = Registry::new();
        reg.define(Rule::new("item", Formals::of(&["x"]), Expr::Param(0)));
        let call = Value::list([sym("item"), Value::list([sym("quote"), sym("a")])]);
        let got = parse_call(&reg, &call, Value::list([sym("a")]), ParseOptions::new()).unwrap();
        assert_eq!(got, Some(sym("a")));
    }

    #[test]
    fn a_non_call_root_is_a_grammar_error() {
        let reg = Registry::new();
        let err =
            parse_call(&reg, &Value::Int(3), Value::list([]), ParseOptions::new()).unwrap_err();
        assert!(matches!(err, SorrelError::Grammar(_)));
    }
}
