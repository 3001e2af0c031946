//! The result-transformation pipeline attached to a rule. The matched value
//! flows through the processors left to right; a predicate processor may
//! turn the match into a failure, which is reported as `Ok(None)` rather
//! than an error.

use std::fmt;
use std::sync::Arc;

use im::Vector;

use crate::ast::Value;
use crate::context::Vars;
use crate::error::SorrelError;

/// Host callback invoked by the destructure, function and test processors.
/// The `Vars` handle gives it read/write access to the dynamic binding
/// cells of the enclosing rule invocations.
pub struct NativeFn {
    func: Box<dyn Fn(&mut Vars, &[Value]) -> Result<Value, SorrelError> + Send + Sync>,
    debug_name: Option<Arc<str>>,
}

impl NativeFn {
    pub fn new(
        func: impl Fn(&mut Vars, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Box::new(func),
            debug_name: None,
        }
    }

    pub fn with_name(
        name: impl Into<String>,
        func: impl Fn(&mut Vars, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        let mut nf = Self::new(func);
        nf.debug_name = Some(name.into().into());
        nf
    }

    pub fn call(&self, vars: &mut Vars, args: &[Value]) -> Result<Value, SorrelError> {
        (self.func)(vars, args)
    }

    pub fn name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name().unwrap_or("anonymous"))
    }
}

/// Destructuring pattern for the lambda-style processors: positional names,
/// nesting, ignores and a rest-tail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Var(String),
    Ignore,
    Seq {
        items: Vec<Pattern>,
        rest: Option<String>,
    },
}

impl Pattern {
    pub fn var(name: impl Into<String>) -> Self {
        Pattern::Var(name.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Seq {
            items: items.into_iter().collect(),
            rest: None,
        }
    }

    pub fn seq_with_rest(items: impl IntoIterator<Item = Pattern>, rest: &str) -> Self {
        Pattern::Seq {
            items: items.into_iter().collect(),
            rest: Some(rest.to_string()),
        }
    }

    /// Bind `value` against the pattern, appending the bound values in
    /// pattern order. Variables and rest-tails produce one argument each;
    /// ignores produce none.
    pub fn bind(&self, value: &Value, out: &mut Vec<Value>) -> Result<(), SorrelError> {
        match self {
            Pattern::Var(_) => {
                out.push(value.clone());
                Ok(())
            }
            Pattern::Ignore => Ok(()),
            Pattern::Seq { items, rest } => {
                let elements = match value {
                    Value::List(items) => items.clone(),
                    Value::Vector(items) => items.clone(),
                    Value::Nil => Vector::new(),
                    other => {
                        return Err(SorrelError::type_mismatch(
                            "destructurable sequence",
                            other.type_name(),
                        ))
                    }
                };
                let enough = if rest.is_some() {
                    elements.len() >= items.len()
                } else {
                    elements.len() == items.len()
                };
                if !enough {
                    return Err(SorrelError::arity(format!(
                        "pattern expects {}{} element{}, got {}",
                        items.len(),
                        if rest.is_some() { " or more" } else { "" },
                        if items.len() == 1 { "" } else { "s" },
                        elements.len()
                    )));
                }
                for (sub, element) in items.iter().zip(elements.iter()) {
                    sub.bind(element, out)?;
                }
                if rest.is_some() {
                    let tail: Vector<Value> =
                        elements.iter().skip(items.len()).cloned().collect();
                    out.push(Value::List(tail));
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Processor {
    /// Discard the input, produce a fixed value.
    Constant(Value),
    /// Destructure the input against the pattern and hand the bound values
    /// to the callback; its return becomes the new value.
    Destructure {
        pattern: Pattern,
        func: Arc<NativeFn>,
    },
    /// Spread a list input into positional arguments; any other value is
    /// passed as the single argument.
    Function(Arc<NativeFn>),
    /// Pass the value through when the flag is set, otherwise nil.
    Identity(bool),
    /// Depth-first list of the non-list leaves of the input.
    Flatten,
    /// Flatten, then concatenate the leaves into one string.
    StringJoin,
    /// Flatten, then collect the leaves into a vector.
    Vectorize,
    /// Destructure, evaluate the predicate; truthy passes the *original*
    /// input through, falsy fails the rule.
    Test {
        pattern: Pattern,
        pred: Arc<NativeFn>,
    },
    /// `Test` with the predicate negated.
    TestNot {
        pattern: Pattern,
        pred: Arc<NativeFn>,
    },
}

/// Run the pipeline. `Ok(None)` means a predicate declined the match; the
/// remaining processors do not run.
pub fn run_pipeline(
    processors: &[Processor],
    value: Value,
    vars: &mut Vars,
) -> Result<Option<Value>, SorrelError> {
    let mut current = value;
    for processor in processors {
        match apply(processor, current, vars)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn apply(
    processor: &Processor,
    value: Value,
    vars: &mut Vars,
) -> Result<Option<Value>, SorrelError> {
    match processor {
        Processor::Constant(v) => Ok(Some(v.clone())),
        Processor::Destructure { pattern, func } => {
            let mut args = Vec::new();
            pattern.bind(&value, &mut args)?;
            func.call(vars, &args).map(Some)
        }
        Processor::Function(func) => {
            let result = match &value {
                Value::List(items) => {
                    let args: Vec<Value> = items.iter().cloned().collect();
                    func.call(vars, &args)?
                }
                Value::Nil => func.call(vars, &[])?,
                other => func.call(vars, std::slice::from_ref(other))?,
            };
            Ok(Some(result))
        }
        Processor::Identity(keep) => Ok(Some(if *keep { value } else { Value::Nil })),
        Processor::Flatten => Ok(Some(Value::List(flatten(&value)))),
        Processor::StringJoin => {
            let mut text = String::new();
            for leaf in flatten(&value) {
                match leaf {
                    Value::Char(c) => text.push(c),
                    Value::Str(s) => text.push_str(&s),
                    Value::Byte(b) => text.push(b as char),
                    Value::Symbol(name) => text.push_str(&name),
                    other => {
                        return Err(SorrelError::type_mismatch(
                            "string constituent",
                            other.type_name(),
                        ))
                    }
                }
            }
            Ok(Some(Value::str(text)))
        }
        Processor::Vectorize => Ok(Some(Value::Vector(flatten(&value)))),
        Processor::Test { pattern, pred } => {
            let mut args = Vec::new();
            pattern.bind(&value, &mut args)?;
            let verdict = pred.call(vars, &args)?;
            Ok(verdict.is_truthy().then_some(value))
        }
        Processor::TestNot { pattern, pred } => {
            let mut args = Vec::new();
            pattern.bind(&value, &mut args)?;
            let verdict = pred.call(vars, &args)?;
            Ok((!verdict.is_truthy()).then_some(value))
        }
    }
}

/// Depth-first non-list leaves. Nil is the empty list, so it contributes
/// nothing.
fn flatten(value: &Value) -> Vector<Value> {
    fn walk(value: &Value, out: &mut Vector<Value>) {
        match value {
            Value::List(items) => {
                for item in items {
                    walk(item, out);
                }
            }
            Value::Nil => {}
            leaf => out.push_back(leaf.clone()),
        }
    }
    let mut out = Vector::new();
    walk(value, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{run_pipeline, NativeFn, Pattern, Processor};
    use crate::ast::Value;
    use crate::context::Vars;
    use crate::error::SorrelError;

    fn pipeline(procs: &[Processor], value: Value) -> Result<Option<Value>, SorrelError> {
        let mut vars = Vars::new();
        run_pipeline(procs, value, &mut vars)
    }

    #[test]
    fn constant_discards_the_input() {
        let got = pipeline(
            &[Processor::Constant(Value::symbol("ok"))],
            Value::Int(42),
        )
        .unwrap();
        assert_eq!(got, Some(Value::symbol("ok")));
    }

    #[test]
    fn flatten_collects_non_list_leaves_depth_first() {
        let tree = Value::list([
            Value::symbol("a"),
            Value::list([Value::symbol("b"), Value::list([Value::symbol("c")])]),
            Value::Nil,
            Value::vector([Value::symbol("d")]),
        ]);
        let got = pipeline(&[Processor::Flatten], tree).unwrap().unwrap();
        assert_eq!(
            got,
            Value::list([
                Value::symbol("a"),
                Value::symbol("b"),
                Value::symbol("c"),
                Value::vector([Value::symbol("d")]),
            ])
        );
    }

    #[test]
    fn string_join_appends_each_constituent_kind() {
        let tree = Value::list([
            Value::Char('a'),
            Value::list([Value::str("bc")]),
            Value::Byte(100),
            Value::symbol("ef"),
        ]);
        let got = pipeline(&[Processor::StringJoin], tree).unwrap().unwrap();
        assert_eq!(got, Value::str("abcdef"));
    }

    #[test]
    fn string_join_rejects_numbers() {
        let err = pipeline(&[Processor::StringJoin], Value::list([Value::Int(3)])).unwrap_err();
        assert!(matches!(err, SorrelError::TypeMismatch { .. }));
    }

    #[test]
    fn nested_patterns_bind_in_order_with_rest() {
        let pattern = Pattern::seq_with_rest(
            [
                Pattern::var("x"),
                Pattern::seq([Pattern::Ignore, Pattern::var("y")]),
            ],
            "more",
        );
        let value = Value::list([
            Value::Int(1),
            Value::list([Value::Int(2), Value::Int(3)]),
            Value::Int(4),
            Value::Int(5),
        ]);
        let mut bound = Vec::new();
        pattern.bind(&value, &mut bound).unwrap();
        assert_eq!(
            bound,
            vec![
                Value::Int(1),
                Value::Int(3),
                Value::list([Value::Int(4), Value::Int(5)]),
            ]
        );
    }

    #[test]
    fn pattern_arity_is_checked() {
        let pattern = Pattern::seq([Pattern::var("x"), Pattern::var("y")]);
        let mut bound = Vec::new();
        let err = pattern
            .bind(&Value::list([Value::Int(1)]), &mut bound)
            .unwrap_err();
        assert!(matches!(err, SorrelError::Arity(_)));
    }

    #[test]
    fn function_spreads_lists_and_passes_single_values_whole() {
        let sum = Arc::new(NativeFn::with_name("sum", |_, args| {
            let mut total = 0;
            for arg in args {
                match arg {
                    Value::Int(n) => total += n,
                    other => {
                        return Err(SorrelError::type_mismatch("integer", other.type_name()))
                    }
                }
            }
            Ok(Value::Int(total))
        }));
        let spread = pipeline(
            &[Processor::Function(sum.clone())],
            Value::list([Value::Int(1), Value::Int(2)]),
        )
        .unwrap();
        assert_eq!(spread, Some(Value::Int(3)));

        let single = pipeline(&[Processor::Function(sum)], Value::Int(5)).unwrap();
        assert_eq!(single, Some(Value::Int(5)));
    }

    #[test]
    fn test_processor_passes_the_original_value_or_declines() {
        let positive = Arc::new(NativeFn::new(|_, args| {
            Ok(match args {
                [Value::Int(n)] if *n > 0 => Value::symbol("t"),
                _ => Value::Nil,
            })
        }));
        let procs = [Processor::Test {
            pattern: Pattern::var("n"),
            pred: positive,
        }];
        assert_eq!(pipeline(&procs, Value::Int(3)).unwrap(), Some(Value::Int(3)));
        assert_eq!(pipeline(&procs, Value::Int(-3)).unwrap(), None);
    }

    #[test]
    fn declined_match_stops_the_pipeline() {
        let never = Arc::new(NativeFn::new(|_, _| Ok(Value::Nil)));
        let procs = [
            Processor::Test {
                pattern: Pattern::Ignore,
                pred: never,
            },
            Processor::Constant(Value::symbol("unreachable")),
        ];
        assert_eq!(pipeline(&procs, Value::Int(1)).unwrap(), None);
    }
}
