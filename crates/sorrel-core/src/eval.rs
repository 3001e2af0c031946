//! Expression evaluation and rule dispatch. Everything here returns
//! `Result<Outcome, SorrelError>`: a decline is an ordinary value the
//! caller can recover from (alternation, optionals), while `Err` carries
//! the fatal conditions that abort the whole parse.

use im::Vector;

use crate::ast::Value;
use crate::context::{Context, ParamFrame};
use crate::error::SorrelError;
use crate::expr::{Expr, ItemKind, RepBound};
use crate::position::Position;
use crate::process;
use crate::registry::{Registry, Rule};
use crate::trace;
use crate::unordered;

/// A match with its result value and the position after it, or a decline.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Matched { value: Value, pos: Position },
    Declined,
}

impl Outcome {
    pub fn matched(value: Value, pos: Position) -> Self {
        Outcome::Matched { value, pos }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Matched { .. })
    }
}

pub type EvalResult = Result<Outcome, SorrelError>;

pub fn eval(expr: &Expr, pos: &Position, ctx: &mut Context, reg: &Registry) -> EvalResult {
    match expr {
        Expr::Lit(value) => Ok(match_literal(value, pos)),
        Expr::Item(kind) => Ok(match_item(*kind, pos)),
        Expr::Seq(children) => {
            let mut results = Vector::new();
            let mut cur = pos.clone();
            for child in children {
                match eval(child, &cur, ctx, reg)? {
                    Outcome::Matched { value, pos: next } => {
                        results.push_back(value);
                        cur = next;
                    }
                    Outcome::Declined => return Ok(Outcome::Declined),
                }
            }
            Ok(Outcome::matched(Value::List(results), cur))
        }
        Expr::Choice(children) => {
            for child in children {
                if let Outcome::Matched { value, pos: next } = eval(child, pos, ctx, reg)? {
                    return Ok(Outcome::matched(value, next));
                }
            }
            Ok(Outcome::Declined)
        }
        Expr::Star(child) => repeat(child, pos, ctx, reg, 0, None),
        Expr::Plus(child) => repeat(child, pos, ctx, reg, 1, None),
        Expr::Opt(child) => match eval(child, pos, ctx, reg)? {
            Outcome::Matched { value, pos: next } => Ok(Outcome::matched(value, next)),
            Outcome::Declined => Ok(Outcome::matched(Value::Nil, pos.clone())),
        },
        Expr::Rep { min, max, body } => {
            let min = resolve_bound(min, ctx)?;
            let max = match max {
                Some(bound) => Some(resolve_bound(bound, ctx)?),
                None => None,
            };
            repeat(body, pos, ctx, reg, min, max)
        }
        Expr::Unordered(children) => unordered::eval_unordered(children, pos, ctx, reg),
        Expr::UnorderedCounted { specs, children } => {
            unordered::eval_unordered_counted(specs, children, pos, ctx, reg)
        }
        Expr::Peek(child) => match eval(child, pos, ctx, reg)? {
            Outcome::Matched { value, .. } => Ok(Outcome::matched(value, pos.clone())),
            Outcome::Declined => Ok(Outcome::Declined),
        },
        Expr::PeekNot(child) => match eval(child, pos, ctx, reg)? {
            Outcome::Matched { .. } => Ok(Outcome::Declined),
            Outcome::Declined => {
                let lookahead = pos.peek().unwrap_or(Value::Nil);
                Ok(Outcome::matched(lookahead, pos.clone()))
            }
        },
        Expr::Not(child) => match eval(child, pos, ctx, reg)? {
            Outcome::Matched { .. } => Ok(Outcome::Declined),
            Outcome::Declined => match (pos.peek(), pos.advance(1)) {
                (Some(item), Some(next)) => Ok(Outcome::matched(item, next)),
                _ => Ok(Outcome::Declined),
            },
        },
        Expr::Descend(kind, child) => {
            let item = match pos.peek() {
                Some(item) if kind.matches(&item) => item,
                _ => return Ok(Outcome::Declined),
            };
            let inner = match pos.descend(item) {
                Some(inner) => inner,
                None => return Ok(Outcome::Declined),
            };
            match eval(child, &inner, ctx, reg)? {
                // The child must consume the container's contents entirely.
                Outcome::Matched { value, pos: end } if end.at_frame_end() => {
                    match pos.advance(1) {
                        Some(next) => Ok(Outcome::matched(Value::list([value]), next)),
                        None => Ok(Outcome::Declined),
                    }
                }
                _ => Ok(Outcome::Declined),
            }
        }
        Expr::Call { name, args } => dispatch_rule(name, args, pos, ctx, reg),
        Expr::Param(index) => {
            let frame = match ctx.params.pop() {
                Some(frame) => frame,
                None => {
                    return Err(SorrelError::grammar(
                        "parameter reference outside a rule body",
                    ))
                }
            };
            // The argument expression replays in the caller's frame, so
            // parameters it mentions in turn keep their own meaning.
            let result = match frame.args.get(*index) {
                Some(expr) => {
                    let expr = expr.clone();
                    eval(&expr, pos, ctx, reg)
                }
                None => Err(SorrelError::arity(format!(
                    "no argument bound for parameter {}",
                    index
                ))),
            };
            ctx.params.push(frame);
            result
        }
    }
}

/// Strings and vectors are subsequence literals: their elements must equal
/// the frame's next items one for one. Anything else matches a single item
/// by equality.
fn match_literal(lit: &Value, pos: &Position) -> Outcome {
    match lit {
        Value::Str(s) => {
            let mut n = 0;
            for want in s.chars() {
                match pos.peek_at(n) {
                    Some(Value::Char(have)) if have == want => n += 1,
                    _ => return Outcome::Declined,
                }
            }
            match pos.advance(n) {
                Some(next) => Outcome::matched(lit.clone(), next),
                None => Outcome::Declined,
            }
        }
        Value::Vector(items) => {
            for (k, want) in items.iter().enumerate() {
                match pos.peek_at(k) {
                    Some(ref have) if have == want => {}
                    _ => return Outcome::Declined,
                }
            }
            match pos.advance(items.len()) {
                Some(next) => Outcome::matched(lit.clone(), next),
                None => Outcome::Declined,
            }
        }
        value => match pos.peek() {
            Some(ref have) if have == value => match pos.advance(1) {
                Some(next) => Outcome::matched(value.clone(), next),
                None => Outcome::Declined,
            },
            _ => Outcome::Declined,
        },
    }
}

fn match_item(kind: ItemKind, pos: &Position) -> Outcome {
    match pos.peek() {
        Some(item) if kind.matches(&item) => {
            let value = if kind == ItemKind::NilItem {
                Value::Nil
            } else {
                item
            };
            match pos.advance(1) {
                Some(next) => Outcome::matched(value, next),
                None => Outcome::Declined,
            }
        }
        _ => Outcome::Declined,
    }
}

/// Greedy repetition: take matches until the child declines or the upper
/// bound is reached, then succeed iff the count reached `min`. There is no
/// backtracking to a shorter prefix afterwards.
fn repeat(
    child: &Expr,
    pos: &Position,
    ctx: &mut Context,
    reg: &Registry,
    min: usize,
    max: Option<usize>,
) -> EvalResult {
    let mut results = Vector::new();
    let mut cur = pos.clone();
    while max.map_or(true, |m| results.len() < m) {
        match eval(child, &cur, ctx, reg)? {
            Outcome::Matched { value, pos: next } => {
                let progressed = next != cur;
                results.push_back(value);
                cur = next;
                // A match that consumed nothing would repeat forever.
                if !progressed {
                    break;
                }
            }
            Outcome::Declined => break,
        }
    }
    if results.len() >= min {
        Ok(Outcome::matched(Value::List(results), cur))
    } else {
        Ok(Outcome::Declined)
    }
}

/// A symbolic repetition bound resolves through the current rule's
/// parameters first, then the dynamic bindings; it must name a
/// non-negative integer.
fn resolve_bound(bound: &RepBound, ctx: &Context) -> Result<usize, SorrelError> {
    match bound {
        RepBound::Const(n) => Ok(*n),
        RepBound::Name(name) => {
            if let Some(frame) = ctx.params.last() {
                if let Some(expr) = frame.arg_for(name) {
                    return match expr {
                        Expr::Lit(Value::Int(n)) if *n >= 0 => Ok(*n as usize),
                        Expr::Lit(other) => Err(SorrelError::type_mismatch(
                            "non-negative integer",
                            other.type_name(),
                        )),
                        _ => Err(SorrelError::grammar(format!(
                            "count parameter '{}' must be bound to an integer literal",
                            name
                        ))),
                    };
                }
            }
            match ctx.vars.get(name)? {
                Value::Int(n) if n >= 0 => Ok(n as usize),
                other => Err(SorrelError::type_mismatch(
                    "non-negative integer",
                    other.type_name(),
                )),
            }
        }
    }
}

/// Run a named rule at `pos`: registry lookup, left-recursion guard,
/// parameter and let-frame setup, body, processor pipeline, trace hooks.
/// Cleanup is symmetric on every exit path, fatal errors included.
pub(crate) fn dispatch_rule(
    name: &str,
    args: &[Expr],
    pos: &Position,
    ctx: &mut Context,
    reg: &Registry,
) -> EvalResult {
    let rule = match reg.get(name) {
        Some(rule) => rule,
        None => return Err(SorrelError::undefined_rule(name)),
    };
    ctx.enter_rule(name, pos)?;
    let result = dispatch_body(&rule, args, pos, ctx, reg);
    ctx.leave_rule();
    result
}

fn dispatch_body(
    rule: &Rule,
    args: &[Expr],
    pos: &Position,
    ctx: &mut Context,
    reg: &Registry,
) -> EvalResult {
    let required = rule.formals.required.len();
    if args.len() < required || (args.len() > required && rule.formals.rest.is_none()) {
        return Err(SorrelError::arity(format!(
            "rule '{}' takes {}{} argument{}, got {}",
            rule.name,
            required,
            if rule.formals.rest.is_some() {
                " or more"
            } else {
                ""
            },
            if required == 1 { "" } else { "s" },
            args.len()
        )));
    }

    // A declared external must already have a cell somewhere up the
    // dynamic chain; otherwise the rule is running outside its required
    // context.
    for external in &rule.externals {
        if !ctx.vars.is_bound(external) {
            return Err(SorrelError::unbound_external(external));
        }
    }

    // Arguments stay unevaluated; the rest-tail becomes one sequence
    // expression over the leftovers.
    let mut bound: Vec<Expr> = args[..required].to_vec();
    if rule.formals.rest.is_some() {
        bound.push(Expr::Seq(args[required..].to_vec()));
    }
    ctx.params.push(ParamFrame {
        names: rule.formals.names(),
        args: bound,
    });
    ctx.vars.push_frame(&rule.lets);

    let recursive = rule.trace.map_or(false, |t| t.recursive);
    let traced = rule.trace.is_some() || ctx.forced_trace > 0;
    if recursive {
        ctx.forced_trace += 1;
    }
    let depth = ctx.depth();
    if traced {
        trace::entry(depth, &rule.name, pos);
    }

    let result = match eval(&rule.body, pos, ctx, reg) {
        Ok(Outcome::Matched { value, pos: end }) => {
            match process::run_pipeline(&rule.processors, value, &mut ctx.vars) {
                Ok(Some(value)) => Ok(Outcome::Matched { value, pos: end }),
                Ok(None) => Ok(Outcome::Declined),
                Err(err) => Err(err.in_rule(&rule.name)),
            }
        }
        other => other,
    };

    if traced {
        match &result {
            Ok(Outcome::Matched { value, .. }) => trace::exit_matched(depth, &rule.name, value),
            _ => trace::exit_failed(depth, &rule.name),
        }
    }
    if recursive {
        ctx.forced_trace -= 1;
    }
    ctx.vars.pop_frame();
    ctx.params.pop();
    result
}
