//! Unordered sequence matching. Both engines are incremental: at each input
//! step, at most one attempt per still-eligible child, committed on first
//! success. That keeps the cost at (children x input length) rather than
//! the factorial blowup a permutation expansion would give.

use im::Vector;

use crate::ast::Value;
use crate::context::Context;
use crate::eval::{eval, EvalResult, Outcome};
use crate::error::SorrelError;
use crate::expr::{Expr, RepSpec};
use crate::position::Position;
use crate::registry::Registry;

/// Children matched consecutively in some permutation, each exactly once:
/// at every step the first still-unused child that matches at the current
/// position is committed to. Results come back in declaration order.
pub(crate) fn eval_unordered(
    children: &[Expr],
    pos: &Position,
    ctx: &mut Context,
    reg: &Registry,
) -> EvalResult {
    let mut used = vec![false; children.len()];
    let mut results: Vec<Option<Value>> = vec![None; children.len()];
    let mut cur = pos.clone();
    for _ in 0..children.len() {
        let mut committed = None;
        for (i, child) in children.iter().enumerate() {
            if used[i] {
                continue;
            }
            if let Outcome::Matched { value, pos: next } = eval(child, &cur, ctx, reg)? {
                used[i] = true;
                results[i] = Some(value);
                committed = Some(next);
                break;
            }
        }
        match committed {
            Some(next) => cur = next,
            None => return Ok(Outcome::Declined),
        }
    }
    let values: Vector<Value> = results
        .into_iter()
        .map(|v| v.expect("every child committed a match"))
        .collect();
    Ok(Outcome::matched(Value::List(values), cur))
}

/// The counted variant: every child carries a repetition specifier.
/// Children short of their minimum get first claim at each step, in
/// declaration order, with the other still-repeatable children as the
/// fallback tier. The match ends when no child can take the next input,
/// and succeeds iff all minima were met. The result groups each child's
/// matches, in input order, keyed by declaration order.
pub(crate) fn eval_unordered_counted(
    specs: &[RepSpec],
    children: &[Expr],
    pos: &Position,
    ctx: &mut Context,
    reg: &Registry,
) -> EvalResult {
    let mut counts = vec![0usize; children.len()];
    let mut collected: Vec<Vector<Value>> = vec![Vector::new(); children.len()];
    let mut cur = pos.clone();
    loop {
        match step(specs, children, &counts, &cur, ctx, reg)? {
            Some((i, value, next)) => {
                counts[i] += 1;
                collected[i].push_back(value);
                let progressed = next != cur;
                cur = next;
                // A zero-width match cannot make further progress.
                if !progressed {
                    break;
                }
            }
            None => break,
        }
    }
    if counts.iter().zip(specs).all(|(count, spec)| *count >= spec.min) {
        let groups: Vector<Value> = collected.into_iter().map(Value::List).collect();
        Ok(Outcome::matched(Value::List(groups), cur))
    } else {
        Ok(Outcome::Declined)
    }
}

// One step: children short of their minimum get first claim, then the
// rest of the still-repeatable ones. A child short of its minimum is
// necessarily below its maximum, so the two tiers never overlap.
fn step(
    specs: &[RepSpec],
    children: &[Expr],
    counts: &[usize],
    cur: &Position,
    ctx: &mut Context,
    reg: &Registry,
) -> Result<Option<(usize, Value, Position)>, SorrelError> {
    for (i, child) in children.iter().enumerate() {
        if counts[i] < specs[i].min {
            if let Outcome::Matched { value, pos } = eval(child, cur, ctx, reg)? {
                return Ok(Some((i, value, pos)));
            }
        }
    }
    for (i, child) in children.iter().enumerate() {
        if counts[i] >= specs[i].min && specs[i].max.map_or(true, |max| counts[i] < max) {
            if let Outcome::Matched { value, pos } = eval(child, cur, ctx, reg)? {
                return Ok(Some((i, value, pos)));
            }
        }
    }
    Ok(None)
}
