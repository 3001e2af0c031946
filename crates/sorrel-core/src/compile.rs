//! Rule bodies are written as data: s-expressions over [`Value`]. This
//! module lowers that surface form into the [`Expr`] tree the evaluator
//! runs. Compilation failures are fatal grammar errors.

use crate::ast::Value;
use crate::error::SorrelError;
use crate::expr::{Expr, ItemKind, RepBound, RepSpec, SeqKind};

/// A rule's formal parameter list: ordinary positional names plus an
/// optional rest-tail that soaks up the remaining arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Formals {
    pub required: Vec<String>,
    pub rest: Option<String>,
}

impl Formals {
    pub fn none() -> Self {
        Formals::default()
    }

    pub fn of(names: &[&str]) -> Self {
        Formals {
            required: names.iter().map(|n| n.to_string()).collect(),
            rest: None,
        }
    }

    pub fn with_rest(names: &[&str], rest: &str) -> Self {
        Formals {
            required: names.iter().map(|n| n.to_string()).collect(),
            rest: Some(rest.to_string()),
        }
    }

    /// Parameter index for `name`: positional parameters come first, the
    /// rest-tail sits one past them.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.required.iter().position(|p| p == name) {
            return Some(i);
        }
        match &self.rest {
            Some(rest) if rest == name => Some(self.required.len()),
            _ => None,
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.required.clone();
        if let Some(rest) = &self.rest {
            names.push(rest.clone());
        }
        names
    }
}

fn item_class(name: &str) -> Option<ItemKind> {
    match name {
        "symbol" => Some(ItemKind::Symbol),
        "character" => Some(ItemKind::Char),
        "byte" => Some(ItemKind::Byte),
        "number" => Some(ItemKind::Number),
        "list" => Some(ItemKind::List),
        "vector" => Some(ItemKind::Vector),
        "string" => Some(ItemKind::Str),
        "form" => Some(ItemKind::Form),
        "t" => Some(ItemKind::Truthy),
        "nil" => Some(ItemKind::NilItem),
        _ => None,
    }
}

/// Lower a body s-expression to a compiled expression. Symbols naming a
/// formal become parameter references; known bare symbols become item
/// classes; anything else symbolic becomes a rule call.
pub fn compile(body: &Value, formals: &Formals) -> Result<Expr, SorrelError> {
    match body {
        Value::Symbol(name) => {
            if let Some(index) = formals.index_of(name) {
                return Ok(Expr::Param(index));
            }
            if let Some(kind) = item_class(name) {
                return Ok(Expr::Item(kind));
            }
            Ok(Expr::Call {
                name: name.clone(),
                args: Vec::new(),
            })
        }
        Value::Int(_) | Value::Float(_) | Value::Char(_) | Value::Byte(_) | Value::Str(_) => {
            Ok(Expr::Lit(body.clone()))
        }
        Value::Vector(_) => Ok(Expr::Lit(body.clone())),
        Value::List(items) if !items.is_empty() => compile_form(body, formals),
        Value::Nil | Value::List(_) => Err(SorrelError::grammar("empty grammar expression")),
    }
}

fn compile_form(form: &Value, formals: &Formals) -> Result<Expr, SorrelError> {
    let items = form.as_list().expect("compile_form is only called on lists");
    let head = match items.get(0) {
        Some(Value::Symbol(name)) => name.clone(),
        Some(other) => {
            return Err(SorrelError::grammar(format!(
                "expected a symbol at the head of a grammar form, got {}",
                other.type_name()
            )))
        }
        None => unreachable!("empty lists are handled by compile"),
    };
    let args: Vec<Value> = items.iter().skip(1).cloned().collect();

    match head.as_str() {
        "quote" => {
            let value = one(&head, &args)?;
            Ok(Expr::Lit(value.clone()))
        }
        "and" => Ok(Expr::Seq(compile_all(&args, formals)?)),
        "or" => {
            at_least(&head, &args, 1)?;
            Ok(Expr::Choice(compile_all(&args, formals)?))
        }
        "*" => {
            let child = one(&head, &args)?;
            Ok(Expr::Star(Box::new(compile(child, formals)?)))
        }
        "+" => {
            let child = one(&head, &args)?;
            Ok(Expr::Plus(Box::new(compile(child, formals)?)))
        }
        "?" => {
            let child = one(&head, &args)?;
            Ok(Expr::Opt(Box::new(compile(child, formals)?)))
        }
        "rep" => compile_rep(&args, formals),
        "and~" => {
            at_least(&head, &args, 1)?;
            Ok(Expr::Unordered(compile_all(&args, formals)?))
        }
        "and~~" => compile_counted(&head, &args, formals),
        "&" => {
            let child = one(&head, &args)?;
            Ok(Expr::Peek(Box::new(compile(child, formals)?)))
        }
        "!" => {
            let child = one(&head, &args)?;
            Ok(Expr::PeekNot(Box::new(compile(child, formals)?)))
        }
        "not" => {
            let child = one(&head, &args)?;
            Ok(Expr::Not(Box::new(compile(child, formals)?)))
        }
        "list" => {
            let child = one(&head, &args)?;
            Ok(Expr::Descend(SeqKind::List, Box::new(compile(child, formals)?)))
        }
        "string" => {
            let child = one(&head, &args)?;
            Ok(Expr::Descend(SeqKind::Str, Box::new(compile(child, formals)?)))
        }
        "vector" => {
            let child = one(&head, &args)?;
            Ok(Expr::Descend(SeqKind::Vector, Box::new(compile(child, formals)?)))
        }
        name => {
            if formals.index_of(name).is_some() {
                return Err(SorrelError::grammar(format!(
                    "parameter '{}' cannot take arguments",
                    name
                )));
            }
            Ok(Expr::Call {
                name: name.to_string(),
                args: compile_all(&args, formals)?,
            })
        }
    }
}

fn compile_all(forms: &[Value], formals: &Formals) -> Result<Vec<Expr>, SorrelError> {
    forms.iter().map(|f| compile(f, formals)).collect()
}

fn one<'a>(head: &str, args: &'a [Value]) -> Result<&'a Value, SorrelError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(SorrelError::grammar(format!(
            "'{}' takes exactly one argument, got {}",
            head,
            args.len()
        ))),
    }
}

fn at_least(head: &str, args: &[Value], n: usize) -> Result<(), SorrelError> {
    if args.len() < n {
        return Err(SorrelError::grammar(format!(
            "'{}' needs at least {} argument{}, got {}",
            head,
            n,
            if n == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn compile_rep(args: &[Value], formals: &Formals) -> Result<Expr, SorrelError> {
    match args {
        [count, body] => {
            let bound = rep_bound(count)?;
            Ok(Expr::Rep {
                min: bound.clone(),
                max: Some(bound),
                body: Box::new(compile(body, formals)?),
            })
        }
        [min, max, body] => {
            let min = rep_bound(min)?;
            let max = if max.is_nil() {
                None
            } else {
                Some(rep_bound(max)?)
            };
            if let (RepBound::Const(lo), Some(RepBound::Const(hi))) = (&min, &max) {
                if hi < lo {
                    return Err(SorrelError::grammar(format!(
                        "'rep' bounds are inverted: {}..{}",
                        lo, hi
                    )));
                }
            }
            Ok(Expr::Rep {
                min,
                max,
                body: Box::new(compile(body, formals)?),
            })
        }
        _ => Err(SorrelError::grammar(format!(
            "'rep' takes a count (or min and max) and a body, got {} arguments",
            args.len()
        ))),
    }
}

fn rep_bound(value: &Value) -> Result<RepBound, SorrelError> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(RepBound::Const(*n as usize)),
        Value::Symbol(name) => Ok(RepBound::Name(name.clone())),
        other => Err(SorrelError::grammar(format!(
            "repetition bound must be a non-negative integer or a name, got {}",
            crate::value_format::display(other)
        ))),
    }
}

fn compile_counted(head: &str, args: &[Value], formals: &Formals) -> Result<Expr, SorrelError> {
    at_least(head, args, 2)?;
    let specs = args[0].as_list().ok_or_else(|| {
        SorrelError::grammar("'and~~' expects a list of repetition specifiers first")
    })?;
    let children = &args[1..];
    if specs.len() != children.len() {
        return Err(SorrelError::grammar(format!(
            "'and~~' has {} specifiers for {} children",
            specs.len(),
            children.len()
        )));
    }
    let specs = specs
        .iter()
        .map(rep_spec)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::UnorderedCounted {
        specs,
        children: compile_all(children, formals)?,
    })
}

fn rep_spec(value: &Value) -> Result<RepSpec, SorrelError> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(RepSpec {
            min: *n as usize,
            max: Some(*n as usize),
        }),
        v if v.is_nil() => Ok(RepSpec { min: 0, max: None }),
        Value::List(pair) if pair.len() == 2 => {
            let min = match pair.get(0) {
                Some(Value::Int(n)) if *n >= 0 => *n as usize,
                _ => {
                    return Err(SorrelError::grammar(
                        "repetition specifier minimum must be a non-negative integer",
                    ))
                }
            };
            let max = match pair.get(1) {
                Some(v) if v.is_nil() => None,
                Some(Value::Int(n)) if *n >= min as i64 => Some(*n as usize),
                _ => {
                    return Err(SorrelError::grammar(
                        "repetition specifier maximum must be nil or an integer >= the minimum",
                    ))
                }
            };
            Ok(RepSpec { min, max })
        }
        other => Err(SorrelError::grammar(format!(
            "bad repetition specifier: {}",
            crate::value_format::display(other)
        ))),
    }
}
