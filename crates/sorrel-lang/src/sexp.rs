//! Constructors for writing rule bodies (and inputs) as data.

use sorrel_core::Value;

pub fn sym(name: &str) -> Value {
    Value::symbol(name)
}

pub fn ch(c: char) -> Value {
    Value::Char(c)
}

pub fn byte(b: u8) -> Value {
    Value::Byte(b)
}

pub fn int(n: i64) -> Value {
    Value::Int(n)
}

pub fn float(x: f64) -> Value {
    Value::Float(x)
}

pub fn text(s: &str) -> Value {
    Value::str(s)
}

pub fn nil() -> Value {
    Value::Nil
}

pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
    Value::list(items)
}

pub fn vector(items: impl IntoIterator<Item = Value>) -> Value {
    Value::vector(items)
}

/// `(quote value)` — a literal in a rule body.
pub fn q(value: Value) -> Value {
    list([sym("quote"), value])
}

/// `(head args...)` — a combinator or rule-call form.
pub fn form(head: &str, args: impl IntoIterator<Item = Value>) -> Value {
    let mut items = vec![sym(head)];
    items.extend(args);
    Value::list(items)
}
