//! Printable renderings of values and positions, used by error messages
//! and trace output.

use std::fmt;

use crate::ast::Value;
use crate::position::Position;

struct DisplayValue<'a>(&'a Value);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.0)
    }
}

/// A displayable wrapper; `format!("{}", display(&v))` renders the value
/// in surface syntax.
pub fn display(value: &Value) -> impl fmt::Display + '_ {
    DisplayValue(value)
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Symbol(name) => f.write_str(name),
        Value::Char(c) => write!(f, "\\{}", c),
        Value::Byte(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => {
            let text = x.to_string();
            if text.contains('.') || text.contains('e') || !x.is_finite() {
                f.write_str(&text)
            } else {
                write!(f, "{}.0", text)
            }
        }
        Value::Str(s) => {
            f.write_str("\"")?;
            for c in s.chars() {
                match c {
                    '"' => f.write_str("\\\"")?,
                    '\\' => f.write_str("\\\\")?,
                    _ => write!(f, "{}", c)?,
                }
            }
            f.write_str("\"")
        }
        Value::Vector(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, item)?;
            }
            f.write_str("]")
        }
        Value::List(items) if items.is_empty() => f.write_str("nil"),
        Value::List(items) => {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, item)?;
            }
            f.write_str(")")
        }
        Value::Nil => f.write_str("nil"),
    }
}

/// Compact rendering of a cursor: `index/len` of the current frame, with a
/// `~depth` marker when the cursor sits inside a nested container.
pub fn position_summary(pos: &Position) -> String {
    if pos.depth() > 1 {
        format!("{}/{}~{}", pos.index(), pos.frame_len(), pos.depth())
    } else {
        format!("{}/{}", pos.index(), pos.frame_len())
    }
}
