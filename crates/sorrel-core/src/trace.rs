//! Rule tracing. When a rule's trace flag is set, its dispatches log an
//! entry and an exit line to the process-wide sink. The format is stable
//! and line-oriented:
//!
//! ```text
//! <indent><depth>: <rule> @ <index>/<len> ?
//! <indent><depth>: <rule> <- <result>
//! <indent><depth>: <rule> x-
//! ```
//!
//! with two spaces of indent per dispatch depth. Tracing writes are
//! best-effort and never alter parse outcomes.

use std::io::{self, Write};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::ast::Value;
use crate::position::Position;
use crate::value_format;

static TRACE_SINK: Lazy<Mutex<Box<dyn Write + Send>>> =
    Lazy::new(|| Mutex::new(Box::new(io::stderr())));

/// Replace the trace sink. Tests typically install a shared buffer.
pub fn set_trace_sink(sink: Box<dyn Write + Send>) {
    *TRACE_SINK.lock().unwrap() = sink;
}

fn emit(line: String) {
    let mut sink = TRACE_SINK.lock().unwrap();
    let _ = writeln!(sink, "{}", line);
    let _ = sink.flush();
}

pub(crate) fn entry(depth: usize, rule: &str, pos: &Position) {
    emit(format!(
        "{}{}: {} @ {} ?",
        "  ".repeat(depth),
        depth,
        rule,
        value_format::position_summary(pos)
    ));
}

pub(crate) fn exit_matched(depth: usize, rule: &str, result: &Value) {
    emit(format!(
        "{}{}: {} <- {}",
        "  ".repeat(depth),
        depth,
        rule,
        value_format::display(result)
    ));
}

pub(crate) fn exit_failed(depth: usize, rule: &str) {
    emit(format!("{}{}: {} x-", "  ".repeat(depth), depth, rule));
}
