use std::fmt;

use thiserror::Error;

/// Payload for fatal grammar and usage errors: a message plus the rule it
/// was observed in, when known.
#[derive(Clone, Debug, Default)]
pub struct ErrorData {
    pub message: String,
    pub rule: Option<String>,
}

impl ErrorData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rule: None,
        }
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "{} (in rule '{}')", self.message, rule),
            None => write!(f, "{}", self.message),
        }
    }
}

/// The fatal error kinds. A combinator declining to match is *not* an
/// error; it is an [`Outcome`](crate::eval::Outcome) the evaluator returns
/// as a value.
#[derive(Error, Debug, Clone)]
pub enum SorrelError {
    #[error("undefined rule '{0}'")]
    UndefinedRule(String),

    #[error("left recursion detected: rule '{rule}' re-entered at {position}")]
    LeftRecursion { rule: String, position: String },

    #[error("unbound external variable '{0}'")]
    UnboundExternal(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("arity mismatch: {0}")]
    Arity(ErrorData),

    #[error("grammar error: {0}")]
    Grammar(ErrorData),
}

impl SorrelError {
    pub fn undefined_rule(name: impl Into<String>) -> Self {
        SorrelError::UndefinedRule(name.into())
    }

    pub fn left_recursion(rule: impl Into<String>, position: impl Into<String>) -> Self {
        SorrelError::LeftRecursion {
            rule: rule.into(),
            position: position.into(),
        }
    }

    pub fn unbound_external(name: impl Into<String>) -> Self {
        SorrelError::UnboundExternal(name.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        SorrelError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        SorrelError::Arity(ErrorData::new(message))
    }

    pub fn grammar(message: impl Into<String>) -> Self {
        SorrelError::Grammar(ErrorData::new(message))
    }

    /// Attach the rule name to errors that carry a site, keeping the first
    /// one recorded.
    pub fn in_rule(mut self, name: &str) -> Self {
        match &mut self {
            SorrelError::Arity(data) | SorrelError::Grammar(data) => {
                if data.rule.is_none() {
                    data.rule = Some(name.to_string());
                }
            }
            _ => {}
        }
        self
    }
}
