//! Success-or-degraded results for best-effort operations.
//!
//! Translation, experiment logging and artifact transfer without a bucket
//! all have a fallback. They return an [`Outcome`] so the caller decides
//! whether running degraded is acceptable instead of the callee swallowing
//! the failure.

/// Result of a best-effort operation that always yields a usable value.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// The operation did what was asked.
    Complete(T),
    /// The operation fell back; `value` is the fallback.
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Outcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Complete(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
