//! Typed read result for the offline store.
//!
//! Reads never fail outright. A read either yields a value (absent keys yield
//! the type's empty value) or reports the store as unavailable, so callers
//! can tell "nothing buffered" apart from "could not read the buffer".

/// Outcome of reading persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Stored<T> {
    /// The read succeeded.
    Value(T),
    /// Storage failed or held data that could not be decoded.
    Unavailable { reason: String },
}

impl<T> Stored<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Stored::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Stored::Unavailable { .. })
    }

    /// The value, if the read succeeded.
    pub fn value(self) -> Option<T> {
        match self {
            Stored::Value(v) => Some(v),
            Stored::Unavailable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Stored<U> {
        match self {
            Stored::Value(v) => Stored::Value(f(v)),
            Stored::Unavailable { reason } => Stored::Unavailable { reason },
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.value().unwrap_or(fallback)
    }
}

impl<T: Default> Stored<T> {
    /// Degrade an unavailable read to the empty value.
    pub fn or_default(self) -> T {
        self.value().unwrap_or_default()
    }
}
