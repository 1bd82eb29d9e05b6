//! Response envelope handling
//!
//! Backend list and detail endpoints answer either with a bare payload or
//! with the payload wrapped as `{"ok": true, "data": ...}`. Callers decode
//! through [`Envelope`] and never care which shape arrived.

use serde::{Deserialize, Serialize};

/// A payload that may or may not be wrapped in `{data: ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap the payload regardless of shape
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}
