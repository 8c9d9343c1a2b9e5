//! Scripted join code generator for tests and demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::session::SessionCode;
use crate::ports::CodeGenerator;

/// Hands out a scripted sequence of codes, then repeats the last one.
#[derive(Debug)]
pub struct FixedCodeGenerator {
    queue: Mutex<VecDeque<SessionCode>>,
    fallback: SessionCode,
}

impl FixedCodeGenerator {
    /// Generator that always returns `code`.
    pub fn always(code: SessionCode) -> Self {
        Self::sequence(Vec::new(), code)
    }

    /// Returns `codes` in order, then `fallback` forever.
    pub fn sequence(codes: Vec<SessionCode>, fallback: SessionCode) -> Self {
        Self {
            queue: Mutex::new(codes.into()),
            fallback,
        }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> SessionCode {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
