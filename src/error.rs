use std::io;

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::value::Type;

/// Failure of a single compiler operation.
///
/// A failed operation changes nothing: the stack, symbol table and
/// instruction list are exactly as they were before the call.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("stack underflow: `{op}` needs {needed} value(s) but the stack holds {depth}")]
    StackUnderflow {
        op: &'static str,
        needed: usize,
        depth: usize,
    },

    #[error("unsupported operand type for `{op}`: {detail}")]
    UnsupportedOperandType { op: &'static str, detail: String },

    #[error("`{name}` is already declared as {ty}")]
    DuplicateDeclaration { name: String, ty: Type },

    #[error("cannot write {target}: {source}")]
    OutputUnavailable {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    pub(crate) fn unsupported(op: &'static str, detail: impl Into<String>) -> Self {
        Self::UnsupportedOperandType {
            op,
            detail: detail.into(),
        }
    }

    pub(crate) fn output(target: impl Into<String>, source: io::Error) -> Self {
        Self::OutputUnavailable {
            target: target.into(),
            source,
        }
    }

    /// Convert to a diagnostic anchored at `span`.
    pub fn to_diagnostic(&self, span: Span) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string(), span);
        match self {
            CompileError::StackUnderflow { .. } => {
                diag.with_help("push the operands before applying the operation".to_string())
            }
            CompileError::DuplicateDeclaration { ty: Type::Str, .. } => {
                diag.with_note("the name labels a pooled string literal".to_string())
            }
            CompileError::DuplicateDeclaration { .. } => diag.with_note(
                "the target is configured to reject redeclaration (redeclare = \"reject\")"
                    .to_string(),
            ),
            CompileError::UnsupportedOperandType { .. } | CompileError::OutputUnavailable { .. } => {
                diag
            }
        }
    }
}
