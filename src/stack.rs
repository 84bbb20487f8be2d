//! Evaluation stack: the only intermediate representation between
//! operations.

use crate::error::CompileError;
use crate::value::Symbol;

/// LIFO sequence of symbols.
#[derive(Clone, Debug, Default)]
pub struct EvalStack {
    items: Vec<Symbol>,
}

impl EvalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.items.push(symbol);
    }

    /// Remove the top symbol. Callers check depth with `require` first;
    /// `None` means that contract was broken.
    pub fn pop(&mut self) -> Option<Symbol> {
        self.items.pop()
    }

    /// Pop for operation `op`, reporting `StackUnderflow` instead of `None`.
    pub fn take(&mut self, op: &'static str) -> Result<Symbol, CompileError> {
        let depth = self.items.len();
        self.items.pop().ok_or(CompileError::StackUnderflow {
            op,
            needed: 1,
            depth,
        })
    }

    /// The symbol `depth` places below the top (0 = top).
    pub fn peek(&self, depth: usize) -> Option<&Symbol> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.items.get(i))
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fail with `StackUnderflow` unless at least `needed` symbols are present.
    pub fn require(&self, op: &'static str, needed: usize) -> Result<(), CompileError> {
        if self.items.len() < needed {
            return Err(CompileError::StackUnderflow {
                op,
                needed,
                depth: self.items.len(),
            });
        }
        Ok(())
    }

    /// Bottom-to-top view.
    pub fn as_slice(&self) -> &[Symbol] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_push_pop() {
        let mut stack = EvalStack::new();
        stack.push(Symbol::from(1));
        stack.push(Symbol::ident("a"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop(), Some(Symbol::ident("a")));
        assert_eq!(stack.pop(), Some(Symbol::from(1)));
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_peek_from_top() {
        let mut stack = EvalStack::new();
        stack.push(Symbol::from(1));
        stack.push(Symbol::from(2));
        assert_eq!(stack.peek(0), Some(&Symbol::from(2)));
        assert_eq!(stack.peek(1), Some(&Symbol::from(1)));
        assert_eq!(stack.peek(2), None);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_require_reports_depth() {
        let mut stack = EvalStack::new();
        stack.push(Symbol::from(1));
        assert!(stack.require("assign", 1).is_ok());
        match stack.require("triplet", 2) {
            Err(CompileError::StackUnderflow { op, needed, depth }) => {
                assert_eq!(op, "triplet");
                assert_eq!(needed, 2);
                assert_eq!(depth, 1);
            }
            other => panic!("expected underflow, got {:?}", other),
        }
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_take_on_empty_is_underflow() {
        let mut stack = EvalStack::new();
        assert!(matches!(
            stack.take("print"),
            Err(CompileError::StackUnderflow { depth: 0, .. })
        ));
        stack.push(Symbol::text("hi"));
        assert_eq!(stack.take("print").unwrap(), Symbol::text("hi"));
    }
}
