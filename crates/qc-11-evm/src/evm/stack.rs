//! # EVM Stack
//!
//! Bounded LIFO of words owned by one frame. Maximum 1024 elements.

use super::word::Word;
use crate::errors::ExceptionKind;

/// Maximum stack size.
pub const MAX_STACK_SIZE: usize = 1024;

/// EVM stack implementation.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    /// Creates a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(64),
        }
    }

    /// Returns the number of elements on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks that an opcode taking `inputs` and leaving `outputs` items fits.
    ///
    /// # Errors
    ///
    /// `StackTooSmall` when fewer than `inputs` items are present,
    /// `StackOverflow` when the result would exceed the limit.
    pub fn require(&self, inputs: usize, outputs: usize) -> Result<(), ExceptionKind> {
        let available = self.data.len();
        if available < inputs {
            return Err(ExceptionKind::StackTooSmall {
                required: inputs,
                available,
            });
        }
        if available - inputs + outputs > MAX_STACK_SIZE {
            return Err(ExceptionKind::StackOverflow);
        }
        Ok(())
    }

    /// Push a value onto the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack is full.
    pub fn push(&mut self, value: Word) -> Result<(), ExceptionKind> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(ExceptionKind::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackTooSmall` if the stack is empty.
    pub fn pop(&mut self) -> Result<Word, ExceptionKind> {
        self.data.pop().ok_or(ExceptionKind::StackTooSmall {
            required: 1,
            available: 0,
        })
    }

    /// Pops `N` values, top of stack first.
    ///
    /// # Errors
    ///
    /// Returns `StackTooSmall` without popping anything if fewer than `N` remain.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N], ExceptionKind> {
        let available = self.data.len();
        if available < N {
            return Err(ExceptionKind::StackTooSmall {
                required: N,
                available,
            });
        }
        let mut out = [Word::ZERO; N];
        for slot in &mut out {
            // Length checked above.
            *slot = self.data.pop().unwrap_or_default();
        }
        Ok(out)
    }

    /// Peek at a value at a given depth (0 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackTooSmall` if the index is out of bounds.
    pub fn peek(&self, depth: usize) -> Result<Word, ExceptionKind> {
        let available = self.data.len();
        if depth >= available {
            return Err(ExceptionKind::StackTooSmall {
                required: depth + 1,
                available,
            });
        }
        Ok(self.data[available - 1 - depth])
    }

    /// Swap the top element with the element at depth n (SWAPn, n >= 1).
    ///
    /// # Errors
    ///
    /// Returns `StackTooSmall` if not enough elements.
    pub fn swap(&mut self, n: usize) -> Result<(), ExceptionKind> {
        let len = self.data.len();
        if n == 0 || n >= len {
            return Err(ExceptionKind::StackTooSmall {
                required: n + 1,
                available: len,
            });
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Duplicate the n-th element from the top (DUPn, n >= 1) and push it.
    ///
    /// # Errors
    ///
    /// Returns `StackTooSmall` if not enough elements, `StackOverflow` if full.
    pub fn dup(&mut self, n: usize) -> Result<(), ExceptionKind> {
        let len = self.data.len();
        if n == 0 || n > len {
            return Err(ExceptionKind::StackTooSmall {
                required: n,
                available: len,
            });
        }
        let value = self.data[len - n];
        self.push(value)
    }

    /// Get a reference to the underlying data for debugging.
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.data
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(Word::from(42u64)).unwrap();
        stack.push(Word::from(100u64)).unwrap();

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap(), Word::from(100u64));
        assert_eq!(stack.pop().unwrap(), Word::from(42u64));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_n_order() {
        let mut stack = Stack::new();
        for i in 1..=3u64 {
            stack.push(Word::from(i)).unwrap();
        }
        let [a, b] = stack.pop_n::<2>().unwrap();
        assert_eq!(a, Word::from(3u64));
        assert_eq!(b, Word::from(2u64));
        assert_eq!(stack.len(), 1);

        assert!(stack.pop_n::<2>().is_err());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_peek() {
        let mut stack = Stack::new();
        stack.push(Word::from(1u64)).unwrap();
        stack.push(Word::from(2u64)).unwrap();

        assert_eq!(stack.peek(0).unwrap(), Word::from(2u64));
        assert_eq!(stack.peek(1).unwrap(), Word::from(1u64));
        assert!(stack.peek(2).is_err());
    }

    #[test]
    fn test_swap() {
        let mut stack = Stack::new();
        for i in 1..=3u64 {
            stack.push(Word::from(i)).unwrap();
        }

        stack.swap(2).unwrap();
        assert_eq!(stack.peek(0).unwrap(), Word::from(1u64));
        assert_eq!(stack.peek(2).unwrap(), Word::from(3u64));
        assert!(stack.swap(3).is_err());
    }

    #[test]
    fn test_dup() {
        let mut stack = Stack::new();
        stack.push(Word::from(1u64)).unwrap();
        stack.push(Word::from(2u64)).unwrap();

        stack.dup(2).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(0).unwrap(), Word::from(1u64));
        assert!(stack.dup(4).is_err());
    }

    #[test]
    fn test_overflow() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK_SIZE {
            stack.push(Word::from(i)).unwrap();
        }
        assert_eq!(
            stack.push(Word::ZERO),
            Err(ExceptionKind::StackOverflow)
        );
        assert_eq!(stack.len(), MAX_STACK_SIZE);
    }

    #[test]
    fn test_empty_pop_is_too_small() {
        let mut stack = Stack::new();
        assert_eq!(
            stack.pop(),
            Err(ExceptionKind::StackTooSmall {
                required: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_require() {
        let mut stack = Stack::new();
        assert!(stack.require(0, 1).is_ok());
        assert!(matches!(
            stack.require(2, 1),
            Err(ExceptionKind::StackTooSmall { required: 2, .. })
        ));

        for _ in 0..MAX_STACK_SIZE {
            stack.push(Word::ONE).unwrap();
        }
        assert_eq!(stack.require(0, 1), Err(ExceptionKind::StackOverflow));
        assert!(stack.require(2, 1).is_ok());
    }
}
