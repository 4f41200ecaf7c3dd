//! # EVM Word
//!
//! The 256-bit native value type. All arithmetic wraps modulo 2^256, signed
//! operations read the value as two's complement, and division or modulo by zero
//! yields zero rather than failing.

use crate::domain::value_objects::{Address, U256};
use crate::errors::ExceptionKind;
use primitive_types::U512;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a word in bytes.
pub const WORD_BYTES: usize = 32;

/// A 256-bit EVM word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Word(pub U256);

#[allow(clippy::should_implement_trait)]
impl Word {
    /// Zero.
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));
    /// One.
    pub const ONE: Self = Self(U256([1, 0, 0, 0]));
    /// 2^256 - 1, also -1 in two's complement.
    pub const MAX: Self = Self(U256::MAX);

    /// Signed minimum, -2^255.
    const SIGNED_MIN: U256 = U256([0, 0, 0, 0x8000_0000_0000_0000]);

    // -------------------------------------------------------------------------
    // Conversions
    // -------------------------------------------------------------------------

    /// Reads a big-endian 32-byte array.
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; WORD_BYTES]) -> Self {
        Self(U256::from_big_endian(&bytes))
    }

    /// Reads up to 32 big-endian bytes, right-aligned (PUSH semantics).
    #[must_use]
    pub fn from_be_slice(bytes: &[u8]) -> Self {
        let start = bytes.len().saturating_sub(WORD_BYTES);
        Self(U256::from_big_endian(&bytes[start..]))
    }

    /// Big-endian 32-byte representation.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; WORD_BYTES] {
        let mut out = [0u8; WORD_BYTES];
        self.0.to_big_endian(&mut out);
        out
    }

    /// Low 20 bytes as an address.
    #[must_use]
    pub fn to_address(&self) -> Address {
        let bytes = self.to_be_bytes();
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes[12..]);
        Address::new(addr)
    }

    /// Converts to a bounded integer for offsets, lengths and gas.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` when the value exceeds 64-bit addressing: no gas
    /// budget could ever pay for such a request.
    pub fn to_u64(&self) -> Result<u64, ExceptionKind> {
        if self.0.bits() > 64 {
            return Err(ExceptionKind::OutOfGas);
        }
        Ok(self.0.low_u64())
    }

    /// Converts to `usize`, failing like [`Word::to_u64`].
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` when the value does not fit.
    pub fn to_usize(&self) -> Result<usize, ExceptionKind> {
        usize::try_from(self.to_u64()?).map_err(|_| ExceptionKind::OutOfGas)
    }

    /// Converts to `usize`, clamping to `usize::MAX`.
    ///
    /// Used for source offsets where out-of-range simply reads zeros.
    #[must_use]
    pub fn saturating_usize(&self) -> usize {
        self.to_usize().unwrap_or(usize::MAX)
    }

    /// Converts to `u64`, clamping to `u64::MAX`.
    #[must_use]
    pub fn saturating_u64(&self) -> u64 {
        self.to_u64().unwrap_or(u64::MAX)
    }

    /// Number of significant bytes (EXP pricing).
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        (self.0.bits() as u64).div_ceil(8)
    }

    /// Returns true if zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the sign bit is set.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.bit(255)
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    /// ADD.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self(self.0.overflowing_add(other.0).0)
    }

    /// SUB.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self(self.0.overflowing_sub(other.0).0)
    }

    /// MUL.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self(self.0.overflowing_mul(other.0).0)
    }

    /// DIV. Zero divisor yields zero.
    #[must_use]
    pub fn div(self, other: Self) -> Self {
        if other.is_zero() {
            return Self::ZERO;
        }
        Self(self.0 / other.0)
    }

    /// MOD. Zero modulus yields zero.
    #[must_use]
    pub fn modulo(self, other: Self) -> Self {
        if other.is_zero() {
            return Self::ZERO;
        }
        Self(self.0 % other.0)
    }

    /// SDIV. Result truncates toward zero; `MIN / -1` wraps to `MIN`.
    #[must_use]
    pub fn sdiv(self, other: Self) -> Self {
        if other.is_zero() {
            return Self::ZERO;
        }
        let negative = self.is_negative() != other.is_negative();
        let quotient = Self(self.abs().0 / other.abs().0);
        if negative {
            quotient.negate()
        } else {
            quotient
        }
    }

    /// SMOD. Result takes the sign of the dividend.
    #[must_use]
    pub fn smod(self, other: Self) -> Self {
        if other.is_zero() {
            return Self::ZERO;
        }
        let remainder = Self(self.abs().0 % other.abs().0);
        if self.is_negative() {
            remainder.negate()
        } else {
            remainder
        }
    }

    /// ADDMOD, computed without intermediate overflow.
    #[must_use]
    pub fn addmod(self, other: Self, modulus: Self) -> Self {
        if modulus.is_zero() {
            return Self::ZERO;
        }
        let sum = U512::from(self.0) + U512::from(other.0);
        Self::from_u512(sum % U512::from(modulus.0))
    }

    /// MULMOD, computed without intermediate overflow.
    #[must_use]
    pub fn mulmod(self, other: Self, modulus: Self) -> Self {
        if modulus.is_zero() {
            return Self::ZERO;
        }
        let product = U512::from(self.0) * U512::from(other.0);
        Self::from_u512(product % U512::from(modulus.0))
    }

    /// EXP by repeated squaring, wrapping.
    #[must_use]
    pub fn exp(self, exponent: Self) -> Self {
        let mut result = U256::one();
        let mut base = self.0;
        let mut exp = exponent.0;
        while !exp.is_zero() {
            if exp.bit(0) {
                result = result.overflowing_mul(base).0;
            }
            exp >>= 1;
            base = base.overflowing_mul(base).0;
        }
        Self(result)
    }

    /// SIGNEXTEND: extends the sign bit of byte `self` (counted from the low end)
    /// of `value`.
    #[must_use]
    pub fn signextend(self, value: Self) -> Self {
        if self.0 >= U256::from(31) {
            return value;
        }
        let bit = self.0.low_u64() as usize * 8 + 7;
        let mask = (U256::one() << bit) - U256::one();
        if value.0.bit(bit) {
            Self(value.0 | !mask)
        } else {
            Self(value.0 & mask)
        }
    }

    // -------------------------------------------------------------------------
    // Comparison
    // -------------------------------------------------------------------------

    /// Unsigned LT.
    #[must_use]
    pub fn lt(&self, other: &Self) -> bool {
        self.0 < other.0
    }

    /// Unsigned GT.
    #[must_use]
    pub fn gt(&self, other: &Self) -> bool {
        self.0 > other.0
    }

    /// Signed LT.
    #[must_use]
    pub fn slt(&self, other: &Self) -> bool {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.0 < other.0,
        }
    }

    /// Signed GT.
    #[must_use]
    pub fn sgt(&self, other: &Self) -> bool {
        other.slt(self)
    }

    // -------------------------------------------------------------------------
    // Bitwise
    // -------------------------------------------------------------------------

    /// AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// XOR.
    #[must_use]
    pub fn xor(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    /// NOT.
    #[must_use]
    pub fn not(self) -> Self {
        Self(!self.0)
    }

    /// BYTE: the `self`-th byte of `value`, counting from the most significant.
    #[must_use]
    pub fn byte(self, value: Self) -> Self {
        if self.0 >= U256::from(WORD_BYTES) {
            return Self::ZERO;
        }
        let index = self.0.low_u64() as usize;
        Self(U256::from(value.to_be_bytes()[index]))
    }

    /// SHL: `value << self`.
    #[must_use]
    pub fn shl(self, value: Self) -> Self {
        if self.0 >= U256::from(256) {
            return Self::ZERO;
        }
        Self(value.0 << self.0.low_u64() as usize)
    }

    /// SHR: logical `value >> self`.
    #[must_use]
    pub fn shr(self, value: Self) -> Self {
        if self.0 >= U256::from(256) {
            return Self::ZERO;
        }
        Self(value.0 >> self.0.low_u64() as usize)
    }

    /// SAR: arithmetic `value >> self`, filling with the sign bit.
    #[must_use]
    pub fn sar(self, value: Self) -> Self {
        if !value.is_negative() {
            return self.shr(value);
        }
        if self.0 >= U256::from(256) {
            return Self::MAX;
        }
        let shift = self.0.low_u64() as usize;
        Self(!(!value.0 >> shift))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn negate(self) -> Self {
        Self((!self.0).overflowing_add(U256::one()).0)
    }

    fn abs(self) -> Self {
        if self.is_negative() && self.0 != Self::SIGNED_MIN {
            self.negate()
        } else {
            self
        }
    }

    fn from_u512(value: U512) -> Self {
        let mut bytes = [0u8; 64];
        value.to_big_endian(&mut bytes);
        Self(U256::from_big_endian(&bytes[32..]))
    }
}

impl From<U256> for Word {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<Word> for U256 {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Self(U256::from(value))
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }
}

impl From<Address> for Word {
    fn from(address: Address) -> Self {
        Self(U256::from_big_endian(address.as_bytes()))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#x})", self.0)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
