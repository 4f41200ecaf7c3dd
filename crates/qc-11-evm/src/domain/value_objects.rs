//! # Value Objects
//!
//! Immutable domain primitives shared by the interpreter and its collaborators.
//! These types are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for 256-bit arithmetic
pub use primitive_types::U256;

/// Writes `bytes` as lowercase hex after a `0x` prefix.
fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("0x")?;
    bytes.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
}

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account address.
///
/// Ordered so that touched-account sets iterate deterministically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Wraps a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Places `value` big-endian in the low 8 bytes.
    ///
    /// Handy for the reserved precompile range and for fixtures.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// `None` unless `slice` is exactly 20 bytes long.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The last byte, when the first 19 are zero.
    ///
    /// Precompiles live at indices 1..=N of this range.
    #[must_use]
    pub fn low_byte_index(&self) -> Option<u8> {
        match self.0.split_last() {
            Some((&last, head)) if head.iter().all(|&b| b == 0) => Some(last),
            _ => None,
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte digest; Keccak-256 unless stated otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The all-zero digest, returned by BLOCKHASH outside its window.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// BYTES (variable length)
// =============================================================================

/// Variable-length byte vector for calldata, return data, and code.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates an empty Bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates Bytes from a vector.
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(vec)
    }

    /// Creates Bytes from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Returns a reference to the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies `len` bytes starting at `offset`, zero-filling anything past the end.
    #[must_use]
    pub fn padded_slice(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        if offset < self.0.len() {
            let available = (self.0.len() - offset).min(len);
            out[..available].copy_from_slice(&self.0[offset..offset + available]);
        }
        out
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get(..8) {
            Some(head) if self.0.len() > 8 => {
                write_hex(f, head)?;
                write!(f, "..({} bytes)", self.0.len())
            }
            _ => write_hex(f, &self.0),
        }
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// ECDSA SIGNATURE
// =============================================================================

/// ECDSA signature (r, s, v) as carried in the ECRECOVER input.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// r component (32 bytes).
    pub r: [u8; 32],
    /// s component (32 bytes).
    pub s: [u8; 32],
    /// Recovery id in legacy format (27 or 28).
    pub v: u8,
}

impl EcdsaSignature {
    /// Creates a new signature.
    #[must_use]
    pub const fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Normalizes v to 0 or 1.
    #[must_use]
    pub const fn normalized_v(&self) -> u8 {
        if self.v >= 27 {
            self.v - 27
        } else {
            self.v
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
