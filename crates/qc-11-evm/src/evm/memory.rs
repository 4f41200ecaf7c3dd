//! # EVM Memory
//!
//! Byte-addressable frame memory. The logical size is always a multiple of 32
//! and never shrinks. Storage behind it is split into fixed-size pages that are
//! only allocated when first written, so sparse access at high offsets does not
//! touch the untouched range in between.
//!
//! Memory itself is free: the interpreter prices growth with
//! [`memory_expansion_cost`] and charges it before calling [`Memory::extend`].

use super::word::{Word, WORD_BYTES};

/// Bytes per backing page.
pub const PAGE_SIZE: usize = 1024;

type Page = Box<[u8; PAGE_SIZE]>;

/// Frame memory backed by on-demand pages.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    pages: Vec<Option<Page>>,
    size: usize,
}

impl Memory {
    /// Creates a new empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical size in bytes (multiple of 32).
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current logical size in words.
    #[must_use]
    pub fn words(&self) -> usize {
        self.size / WORD_BYTES
    }

    /// Returns true if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of pages actually holding bytes.
    #[must_use]
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.is_some()).count()
    }

    /// Grows the logical size to cover `[offset, offset + size)`, rounded up to
    /// a whole word. A zero `size` never grows memory.
    pub fn extend(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let end = offset.saturating_add(size);
        let new_size = end.div_ceil(WORD_BYTES).saturating_mul(WORD_BYTES);
        if new_size > self.size {
            self.size = new_size;
            let pages_needed = new_size.div_ceil(PAGE_SIZE);
            if self.pages.len() < pages_needed {
                self.pages.resize_with(pages_needed, || None);
            }
        }
    }

    /// Reads `size` bytes at `offset`. Bytes never written read as zero.
    #[must_use]
    pub fn read(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut out = vec![0u8; size];
        let mut copied = 0;
        while copied < size {
            let position = offset + copied;
            let page_index = position / PAGE_SIZE;
            let within = position % PAGE_SIZE;
            let chunk = (PAGE_SIZE - within).min(size - copied);
            if let Some(Some(page)) = self.pages.get(page_index) {
                out[copied..copied + chunk].copy_from_slice(&page[within..within + chunk]);
            }
            copied += chunk;
        }
        out
    }

    /// Grows to cover the span, then reads it.
    #[must_use = "use Memory::extend when only growth is needed"]
    pub fn chunk(&mut self, offset: usize, size: usize) -> Vec<u8> {
        self.extend(offset, size);
        self.read(offset, size)
    }

    /// Reads a full word at `offset`.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> Word {
        Word::from_be_slice(&self.read(offset, WORD_BYTES))
    }

    /// Writes `data` at `offset`, growing memory to cover it.
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.extend(offset, data.len());
        let mut written = 0;
        while written < data.len() {
            let position = offset + written;
            let page_index = position / PAGE_SIZE;
            let within = position % PAGE_SIZE;
            let chunk = (PAGE_SIZE - within).min(data.len() - written);
            let page = self.pages[page_index].get_or_insert_with(|| Box::new([0u8; PAGE_SIZE]));
            page[within..within + chunk].copy_from_slice(&data[written..written + chunk]);
            written += chunk;
        }
    }

    /// Grows to cover `requested_len` bytes at `offset`, then copies the source.
    ///
    /// With `limited` set only `min(requested_len, source.len())` bytes are
    /// copied and the rest of the span keeps its previous contents. Without it
    /// the whole source is written.
    pub fn extend_and_write(
        &mut self,
        offset: usize,
        source: &[u8],
        requested_len: usize,
        limited: bool,
    ) {
        self.extend(offset, requested_len);
        let len = if limited {
            requested_len.min(source.len())
        } else {
            source.len()
        };
        self.write(offset, &source[..len]);
    }

    /// Writes a full word at `offset`.
    pub fn write_word(&mut self, offset: usize, value: Word) {
        self.write(offset, &value.to_be_bytes());
    }

    /// Writes a single byte at `offset`.
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.write(offset, &[value]);
    }
}

// =============================================================================
// EXPANSION COST
// =============================================================================

/// Total cost of a memory of `words` words: `words * word_cost + words² / divisor`.
///
/// Saturates instead of overflowing; a saturated cost is simply unpayable.
#[must_use]
pub fn memory_gas_cost(words: u64, word_cost: u64, quad_divisor: u64) -> u64 {
    let linear = words.saturating_mul(word_cost);
    let quadratic = words.saturating_mul(words) / quad_divisor.max(1);
    linear.saturating_add(quadratic)
}

/// Incremental cost of growing from `old_words` to `new_words`.
///
/// Zero when the memory does not grow, so a word is never paid for twice.
#[must_use]
pub fn memory_expansion_cost(old_words: u64, new_words: u64, word_cost: u64, quad_divisor: u64) -> u64 {
    if new_words <= old_words {
        return 0;
    }
    memory_gas_cost(new_words, word_cost, quad_divisor)
        .saturating_sub(memory_gas_cost(old_words, word_cost, quad_divisor))
}

// =============================================================================
// TESTS
// =============================================================================
