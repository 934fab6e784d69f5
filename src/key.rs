//! Key and value domain.
//!
//! Both engines operate on totally ordered fixed-width unsigned integers.
//! Keys and values share the [`Word`] representation; the "absent" sentinel
//! (the trailing next-key slot of a rightmost 2-3 leaf, the value of a
//! structural AVL node) is `Option<Word>::None`.
//!
//! Words are serialised big-endian, so standard integer comparison is
//! equivalent to lexicographic byte comparison and an 8-byte encoding feeds
//! the hash combiner directly.

/// Fixed-width unsigned word used for both keys and values.
pub type Word = u64;

/// Width in bytes of the canonical [`Word`] encoding.
pub const WORD_SIZE: usize = 8;

/// Supported on-stream key widths in bytes.
pub const STREAM_WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// Encode a word as its canonical 8-byte big-endian form.
///
/// This is the encoding fed to the hash combiner (see the `hash` module).
#[inline]
#[must_use]
pub const fn word_bytes(w: Word) -> [u8; WORD_SIZE] {
    w.to_be_bytes()
}

/// Decode a big-endian word of `width` bytes from the front of `bytes`.
///
/// `width` must be one of [`STREAM_WIDTHS`] and `bytes` must hold at least
/// `width` bytes; both are upheld by the batch reader.
#[inline]
#[must_use]
pub fn read_word(bytes: &[u8], width: usize) -> Word {
    debug_assert!(bytes.len() >= width, "read_word: short chunk");

    let mut buf: [u8; WORD_SIZE] = [0u8; WORD_SIZE];
    buf[WORD_SIZE - width..].copy_from_slice(&bytes[..width]);
    Word::from_be_bytes(buf)
}

/// A key paired with its value, the unit of a bulk upsert batch.
///
/// Batches are sorted ascending by key and contain no duplicate keys; the
/// bulk drivers check this precondition at the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyValue {
    /// The key.
    pub key: Word,
    /// The value stored under `key`.
    pub value: Word,
}

impl KeyValue {
    /// Pair a key with a value.
    #[inline]
    #[must_use]
    pub const fn new(key: Word, value: Word) -> Self {
        Self { key, value }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Check that `items` is sorted strictly ascending by key (no duplicates).
#[must_use]
pub fn is_strictly_sorted_by_key(items: &[KeyValue]) -> bool {
    items.windows(2).all(|w| w[0].key < w[1].key)
}

/// Check that `keys` is sorted strictly ascending (no duplicates).
#[must_use]
pub fn is_strictly_sorted(keys: &[Word]) -> bool {
    keys.windows(2).all(|w| w[0] < w[1])
}
