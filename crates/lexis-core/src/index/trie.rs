//! The succinct trie capability.
//!
//! A [`SuccinctTrie`] stores a sorted set of byte keys and assigns each the
//! dense id of its rank. [`FstTrie`] implements it with an `fst::Map` whose
//! value for each key is that rank; reverse lookup walks the transducer
//! following outputs.

use bytes::Bytes;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use lexis_common::utils::error::{Error, FormatError, Result};

/// A static byte-key set with dense ids.
pub trait SuccinctTrie: Sized {
    /// Iterator over `(key, id)` pairs sharing a prefix.
    type Prefix<'a>: Iterator<Item = (Vec<u8>, u32)>
    where
        Self: 'a;

    /// Builds a trie from keys in strictly ascending byte order.
    ///
    /// The i-th key gets id `i`.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys are unsorted or repeated.
    fn build<I, K>(sorted_keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>;

    /// Wraps serialized trie bytes without copying. Empty bytes mean an
    /// empty trie.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the bytes are not a valid trie.
    fn from_bytes(bytes: Bytes) -> Result<Self>;

    /// Number of keys.
    fn len(&self) -> usize;

    /// Returns true if the trie holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of `key`, if present.
    fn lookup(&self, key: &[u8]) -> Option<u32>;

    /// Key with id `id`, if in range.
    fn reverse_lookup(&self, id: u32) -> Option<Vec<u8>>;

    /// All keys starting with `prefix`, in ascending byte order.
    fn prefix<'a>(&'a self, prefix: &[u8]) -> Self::Prefix<'a>;

    /// The serialized trie.
    fn as_bytes(&self) -> &[u8];
}

/// [`SuccinctTrie`] backed by a finite state transducer.
#[derive(Clone, Default)]
pub struct FstTrie {
    map: Option<Map<Bytes>>,
}

impl std::fmt::Debug for FstTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FstTrie")
            .field("len", &self.len())
            .field("bytes", &self.as_bytes().len())
            .finish()
    }
}

impl SuccinctTrie for FstTrie {
    type Prefix<'a> = FstPrefix<'a>;

    fn build<I, K>(sorted_keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut builder = MapBuilder::memory();
        let mut count = 0u64;
        for key in sorted_keys {
            builder
                .insert(key, count)
                .map_err(|e| Error::Internal(format!("trie keys not strictly sorted: {e}")))?;
            count += 1;
        }
        if count == 0 {
            return Ok(Self::default());
        }
        let bytes = builder
            .into_inner()
            .map_err(|e| Error::Internal(format!("trie build failed: {e}")))?;
        Self::from_bytes(Bytes::from(bytes))
    }

    fn from_bytes(bytes: Bytes) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let map = Map::new(bytes).map_err(|e| FormatError::corrupt("trie", e.to_string()))?;
        Ok(Self { map: Some(map) })
    }

    fn len(&self) -> usize {
        self.map.as_ref().map_or(0, Map::len)
    }

    fn lookup(&self, key: &[u8]) -> Option<u32> {
        self.map.as_ref()?.get(key).map(|id| id as u32)
    }

    fn reverse_lookup(&self, id: u32) -> Option<Vec<u8>> {
        let fst = self.map.as_ref()?.as_fst();
        let target = u64::from(id);
        let mut node = fst.root();
        let mut acc = 0u64;
        let mut key = Vec::new();

        // Ids are ranks, so outputs grow with the input byte: take the last
        // transition that does not overshoot.
        loop {
            if node.is_final() && acc + node.final_output().value() == target {
                return Some(key);
            }
            let mut next = None;
            for transition in node.transitions() {
                if acc + transition.out.value() > target {
                    break;
                }
                next = Some(transition);
            }
            let transition = next?;
            acc += transition.out.value();
            key.push(transition.inp);
            node = fst.node(transition.addr);
        }
    }

    fn prefix<'a>(&'a self, prefix: &[u8]) -> FstPrefix<'a> {
        let stream = self.map.as_ref().map(|map| {
            let range = map.range().ge(prefix);
            match prefix_upper_bound(prefix) {
                Some(end) => range.lt(end).into_stream(),
                None => range.into_stream(),
            }
        });
        FstPrefix { stream }
    }

    fn as_bytes(&self) -> &[u8] {
        self.map.as_ref().map_or(&[], |map| map.as_fst().as_bytes())
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` when no such bound exists (empty prefix or all `0xff`).
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Prefix iterator of an [`FstTrie`].
pub struct FstPrefix<'a> {
    stream: Option<fst::map::Stream<'a>>,
}

impl Iterator for FstPrefix<'_> {
    type Item = (Vec<u8>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;
        stream.next().map(|(key, id)| (key.to_vec(), id as u32))
    }
}
