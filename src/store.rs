//! Storage for the simplex lists of elementary ladder segments.
//!
//! Every path through the ladder is a concatenation of a few elementary segments, and the same
//! segment is shared by many paths. Segments are computed once, before any path is built, and
//! read concurrently afterwards.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::{error::Result, linearize::Segment};
use zigzag::Simplex;

/// A map from [`Segment`]s to their simplices in insertion order.
pub trait PathStore: Send + Sync {
    fn insert(&mut self, segment: Segment, simplices: Vec<Simplex>) -> Result<()>;

    fn get(&self, segment: &Segment) -> Result<Option<Cow<'_, [Simplex]>>>;

    fn contains(&self, segment: &Segment) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    segments: FxHashMap<Segment, Vec<Simplex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathStore for MemoryStore {
    fn insert(&mut self, segment: Segment, simplices: Vec<Simplex>) -> Result<()> {
        self.segments.insert(segment, simplices);
        Ok(())
    }

    fn get(&self, segment: &Segment) -> Result<Option<Cow<'_, [Simplex]>>> {
        Ok(self
            .segments
            .get(segment)
            .map(|s| Cow::Borrowed(s.as_slice())))
    }

    fn contains(&self, segment: &Segment) -> bool {
        self.segments.contains_key(segment)
    }

    fn len(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(feature = "zstd")]
pub use compressed::CompressedStore;

#[cfg(feature = "zstd")]
mod compressed {
    use super::*;
    use crate::error::LadderError;

    const LEVEL: i32 = 3;

    #[derive(Debug)]
    enum Entry {
        Plain(Vec<Simplex>),
        Compressed(Vec<u8>),
    }

    /// A store that keeps segments with more than `threshold` simplices as zstd compressed JSON.
    #[derive(Debug)]
    pub struct CompressedStore {
        threshold: usize,
        segments: FxHashMap<Segment, Entry>,
    }

    impl CompressedStore {
        pub fn new(threshold: usize) -> Self {
            Self {
                threshold,
                segments: FxHashMap::default(),
            }
        }

        pub fn num_compressed(&self) -> usize {
            self.segments
                .values()
                .filter(|e| matches!(e, Entry::Compressed(_)))
                .count()
        }
    }

    fn storage(segment: &Segment, e: impl std::fmt::Display) -> LadderError {
        LadderError::Storage(format!("segment {segment}: {e}"))
    }

    impl PathStore for CompressedStore {
        fn insert(&mut self, segment: Segment, simplices: Vec<Simplex>) -> Result<()> {
            let entry = if simplices.len() > self.threshold {
                let json = serde_json::to_vec(&simplices).map_err(|e| storage(&segment, e))?;
                let bytes =
                    zstd::bulk::compress(&json, LEVEL).map_err(|e| storage(&segment, e))?;
                tracing::debug!(
                    %segment,
                    raw = json.len(),
                    compressed = bytes.len(),
                    "compressed segment"
                );
                Entry::Compressed(bytes)
            } else {
                Entry::Plain(simplices)
            };
            self.segments.insert(segment, entry);
            Ok(())
        }

        fn get(&self, segment: &Segment) -> Result<Option<Cow<'_, [Simplex]>>> {
            match self.segments.get(segment) {
                None => Ok(None),
                Some(Entry::Plain(s)) => Ok(Some(Cow::Borrowed(s.as_slice()))),
                Some(Entry::Compressed(bytes)) => {
                    let json = zstd::stream::decode_all(bytes.as_slice())
                        .map_err(|e| storage(segment, e))?;
                    let simplices: Vec<Simplex> =
                        serde_json::from_slice(&json).map_err(|e| storage(segment, e))?;
                    Ok(Some(Cow::Owned(simplices)))
                }
            }
        }

        fn contains(&self, segment: &Segment) -> bool {
            self.segments.contains_key(segment)
        }

        fn len(&self) -> usize {
            self.segments.len()
        }
    }
}
