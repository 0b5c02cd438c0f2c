// SPDX-License-Identifier: MIT OR Apache-2.0

//! Predicate bitmask
//!
//! Bit `i` is set iff physical predicate `i` holds for the tuple. The width
//! is the number of predicates of the query and has no upper bound; up to 128
//! predicates the words live inline.

use smallvec::SmallVec;
use std::fmt;

pub type PredicateId = u32;

const WORD_BITS: usize = 64;

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PredicateBitmask {
    words: SmallVec<[u64; 2]>,
    len: usize,
}

impl PredicateBitmask {
    /// All-false mask able to hold `len` predicates
    pub fn new(len: usize) -> Self {
        Self {
            words: SmallVec::from_elem(0, len.div_ceil(WORD_BITS)),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resize to `len` bits and clear every bit
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
    }

    #[inline]
    pub fn set(&mut self, id: PredicateId, value: bool) {
        let i = id as usize;
        debug_assert!(i < self.len, "predicate {} outside mask of {}", i, self.len);
        let (word, bit) = (i / WORD_BITS, i % WORD_BITS);
        if value {
            self.words[word] |= 1 << bit;
        } else {
            self.words[word] &= !(1 << bit);
        }
    }

    /// Out-of-range ids read as false
    #[inline]
    pub fn contains(&self, id: PredicateId) -> bool {
        let i = id as usize;
        i < self.len && self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    #[inline]
    pub fn contains_all(&self, ids: &[PredicateId]) -> bool {
        ids.iter().all(|&id| self.contains(id))
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = PredicateId> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            (0..WORD_BITS)
                .filter(move |b| word & (1 << b) != 0)
                .map(move |b| (wi * WORD_BITS + b) as PredicateId)
        })
    }

    pub fn spilled(&self) -> bool {
        self.words.spilled()
    }
}

impl fmt::Debug for PredicateBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PredicateBitmask(")?;
        for i in 0..self.len {
            f.write_str(if self.contains(i as PredicateId) { "1" } else { "0" })?;
        }
        write!(f, ")")
    }
}
