//! Fixed-capacity task bitsets.
//!
//! Each mask is an array of 32-bit words. Single-bit updates happen under the
//! supervisor's task-context lock; the timer expiry path snapshots whole words
//! with relaxed atomic loads instead of taking the lock. Word-granular loads
//! cannot tear, so the expiry path sees each word either before or after a
//! concurrent update, never a mix within one word.

use portable_atomic::{AtomicU32, Ordering};

pub(crate) const WORD_BITS: usize = 32;

pub(crate) struct TaskMask<const WORDS: usize> {
    words: [AtomicU32; WORDS],
}

impl<const WORDS: usize> TaskMask<WORDS> {
    pub(crate) const fn new() -> Self {
        Self {
            words: [const { AtomicU32::new(0) }; WORDS],
        }
    }

    pub(crate) fn set(&self, bit: usize) {
        self.words[bit / WORD_BITS].fetch_or(1 << (bit % WORD_BITS), Ordering::Relaxed);
    }

    pub(crate) fn clear(&self, bit: usize) {
        self.words[bit / WORD_BITS].fetch_and(!(1 << (bit % WORD_BITS)), Ordering::Relaxed);
    }

    pub(crate) fn contains(&self, bit: usize) -> bool {
        self.load_word(bit / WORD_BITS) & (1 << (bit % WORD_BITS)) != 0
    }

    pub(crate) fn load_word(&self, word: usize) -> u32 {
        self.words[word].load(Ordering::Relaxed)
    }

    pub(crate) fn clear_all(&self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Removes every bit not also present in `keep`.
    pub(crate) fn retain(&self, keep: &TaskMask<WORDS>) {
        for (word, keep) in self.words.iter().zip(keep.words.iter()) {
            word.fetch_and(keep.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// Index of the lowest clear bit, if any bit is still clear.
    pub(crate) fn first_clear(&self) -> Option<usize> {
        for (idx, word) in self.words.iter().enumerate() {
            let value = word.load(Ordering::Relaxed);
            if value != u32::MAX {
                return Some(idx * WORD_BITS + (!value).trailing_zeros() as usize);
            }
        }
        None
    }

    /// Index of the highest set bit, scanning downward from the last word.
    pub(crate) fn highest_set(&self) -> Option<usize> {
        for (idx, word) in self.words.iter().enumerate().rev() {
            let value = word.load(Ordering::Relaxed);
            if value != 0 {
                return Some(idx * WORD_BITS + (WORD_BITS - 1) - value.leading_zeros() as usize);
            }
        }
        None
    }

    pub(crate) fn snapshot(&self) -> [u32; WORDS] {
        let mut words = [0; WORDS];
        for (out, word) in words.iter_mut().zip(self.words.iter()) {
            *out = word.load(Ordering::Relaxed);
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_clear_skips_full_words() {
        let mask = TaskMask::<2>::new();
        for bit in 0..WORD_BITS {
            mask.set(bit);
        }
        assert_eq!(mask.first_clear(), Some(32));

        mask.set(32);
        mask.set(33);
        assert_eq!(mask.first_clear(), Some(34));

        mask.clear(7);
        assert_eq!(mask.first_clear(), Some(7));
    }

    #[test]
    fn first_clear_exhausted() {
        let mask = TaskMask::<1>::new();
        for bit in 0..WORD_BITS {
            mask.set(bit);
        }
        assert_eq!(mask.first_clear(), None);
    }

    #[test]
    fn highest_set_scans_downward() {
        let mask = TaskMask::<2>::new();
        assert_eq!(mask.highest_set(), None);

        mask.set(3);
        assert_eq!(mask.highest_set(), Some(3));

        mask.set(40);
        assert_eq!(mask.highest_set(), Some(40));

        mask.clear(40);
        assert_eq!(mask.highest_set(), Some(3));
    }

    #[test]
    fn retain_intersects() {
        let a = TaskMask::<1>::new();
        let b = TaskMask::<1>::new();
        a.set(1);
        a.set(5);
        b.set(5);

        a.retain(&b);
        assert!(!a.contains(1));
        assert!(a.contains(5));
    }
}
