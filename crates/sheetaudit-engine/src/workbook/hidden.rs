//! Hidden row/column flags as a dense bitset over 1-based indices.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Set of hidden row (or column) indices. Bit `i` of the set is index `i + 1`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<u32>", into = "Vec<u32>"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSet {
    words: Vec<u64>,
}

impl HiddenSet {
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn contains(&self, index: u32) -> bool {
        let Some(bit) = index.checked_sub(1) else {
            return false;
        };
        self.words
            .get((bit / 64) as usize)
            .map(|word| (word & (1u64 << (bit % 64))) != 0)
            .unwrap_or(false)
    }

    /// Returns whether anything changed. Index 0 is ignored.
    pub fn set(&mut self, index: u32, hidden: bool) -> bool {
        let Some(bit) = index.checked_sub(1) else {
            return false;
        };
        let word_idx = (bit / 64) as usize;
        if word_idx >= self.words.len() {
            if !hidden {
                return false;
            }
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << (bit % 64);
        let word = &mut self.words[word_idx];
        if ((*word & mask) != 0) == hidden {
            return false;
        }
        if hidden {
            *word |= mask;
        } else {
            *word &= !mask;
            self.trim_trailing_zeros();
        }
        true
    }

    /// Inclusive on both ends.
    pub fn set_range(&mut self, start: u32, end: u32, hidden: bool) -> bool {
        if start > end {
            return false;
        }
        let mut changed = false;
        for index in start..=end {
            changed |= self.set(index, hidden);
        }
        changed
    }

    /// Hidden indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words
            .iter()
            .copied()
            .enumerate()
            .flat_map(|(word_idx, word)| {
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros();
                    bits &= bits - 1;
                    Some(word_idx as u32 * 64 + tz + 1)
                })
            })
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn trim_trailing_zeros(&mut self) {
        while self.words.last().copied() == Some(0) {
            self.words.pop();
        }
    }
}

impl From<Vec<u32>> for HiddenSet {
    fn from(indices: Vec<u32>) -> Self {
        let mut set = HiddenSet::default();
        for index in indices {
            set.set(index, true);
        }
        set
    }
}

impl From<HiddenSet> for Vec<u32> {
    fn from(set: HiddenSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<u32> for HiddenSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = HiddenSet::default();
        for index in iter {
            set.set(index, true);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_across_word_boundaries() {
        let mut set = HiddenSet::default();
        assert!(set.set(1, true));
        assert!(set.set(64, true));
        assert!(set.set(65, true));
        assert!(!set.set(65, true));
        assert!(set.contains(64) && set.contains(65));
        assert!(!set.contains(0) && !set.contains(2));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 64, 65]);

        assert!(set.set(65, false));
        assert_eq!(set.len(), 2);
        assert!(set.set(64, false) && set.set(1, false));
        assert!(set.is_empty());
    }

    #[test]
    fn range_updates_report_changes() {
        let mut set = HiddenSet::default();
        assert!(set.set_range(3, 5, true));
        assert!(!set.set_range(3, 5, true));
        assert!(!set.set_range(9, 2, true));
        assert_eq!(Vec::<u32>::from(set), vec![3, 4, 5]);
    }
}
