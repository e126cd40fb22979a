// ============================================================
// Layer 3 — PHOC (Pyramidal Histogram Of Characters)
// ============================================================
// The target representation of PHOCNet. A word of n characters
// is split into l equal regions at every pyramid level l. The
// k-th character occupies [k/n, (k+1)/n]; it is counted in
// region r when at least half of it lies inside [r/l, (r+1)/l].
//
// Layout: levels in order, then regions, then alphabet:
//
//   index = offset(level) + region * |alphabet| + symbol
//
// so the vector length is |alphabet| * sum(levels).

use std::collections::HashMap;

use anyhow::{bail, ensure, Result};

#[derive(Debug, Clone)]
pub struct PhocBuilder {
    alphabet: HashMap<char, usize>,
    size:     usize,
    levels:   Vec<usize>,
}

impl PhocBuilder {
    pub fn new(alphabet: &str, levels: &[usize]) -> Result<Self> {
        ensure!(!alphabet.is_empty(), "The PHOC alphabet is empty");
        ensure!(!levels.is_empty(), "At least one PHOC level is required");
        ensure!(levels.iter().all(|&l| l > 0), "PHOC levels must be positive, got {levels:?}");

        let mut index = HashMap::new();
        for c in alphabet.chars() {
            let next = index.len();
            if index.insert(c, next).is_some() {
                bail!("Character '{c}' appears twice in the PHOC alphabet");
            }
        }
        Ok(Self { alphabet: index, size: alphabet.chars().count(), levels: levels.to_vec() })
    }

    /// Length of the PHOC vectors produced by this builder.
    pub fn len(&self) -> usize {
        self.size * self.levels.iter().sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binary PHOC vector of `word`, as 0.0 / 1.0 values.
    pub fn encode(&self, word: &str) -> Result<Vec<f32>> {
        let chars: Vec<char> = word.chars().collect();
        ensure!(!chars.is_empty(), "Cannot build a PHOC for an empty word");

        let symbols: Vec<usize> = chars
            .iter()
            .map(|c| match self.alphabet.get(c) {
                Some(&s) => Ok(s),
                None     => bail!("Character '{c}' of '{word}' is not in the PHOC alphabet"),
            })
            .collect::<Result<_>>()?;

        // Positions are measured in units of 1 / (n * l) so the
        // overlap test stays in exact integer arithmetic.
        let n = symbols.len() as i64;
        let mut phoc = vec![0.0f32; self.len()];
        let mut offset = 0;

        for &level in &self.levels {
            let l = level as i64;
            for (k, &symbol) in symbols.iter().enumerate() {
                let k = k as i64;
                for region in 0..level {
                    let r = region as i64;
                    let overlap = ((k + 1) * l).min((r + 1) * n) - (k * l).max(r * n);
                    // overlap / (1/n) >= 1/2  ⇔  2 * overlap >= l
                    if 2 * overlap >= l {
                        phoc[offset + region * self.size + symbol] = 1.0;
                    }
                }
            }
            offset += level * self.size;
        }

        Ok(phoc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(phoc: &[f32]) -> Vec<usize> {
        phoc.iter()
            .enumerate()
            .filter(|(_, &v)| v == 1.0)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn size_is_alphabet_times_regions() {
        let builder = PhocBuilder::new("abcdefghijklmnopqrstuvwxyz0123456789", &[2, 3, 4, 5]).unwrap();
        assert_eq!(builder.len(), 36 * 14);
    }

    #[test]
    fn level_one_is_a_bag_of_characters() {
        let builder = PhocBuilder::new("abc", &[1]).unwrap();
        assert_eq!(builder.encode("cab").unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(builder.encode("aa").unwrap(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn level_two_splits_word_halves() {
        // "ab": 'a' fills region 0, 'b' fills region 1
        let builder = PhocBuilder::new("ab", &[2]).unwrap();
        assert_eq!(ones(&builder.encode("ab").unwrap()), vec![0, 3]);
    }

    #[test]
    fn middle_character_counts_in_both_halves() {
        // "abc" at level 2: 'b' occupies [1/3, 2/3], half in each region
        let builder = PhocBuilder::new("abc", &[2]).unwrap();
        let phoc = builder.encode("abc").unwrap();
        // region 0: a, b    region 1: b, c
        assert_eq!(ones(&phoc), vec![0, 1, 4, 5]);
    }

    #[test]
    fn rejects_unknown_characters_and_bad_setup() {
        let builder = PhocBuilder::new("ab", &[1, 2]).unwrap();
        assert!(builder.encode("abz").is_err());
        assert!(builder.encode("").is_err());
        assert!(PhocBuilder::new("", &[1]).is_err());
        assert!(PhocBuilder::new("aa", &[1]).is_err());
        assert!(PhocBuilder::new("ab", &[]).is_err());
        assert!(PhocBuilder::new("ab", &[0]).is_err());
    }
}
