//! Character-level similarity ratio (Ratcliff/Obershelp sequence matching).
//!
//! `ratio = 2·M / (|a| + |b|)` where `M` is the total size of the matching
//! blocks found by recursively taking the longest common substring and
//! repeating on both sides of it.

use std::collections::HashMap;

/// Second sequences at least this long drop "popular" characters from the
/// longest-match index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Precomputed index over the second sequence `b`, reusable against many `a`.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(b: &str) -> Self {
        let b: Vec<char> = b.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= ntest);
        }

        Self { b, b2j }
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Similarity of `a` against the indexed sequence, in `[0, 1]`.
    pub fn ratio(&self, a: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let total = a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matching_chars(&a) as f64 / total as f64
    }

    /// Sum of the sizes of all matching blocks.
    fn matching_chars(&self, a: &[char]) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        matched
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given window. Ties go
    /// to the block starting earliest in `a`, then earliest in `b`.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(c) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
                    next.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            j2len = next;
        }

        // Grow the block over characters the autojunk pass removed from the index.
        while best_i > alo && best_j > blo && a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi
            && best_j + best_k < bhi
            && a[best_i + best_k] == self.b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}

/// One-off ratio between two strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(b).ratio(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn identical_strings_score_one() {
        assert!(close(ratio("snooze sza", "snooze sza"), 1.0));
        assert!(close(ratio("", ""), 1.0));
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert!(close(ratio("abc", "xyz"), 0.0));
        assert!(close(ratio("abc", ""), 0.0));
    }

    #[test]
    fn classic_examples() {
        // Matching blocks "ab" + "d": 2·3 / 8.
        assert!(close(ratio("abcd", "abxd"), 0.75));
        // Block "bcd" leaves nothing alignable on either side.
        assert!(close(ratio("abcd", "bcda"), 0.75));
        // Only one character can align in order.
        assert!(close(ratio("ab", "ba"), 0.5));
    }

    #[test]
    fn prefix_query_scores_by_overlap() {
        // "snooze" is fully contained in "snooze sza": 2·6 / 16.
        assert!(close(ratio("snooze", "snooze sza"), 0.75));
    }

    #[test]
    fn long_sequences_use_popular_character_pruning() {
        let b = "a".repeat(250);
        let a = "a".repeat(250);
        // Every 'a' is popular and dropped from the index; block extension
        // from the window start still recovers the full match.
        assert!(close(ratio(&a, &b), 1.0));
        let matcher = SequenceMatcher::new(&b);
        assert_eq!(matcher.len(), 250);
        assert!(!matcher.is_empty());
    }
}
