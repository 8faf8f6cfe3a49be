//! Character-sequence similarity, used by the response cache, the metadata
//! confidence scorer, trivia answer evaluation, and the catalog dedup sweep.
//!
//! Implements the Ratcliff-Obershelp measure: twice the number of matching
//! characters (found by recursively taking the longest common substring)
//! over the combined length. The 0.7 / 0.85 / 0.9 / 0.92 thresholds used
//! across the workspace are calibrated against this measure.

/// Similarity of two strings in [0.0, 1.0]. Case-sensitive; callers
/// normalize first when case should not matter.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = matching_chars(&a, &b);
    (2.0 * matched as f64) / ((a.len() + b.len()) as f64)
}

/// Total characters covered by matching blocks: the longest common substring
/// plus, recursively, the best matches to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (ai, bi, len) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..ai], &b[..bi]) + matching_chars(&a[ai + len..], &b[bi + len..])
}

/// Longest common substring of `a` and `b` as (start_a, start_b, length).
/// Ties resolve to the earliest occurrence in `a`, then in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0usize, 0usize, 0usize);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev[j] + 1;
                cur[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        prev = cur;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_one() {
        assert_eq!(sequence_ratio("portal", "portal"), 1.0);
    }

    #[test]
    fn disjoint_strings_are_zero() {
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_vs_nonempty() {
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("", "abc"), 0.0);
    }

    #[test]
    fn near_duplicates_score_high() {
        // One character of drift across a long name stays above the 0.92
        // dedup threshold.
        let r = sequence_ratio("zombie army 4: dead war", "zombie army 4 dead war");
        assert!(r > 0.92, "got {r}");
    }

    #[test]
    fn partial_overlap_scores_midrange() {
        let r = sequence_ratio("dark souls", "dark souls iii");
        assert!(r > 0.7 && r < 1.0, "got {r}");
    }

    #[test]
    fn known_ratio_value() {
        // "abcd" vs "bcde": matching block "bcd" (3 chars), 2*3/8 = 0.75.
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
    }
}
