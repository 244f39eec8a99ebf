//! Fuzzy string matching utilities using Levenshtein distance
//!
//! Used for the verb of the pause/resume control phrases, which must survive a one-letter
//! transcription slip without swallowing ordinary dictation.

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Clean text for matching: lowercase, drop non-alphabetic characters, collapse whitespace
pub fn clean_for_matching(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the closest candidate word within `max_edits`. Ties go to the earlier candidate.
pub fn closest_word(candidates: &[&str], actual: &str, max_edits: usize) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, levenshtein(c, actual)))
        .filter(|&(_, dist)| dist <= max_edits)
        .min_by_key(|&(i, dist)| (dist, i))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERBS: &[&str] = &["pause", "stop", "resume", "start"];

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("hello", "helo"), 1);
        assert_eq!(levenshtein("hello", "world"), 4);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_clean_for_matching() {
        assert_eq!(clean_for_matching("Hello!"), "hello");
        assert_eq!(clean_for_matching("Stop."), "stop");
        assert_eq!(clean_for_matching("  Pause,   typing! "), "pause typing");
    }

    #[test]
    fn test_exact_word() {
        assert_eq!(closest_word(VERBS, "stop", 1), Some(1));
        assert_eq!(closest_word(VERBS, "start", 0), Some(3));
    }

    #[test]
    fn test_one_edit() {
        assert_eq!(closest_word(VERBS, "resum", 1), Some(2));
        assert_eq!(closest_word(VERBS, "stap", 1), Some(1));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(closest_word(VERBS, "post", 1), None);
        assert_eq!(closest_word(VERBS, "set", 1), None);
        assert_eq!(closest_word(VERBS, "paws", 1), None);
        assert_eq!(closest_word(VERBS, "", 1), None);
    }
}
