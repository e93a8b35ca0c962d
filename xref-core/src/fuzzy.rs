//! Similarity scoring between a candidate token and the query symbol.
//!
//! Tiers are checked in priority order so that an exact or substring match is
//! never outranked by an approximate one:
//!
//! 1. exact match: `1.0`
//! 2. case-insensitive match: `case_insensitive` (0.95)
//! 3. substring either way: `substring_base + ratio * substring_span` (0.8-0.95)
//! 4. Jaro-Winkler above `fuzzy_threshold` (0.6), capped at `approximate_ceiling`
//!
//! Anything else scores `0.0`, meaning "no match".

use crate::config::ScoringConfig;

/// Longest common prefix counted by the Winkler bonus
const WINKLER_PREFIX_LIMIT: usize = 4;
/// Winkler scaling factor per shared prefix character
const WINKLER_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyScorer {
    config: ScoringConfig,
}

impl FuzzyScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Confidence in `[0, 1]` that `found` denotes `target`. Zero means no match.
    pub fn score(&self, found: &str, target: &str) -> f64 {
        if found.is_empty() || target.is_empty() {
            return 0.0;
        }
        if found == target {
            return 1.0;
        }

        let found_lower = found.to_lowercase();
        let target_lower = target.to_lowercase();
        if found_lower == target_lower {
            return self.config.case_insensitive;
        }

        if found_lower.contains(&target_lower) || target_lower.contains(&found_lower) {
            let found_len = found_lower.chars().count() as f64;
            let target_len = target_lower.chars().count() as f64;
            let ratio = found_len.min(target_len) / found_len.max(target_len);
            return self.config.substring_base + ratio * self.config.substring_span;
        }

        let similarity = jaro_winkler(found, target);
        if similarity > self.config.fuzzy_threshold {
            similarity.min(self.config.approximate_ceiling)
        } else {
            0.0
        }
    }
}

/// Jaro similarity with the Winkler prefix bonus applied unconditionally.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let jaro = strsim::jaro(a, b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take(WINKLER_PREFIX_LIMIT)
        .take_while(|(x, y)| x == y)
        .count();
    jaro + WINKLER_SCALE * prefix as f64 * (1.0 - jaro)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> FuzzyScorer {
        FuzzyScorer::default()
    }

    #[test]
    fn test_exact_and_case_insensitive_tiers() {
        assert_eq!(scorer().score("getUser", "getUser"), 1.0);
        assert_eq!(scorer().score("getuser", "getUser"), 0.95);
    }

    #[test]
    fn test_substring_band() {
        let score = scorer().score("getUserName", "getUser");
        let expected = 0.8 + (7.0 / 11.0) * 0.15;
        assert!((score - expected).abs() < 1e-9);

        // containment works in both directions
        let reverse = scorer().score("User", "getUser");
        assert!(reverse > 0.8 && reverse < 0.95);
    }

    #[test]
    fn test_typo_is_approximate_match() {
        let score = scorer().score("getUser", "getUsr");
        assert!(score > 0.6 && score <= 0.95, "score was {score}");
        // approximate matches never reach the substring band
        assert!(score <= 0.8);
    }

    #[test]
    fn test_unrelated_tokens_score_zero() {
        assert_eq!(scorer().score("render", "getUser"), 0.0);
        assert_eq!(scorer().score("", "getUser"), 0.0);
    }

    #[test]
    fn test_jaro_winkler_known_values() {
        // MARTHA / MARHTA is the textbook example: jaro 0.944, winkler 0.961
        assert!((jaro_winkler("MARTHA", "MARHTA") - 0.961).abs() < 1e-3);
        assert_eq!(jaro_winkler("same", "same"), 1.0);
        assert_eq!(jaro_winkler("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let strict = FuzzyScorer::new(ScoringConfig {
            fuzzy_threshold: 0.99,
            ..ScoringConfig::default()
        });
        assert_eq!(strict.score("getUser", "getUsr"), 0.0);
    }
}
