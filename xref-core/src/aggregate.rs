//! Ranking, deduplication and truncation of matches

use crate::model::{Match, MatchType};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Final ranked result set
#[derive(Debug, Clone, Default)]
pub struct AggregatedResults {
    pub matches: Vec<Match>,
    /// Distinct matches before truncation
    pub total: usize,
    pub truncated: bool,
}

/// Collects matches from any number of files and ranks them once.
#[derive(Debug)]
pub struct ResultAggregator {
    max_results: usize,
    matches: Vec<Match>,
}

impl ResultAggregator {
    /// `max_results` of zero is treated as one.
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results: max_results.max(1),
            matches: Vec::new(),
        }
    }

    pub fn push(&mut self, m: Match) {
        self.matches.push(m);
    }

    /// Whether at least `max_results` matches have been collected
    pub fn is_full(&self) -> bool {
        self.matches.len() >= self.max_results
    }

    /// Sort by (confidence desc, file asc, line asc), keep the best entry per
    /// (file, line, type) and truncate.
    pub fn finish(mut self) -> AggregatedResults {
        self.matches.sort_by(compare_matches);

        let mut seen: HashSet<(String, usize, MatchType)> = HashSet::new();
        self.matches
            .retain(|m| seen.insert((m.file.clone(), m.line, m.match_type)));

        let total = self.matches.len();
        let truncated = total > self.max_results;
        self.matches.truncate(self.max_results);

        AggregatedResults {
            matches: self.matches,
            total,
            truncated,
        }
    }
}

impl Extend<Match> for ResultAggregator {
    fn extend<I: IntoIterator<Item = Match>>(&mut self, iter: I) {
        self.matches.extend(iter);
    }
}

/// Result ordering; the match type breaks the remaining ties so the order is total.
pub fn compare_matches(a: &Match, b: &Match) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.file.cmp(&b.file))
        .then_with(|| a.line.cmp(&b.line))
        .then_with(|| a.match_type.cmp(&b.match_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(file: &str, line: usize, match_type: MatchType, confidence: f64) -> Match {
        Match {
            file: file.to_string(),
            line,
            content: String::new(),
            match_type,
            confidence,
        }
    }

    #[test]
    fn test_sort_order() {
        let mut agg = ResultAggregator::new(10);
        agg.extend([
            m("b.ts", 1, MatchType::Usage, 1.0),
            m("a.ts", 9, MatchType::Usage, 1.0),
            m("a.ts", 2, MatchType::Usage, 1.0),
            m("a.ts", 1, MatchType::Usage, 0.8),
        ]);
        let result = agg.finish();
        let order: Vec<(&str, usize)> = result
            .matches
            .iter()
            .map(|m| (m.file.as_str(), m.line))
            .collect();
        assert_eq!(order, vec![("a.ts", 2), ("a.ts", 9), ("b.ts", 1), ("a.ts", 1)]);
    }

    #[test]
    fn test_dedupe_keeps_highest_confidence() {
        let mut agg = ResultAggregator::new(10);
        agg.extend([
            m("a.ts", 1, MatchType::Usage, 0.7),
            m("a.ts", 1, MatchType::Usage, 0.9),
            m("a.ts", 1, MatchType::Definition, 1.0),
        ]);
        let result = agg.finish();
        assert_eq!(result.total, 2);
        assert_eq!(result.matches[1].confidence, 0.9);
    }

    #[test]
    fn test_truncation() {
        let mut agg = ResultAggregator::new(50);
        for i in 0..80 {
            agg.push(m(&format!("f{:02}.ts", i % 20), i, MatchType::Usage, 1.0));
        }
        assert!(agg.is_full());
        let result = agg.finish();
        assert_eq!(result.matches.len(), 50);
        assert_eq!(result.total, 80);
        assert!(result.truncated);
    }

    #[test]
    fn test_single_result_is_best() {
        let mut agg = ResultAggregator::new(1);
        agg.extend([
            m("z.ts", 1, MatchType::Usage, 0.95),
            m("b.ts", 3, MatchType::Usage, 1.0),
            m("b.ts", 2, MatchType::Usage, 1.0),
        ]);
        let result = agg.finish();
        assert_eq!(result.matches.len(), 1);
        assert_eq!((result.matches[0].file.as_str(), result.matches[0].line), ("b.ts", 2));
    }

    #[test]
    fn test_zero_cap_means_one() {
        let mut agg = ResultAggregator::new(0);
        agg.push(m("a.ts", 1, MatchType::Usage, 1.0));
        agg.push(m("a.ts", 2, MatchType::Usage, 1.0));
        assert_eq!(agg.finish().matches.len(), 1);
    }
}
