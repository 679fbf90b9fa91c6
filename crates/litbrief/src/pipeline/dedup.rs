use std::collections::HashSet;

use crate::models::CandidatePaper;

/// Keeps the first candidate seen for each external identifier.
///
/// Input order is query-dispatch order, so the surviving candidate carries the
/// text of the earliest query that found it.
pub fn deduplicate(candidates: Vec<CandidatePaper>) -> Vec<CandidatePaper> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.external_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::paper::sample_candidate;

    #[test]
    fn test_first_occurrence_wins() {
        let candidates = vec![
            sample_candidate("1706.03762", "ti:attention AND abs:transformer"),
            sample_candidate("1810.04805", "ti:attention AND abs:transformer"),
            sample_candidate("1706.03762", "au:Vaswani"),
        ];

        let unique = deduplicate(candidates);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].external_id, "1706.03762");
        assert_eq!(unique[0].query, "ti:attention AND abs:transformer");
        assert_eq!(unique[1].external_id, "1810.04805");
    }

    #[test]
    fn test_order_is_preserved() {
        let ids = ["c", "a", "b", "a", "c", "d"];
        let candidates = ids.iter().map(|id| sample_candidate(id, "q")).collect();
        let unique: Vec<_> = deduplicate(candidates)
            .into_iter()
            .map(|c| c.external_id)
            .collect();
        assert_eq!(unique, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate(Vec::new()).is_empty());
    }
}
