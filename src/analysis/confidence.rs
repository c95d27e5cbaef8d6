//! Confidence score derived from data-quality signals.

use crate::models::{Comparison, ConfidenceBreakdown, ExtractionOutput, Insights, StageResult};

pub const MAX_SCORE: u32 = 100;

/// Score the evidence behind a report.
///
/// One reason is recorded per signal, in evaluation order: item count,
/// extraction, comparison, insights.
pub fn score(
    item_count: usize,
    extraction: &StageResult<ExtractionOutput>,
    comparison: &StageResult<Comparison>,
    insights: &StageResult<Insights>,
) -> ConfidenceBreakdown {
    let mut total = 0;
    let mut reasons = Vec::with_capacity(4);

    let (points, reason) = match item_count {
        n if n >= 8 => (30, "Strong paper coverage (8+ papers)"),
        5..=7 => (20, "Moderate paper coverage (5-7 papers)"),
        2..=4 => (10, "Limited paper coverage (2-4 papers)"),
        _ => (5, "Minimal paper coverage (1 paper)"),
    };
    total += points;
    reasons.push(reason.to_string());

    let (points, reason) = match extraction.success_payload() {
        Some(ExtractionOutput::PerItem(items)) if !items.is_empty() => {
            (20, "Summaries generated successfully")
        }
        Some(ExtractionOutput::Digest(map)) if !map.contains_key("error") => {
            (15, "Summaries generated with minor issues")
        }
        _ => (5, "Summary generation had issues"),
    };
    total += points;
    reasons.push(reason.to_string());

    let (points, reason) = if comparison.is_fallback() {
        (5, "Comparison had issues")
    } else {
        (20, "Comparison analysis complete")
    };
    total += points;
    reasons.push(reason.to_string());

    let (points, reason) = if insights.is_fallback() {
        (5, "Insight extraction had issues")
    } else {
        (15, "Cross-paper insights extracted")
    };
    total += points;
    reasons.push(reason.to_string());

    ConfidenceBreakdown {
        score: total.min(MAX_SCORE),
        max_score: MAX_SCORE,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemSummary;

    fn per_item(n: usize) -> StageResult<ExtractionOutput> {
        StageResult::success(ExtractionOutput::PerItem(vec![ItemSummary::default(); n]))
    }

    #[test]
    fn test_all_degraded_scores_twenty() {
        let breakdown = score(
            1,
            &StageResult::degraded("Summarizer failed: boom"),
            &StageResult::degraded("Comparison failed: boom"),
            &StageResult::degraded("Insight extraction failed: boom"),
        );
        assert_eq!(breakdown.score, 20);
        assert_eq!(breakdown.max_score, 100);
        assert_eq!(
            breakdown.reasons,
            vec![
                "Minimal paper coverage (1 paper)",
                "Summary generation had issues",
                "Comparison had issues",
                "Insight extraction had issues",
            ]
        );
    }

    #[test]
    fn test_full_marks() {
        let breakdown = score(
            12,
            &per_item(12),
            &StageResult::success(Comparison::default()),
            &StageResult::success(Insights::default()),
        );
        assert_eq!(breakdown.score, 85);
        assert_eq!(breakdown.reasons[0], "Strong paper coverage (8+ papers)");
    }

    #[test]
    fn test_item_count_bands() {
        let ok_cmp = StageResult::success(Comparison::default());
        let ok_ins = StageResult::success(Insights::default());
        let points = |n| score(n, &per_item(1), &ok_cmp, &ok_ins).score - 55;

        assert_eq!(points(0), 5);
        assert_eq!(points(1), 5);
        assert_eq!(points(2), 10);
        assert_eq!(points(4), 10);
        assert_eq!(points(5), 20);
        assert_eq!(points(7), 20);
        assert_eq!(points(8), 30);
    }

    #[test]
    fn test_extraction_signals() {
        let ok_cmp = StageResult::success(Comparison::default());
        let ok_ins = StageResult::success(Insights::default());

        let digest = StageResult::success(ExtractionOutput::Digest(serde_json::Map::new()));
        assert_eq!(score(3, &digest, &ok_cmp, &ok_ins).score, 10 + 15 + 20 + 15);

        let empty_list = per_item(0);
        let breakdown = score(3, &empty_list, &ok_cmp, &ok_ins);
        assert_eq!(breakdown.score, 10 + 5 + 20 + 15);
        assert_eq!(breakdown.reasons[1], "Summary generation had issues");
    }

    #[test]
    fn test_digest_with_error_marker_scores_as_issue() {
        let ok_cmp = StageResult::success(Comparison::default());
        let ok_ins = StageResult::success(Insights::default());

        let mut map = serde_json::Map::new();
        map.insert("error".to_string(), "could not summarize".into());
        let digest = StageResult::success(ExtractionOutput::Digest(map));

        let breakdown = score(3, &digest, &ok_cmp, &ok_ins);
        assert_eq!(breakdown.score, 10 + 5 + 20 + 15);
        assert_eq!(breakdown.reasons[1], "Summary generation had issues");
    }

    #[test]
    fn test_mixed_signals() {
        let breakdown = score(
            6,
            &per_item(6),
            &StageResult::degraded("Comparison failed: timeout"),
            &StageResult::success(Insights::default()),
        );
        assert_eq!(breakdown.score, 20 + 20 + 5 + 15);
        assert!(breakdown.score <= MAX_SCORE);
    }
}
