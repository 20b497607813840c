//! The aggregation engine.
//!
//! Pure, synchronous reduction of joined response rows into per-category
//! and overall score statistics. The engine performs no I/O; its only
//! failure mode is malformed input, surfaced as a [`ValidationError`]
//! naming the offending response.

use crate::models::{
    zeroed_distribution, CategoryAverage, CommentEntry, CycleScore, Distribution, QuestionKind,
    RankedCategory, Rankings, ResponseRow, ScoreSummary, TrendPoint, ValidationError,
    REPORT_SCHEMA_VERSION,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Default number of categories in each of strengths and weaknesses.
pub const DEFAULT_TOP_N: usize = 3;

/// Round to two decimal places for report output.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct CategoryAcc {
    name: String,
    color: String,
    sort_order: i32,
    sum: i64,
    count: u64,
    distribution: Distribution,
}

/// Compute per-category averages and score distributions.
///
/// Only rating responses participate; text and boolean answers are skipped.
/// Categories with no rating responses are excluded entirely rather than
/// reported with a zero average. Results are ordered by the category's
/// configured sort order, ties broken by category id, so identical input
/// always yields identical output regardless of row order.
pub fn compute_category_averages(
    rows: &[ResponseRow],
) -> Result<Vec<CategoryAverage>, ValidationError> {
    let mut by_category: BTreeMap<String, CategoryAcc> = BTreeMap::new();

    for row in rows {
        if row.question_kind != QuestionKind::Rating {
            continue;
        }
        let value = match row.rating_value {
            Some(v) => v,
            None => continue,
        };

        if value < row.min_value || value > row.max_value {
            return Err(ValidationError::RatingOutOfRange {
                response_id: row.response_id.clone(),
                value,
                min: row.min_value,
                max: row.max_value,
            });
        }

        let acc = by_category
            .entry(row.category_id.clone())
            .or_insert_with(|| CategoryAcc {
                name: row.category_name.clone(),
                color: row.category_color.clone(),
                sort_order: row.category_sort_order,
                sum: 0,
                count: 0,
                distribution: zeroed_distribution(),
            });

        // Ratings are integers, so the sum is exact and the mean does not
        // depend on accumulation order.
        acc.sum += i64::from(value);
        acc.count += 1;
        *acc.distribution.entry(value).or_insert(0) += 1;
    }

    let mut averages: Vec<(i32, String, CategoryAverage)> = by_category
        .into_iter()
        .map(|(id, acc)| {
            let average = round2(acc.sum as f64 / acc.count as f64);
            (
                acc.sort_order,
                id.clone(),
                CategoryAverage {
                    id,
                    name: acc.name,
                    color: acc.color,
                    average,
                    count: acc.count,
                    distribution: acc.distribution,
                },
            )
        })
        .collect();

    averages.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    Ok(averages.into_iter().map(|(_, _, ca)| ca).collect())
}

/// Mean of the category averages.
///
/// Every category weighs equally regardless of how many questions it holds,
/// so a large category cannot dominate the overall score. Empty input means
/// "no data yet" and yields 0, not an error.
pub fn compute_overall_average(categories: &[CategoryAverage]) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }
    let sum: f64 = categories.iter().map(|c| c.average).sum();
    round2(sum / categories.len() as f64)
}

/// Rank the top and bottom `n` categories by average score.
///
/// Ties keep the configured category order, so output is deterministic.
/// When `2 * n` would cover every category, the sorted list is split down
/// the middle instead, so a category never appears as both a strength and
/// a weakness; an odd count gives the extra category to strengths.
/// Weaknesses are returned lowest first.
pub fn rank_strengths_weaknesses(categories: &[CategoryAverage], n: usize) -> Rankings {
    if categories.is_empty() || n == 0 {
        return Rankings::default();
    }

    // Stable sort: ties stay in the input's (sort order, id) order.
    let mut descending: Vec<&CategoryAverage> = categories.iter().collect();
    descending.sort_by(|a, b| b.average.partial_cmp(&a.average).unwrap_or(Ordering::Equal));

    let total = descending.len();
    let take_strengths = if total <= 2 * n { total.div_ceil(2) } else { n };
    let take_weaknesses = if total <= 2 * n {
        total - take_strengths
    } else {
        n
    };

    let strengths: Vec<RankedCategory> = descending[..take_strengths]
        .iter()
        .map(|ca| RankedCategory::from(*ca))
        .collect();

    let mut tail: Vec<&CategoryAverage> = descending[total - take_weaknesses..].to_vec();
    tail.sort_by(|a, b| a.average.partial_cmp(&b.average).unwrap_or(Ordering::Equal));
    let weaknesses: Vec<RankedCategory> =
        tail.into_iter().map(RankedCategory::from).collect();

    Rankings {
        strengths,
        weaknesses,
    }
}

/// Count rating responses per scale value across all categories.
pub fn compute_response_distribution(
    rows: &[ResponseRow],
) -> Result<Distribution, ValidationError> {
    let mut distribution = zeroed_distribution();

    for row in rows {
        if row.question_kind != QuestionKind::Rating {
            continue;
        }
        let value = match row.rating_value {
            Some(v) => v,
            None => continue,
        };
        if value < row.min_value || value > row.max_value {
            return Err(ValidationError::RatingOutOfRange {
                response_id: row.response_id.clone(),
                value,
                min: row.min_value,
                max: row.max_value,
            });
        }
        *distribution.entry(value).or_insert(0) += 1;
    }

    Ok(distribution)
}

/// Chart points for the score-over-time view: one per cycle, ordered by
/// cycle end date ascending. No smoothing, no interpolation of gaps.
pub fn compute_trend(cycles: &[CycleScore]) -> Vec<TrendPoint> {
    let mut ordered: Vec<&CycleScore> = cycles.iter().collect();
    ordered.sort_by(|a, b| {
        a.end_date
            .cmp(&b.end_date)
            .then_with(|| a.cycle_id.cmp(&b.cycle_id))
    });

    ordered
        .into_iter()
        .map(|c| TrendPoint {
            date: c.end_date,
            score: c.overall_average,
        })
        .collect()
}

/// Compute the full score summary for one report scope.
pub fn build_summary(
    rows: &[ResponseRow],
    top_n: usize,
) -> Result<ScoreSummary, ValidationError> {
    if rows.is_empty() {
        return Ok(ScoreSummary::empty());
    }

    let category_averages = compute_category_averages(rows)?;
    let overall_average = compute_overall_average(&category_averages);
    let Rankings {
        strengths,
        weaknesses,
    } = rank_strengths_weaknesses(&category_averages, top_n);
    let response_distribution = compute_response_distribution(rows)?;

    Ok(ScoreSummary {
        schema_version: REPORT_SCHEMA_VERSION,
        overall_average,
        category_averages,
        strengths,
        weaknesses,
        total_responses: rows.len() as u64,
        response_distribution,
    })
}

/// Collect free-text answers and comments, attributed by respondent role.
///
/// Entries are grouped by category order; within a category they keep the
/// input order.
pub fn collect_comments(rows: &[ResponseRow]) -> Vec<CommentEntry> {
    let mut keyed: Vec<(i32, String, CommentEntry)> = Vec::new();

    for row in rows {
        if let Some(text) = row.text_response.as_deref() {
            if !text.trim().is_empty() {
                keyed.push((
                    row.category_sort_order,
                    row.category_id.clone(),
                    CommentEntry {
                        category_name: row.category_name.clone(),
                        question_text: row.question_text.clone(),
                        respondent_role: row.respondent_role,
                        text: text.trim().to_string(),
                    },
                ));
            }
        }
        if let Some(comment) = row.comment.as_deref() {
            if !comment.trim().is_empty() {
                keyed.push((
                    row.category_sort_order,
                    row.category_id.clone(),
                    CommentEntry {
                        category_name: row.category_name.clone(),
                        question_text: row.question_text.clone(),
                        respondent_role: row.respondent_role,
                        text: comment.trim().to_string(),
                    },
                ));
            }
        }
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, _, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RespondentRole;

    fn rating_row(id: &str, category: &str, sort_order: i32, value: i32) -> ResponseRow {
        ResponseRow {
            response_id: id.to_string(),
            respondent_id: format!("resp-{}", id),
            respondent_role: RespondentRole::Peer,
            question_id: format!("q-{}", id),
            question_text: "How well does this person communicate?".to_string(),
            question_kind: QuestionKind::Rating,
            category_id: category.to_lowercase(),
            category_name: category.to_string(),
            category_color: "#3B82F6".to_string(),
            category_sort_order: sort_order,
            min_value: 1,
            max_value: 5,
            rating_value: Some(value),
            text_response: None,
            boolean_response: None,
            comment: None,
        }
    }

    fn text_row(id: &str, category: &str, sort_order: i32, text: &str) -> ResponseRow {
        ResponseRow {
            question_kind: QuestionKind::Text,
            rating_value: None,
            text_response: Some(text.to_string()),
            ..rating_row(id, category, sort_order, 0)
        }
    }

    fn category(id: &str, sort_order: i32, average: f64) -> CategoryAverage {
        CategoryAverage {
            id: id.to_lowercase(),
            name: id.to_string(),
            color: "#3B82F6".to_string(),
            average,
            count: 1,
            distribution: zeroed_distribution(),
        }
    }

    #[test]
    fn test_category_average_is_arithmetic_mean() {
        let rows = vec![
            rating_row("r1", "A", 0, 5),
            rating_row("r2", "A", 0, 3),
            rating_row("r3", "B", 1, 1),
        ];

        let averages = compute_category_averages(&rows).unwrap();

        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].name, "A");
        assert_eq!(averages[0].average, 4.0);
        assert_eq!(averages[0].count, 2);
        assert_eq!(averages[0].distribution[&5], 1);
        assert_eq!(averages[0].distribution[&3], 1);
        assert_eq!(averages[0].distribution[&1], 0);
        assert_eq!(averages[1].name, "B");
        assert_eq!(averages[1].average, 1.0);
        assert_eq!(averages[1].distribution[&1], 1);
    }

    #[test]
    fn test_distribution_sums_to_count() {
        let rows = vec![
            rating_row("r1", "A", 0, 2),
            rating_row("r2", "A", 0, 2),
            rating_row("r3", "A", 0, 4),
        ];

        let averages = compute_category_averages(&rows).unwrap();
        let total: u64 = averages[0].distribution.values().sum();
        assert_eq!(total, averages[0].count);
    }

    #[test]
    fn test_out_of_range_rating_is_an_error() {
        let mut bad = rating_row("r-bad", "A", 0, 6);
        bad.max_value = 5;
        let rows = vec![rating_row("r1", "A", 0, 3), bad];

        let err = compute_category_averages(&rows).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RatingOutOfRange {
                response_id: "r-bad".to_string(),
                value: 6,
                min: 1,
                max: 5,
            }
        );
    }

    #[test]
    fn test_rating_respects_question_declared_range() {
        // A 1..=3 question: 3 is fine, 4 is not.
        let mut narrow = rating_row("r1", "A", 0, 3);
        narrow.max_value = 3;
        assert!(compute_category_averages(&[narrow.clone()]).is_ok());

        narrow.rating_value = Some(4);
        assert!(compute_category_averages(&[narrow]).is_err());
    }

    #[test]
    fn test_category_with_only_null_ratings_is_excluded() {
        let mut unanswered = rating_row("r1", "A", 0, 3);
        unanswered.rating_value = None;
        let rows = vec![unanswered, text_row("r2", "A", 0, "Great listener")];

        let averages = compute_category_averages(&rows).unwrap();
        assert!(averages.is_empty());
    }

    #[test]
    fn test_overall_average_is_mean_of_means() {
        // Two categories with 2 and 20 responses, both averaging 4.0:
        // the overall average must be 4.0, not response-count weighted.
        let mut rows = vec![rating_row("s1", "Small", 0, 4), rating_row("s2", "Small", 0, 4)];
        for i in 0..10 {
            rows.push(rating_row(&format!("b{}", i), "Big", 1, 3));
            rows.push(rating_row(&format!("b{}x", i), "Big", 1, 5));
        }

        let averages = compute_category_averages(&rows).unwrap();
        assert_eq!(averages.len(), 2);
        assert_eq!(compute_overall_average(&averages), 4.0);
    }

    #[test]
    fn test_overall_average_empty_is_zero() {
        assert_eq!(compute_overall_average(&[]), 0.0);
    }

    #[test]
    fn test_rankings_top_and_bottom() {
        let categories = vec![
            category("A", 0, 4.5),
            category("B", 1, 3.0),
            category("C", 2, 2.0),
            category("D", 3, 4.8),
            category("E", 4, 1.5),
            category("F", 5, 3.7),
            category("G", 6, 2.9),
        ];

        let rankings = rank_strengths_weaknesses(&categories, 3);

        let strengths: Vec<&str> = rankings.strengths.iter().map(|c| c.name.as_str()).collect();
        let weaknesses: Vec<&str> = rankings.weaknesses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(strengths, vec!["D", "A", "F"]);
        assert_eq!(weaknesses, vec!["E", "C", "G"]);
    }

    #[test]
    fn test_rankings_never_overlap_for_few_categories() {
        // 4 categories with n=3: split down the middle, 2 and 2.
        let categories = vec![
            category("A", 0, 4.0),
            category("B", 1, 3.5),
            category("C", 2, 2.5),
            category("D", 3, 2.0),
        ];

        let rankings = rank_strengths_weaknesses(&categories, 3);

        assert_eq!(rankings.strengths.len(), 2);
        assert_eq!(rankings.weaknesses.len(), 2);
        for s in &rankings.strengths {
            assert!(rankings.weaknesses.iter().all(|w| w.id != s.id));
        }
        assert_eq!(rankings.strengths[0].name, "A");
        assert_eq!(rankings.weaknesses[0].name, "D");
    }

    #[test]
    fn test_rankings_odd_split_favours_strengths() {
        let categories = vec![
            category("A", 0, 4.0),
            category("B", 1, 3.0),
            category("C", 2, 2.0),
        ];

        let rankings = rank_strengths_weaknesses(&categories, 3);

        assert_eq!(rankings.strengths.len(), 2);
        assert_eq!(rankings.weaknesses.len(), 1);
        assert_eq!(rankings.weaknesses[0].name, "C");
    }

    #[test]
    fn test_rankings_ties_keep_category_order() {
        let categories = vec![
            category("A", 0, 3.0),
            category("B", 1, 3.0),
            category("C", 2, 3.0),
            category("D", 3, 3.0),
        ];

        let rankings = rank_strengths_weaknesses(&categories, 3);

        let strengths: Vec<&str> = rankings.strengths.iter().map(|c| c.name.as_str()).collect();
        let weaknesses: Vec<&str> = rankings.weaknesses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(strengths, vec!["A", "B"]);
        assert_eq!(weaknesses, vec!["C", "D"]);
    }

    #[test]
    fn test_response_distribution_spans_all_categories() {
        let rows = vec![
            rating_row("r1", "A", 0, 5),
            rating_row("r2", "A", 0, 3),
            rating_row("r3", "B", 1, 1),
        ];

        let dist = compute_response_distribution(&rows).unwrap();
        assert_eq!(dist[&1], 1);
        assert_eq!(dist[&2], 0);
        assert_eq!(dist[&3], 1);
        assert_eq!(dist[&4], 0);
        assert_eq!(dist[&5], 1);
    }

    #[test]
    fn test_trend_orders_by_end_date() {
        let cycles = vec![
            CycleScore {
                cycle_id: "c2".to_string(),
                cycle_name: "Q2 2025".to_string(),
                end_date: "2025-06-30".parse().unwrap(),
                overall_average: 3.8,
            },
            CycleScore {
                cycle_id: "c1".to_string(),
                cycle_name: "Q1 2025".to_string(),
                end_date: "2025-03-31".parse().unwrap(),
                overall_average: 3.5,
            },
        ];

        let trend = compute_trend(&cycles);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, "2025-03-31".parse().unwrap());
        assert_eq!(trend[0].score, 3.5);
        assert_eq!(trend[1].score, 3.8);
    }

    #[test]
    fn test_build_summary_scenario() {
        // [{cat A, 5}, {cat A, 3}, {cat B, 1}]
        let rows = vec![
            rating_row("r1", "A", 0, 5),
            rating_row("r2", "A", 0, 3),
            rating_row("r3", "B", 1, 1),
        ];

        let summary = build_summary(&rows, DEFAULT_TOP_N).unwrap();

        assert_eq!(summary.category_averages.len(), 2);
        assert_eq!(summary.category_averages[0].average, 4.0);
        assert_eq!(summary.category_averages[1].average, 1.0);
        assert_eq!(summary.overall_average, 2.5);
        assert_eq!(summary.total_responses, 3);
        assert_eq!(summary.response_distribution[&1], 1);
        assert_eq!(summary.response_distribution[&3], 1);
        assert_eq!(summary.response_distribution[&5], 1);
        // Two categories, n=3: non-overlapping split, one each.
        assert_eq!(summary.strengths.len(), 1);
        assert_eq!(summary.weaknesses.len(), 1);
        assert_eq!(summary.strengths[0].name, "A");
        assert_eq!(summary.weaknesses[0].name, "B");
    }

    #[test]
    fn test_build_summary_empty_input() {
        let summary = build_summary(&[], DEFAULT_TOP_N).unwrap();
        assert_eq!(summary, ScoreSummary::empty());
    }

    #[test]
    fn test_summary_is_idempotent() {
        let rows = vec![
            rating_row("r1", "A", 0, 5),
            rating_row("r2", "B", 1, 2),
            rating_row("r3", "A", 0, 4),
        ];

        let first = serde_json::to_string(&build_summary(&rows, 3).unwrap()).unwrap();
        let second = serde_json::to_string(&build_summary(&rows, 3).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_is_order_independent() {
        let rows = vec![
            rating_row("r1", "A", 0, 5),
            rating_row("r2", "B", 1, 2),
            rating_row("r3", "A", 0, 4),
            rating_row("r4", "C", 2, 3),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = build_summary(&rows, 3).unwrap();
        let backward = build_summary(&reversed, 3).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_collect_comments_groups_by_category_order() {
        let mut with_comment = rating_row("r1", "B", 1, 4);
        with_comment.comment = Some("Could delegate more".to_string());
        let rows = vec![
            with_comment,
            text_row("r2", "A", 0, "Strong communicator"),
            text_row("r3", "A", 0, "   "),
        ];

        let comments = collect_comments(&rows);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].category_name, "A");
        assert_eq!(comments[0].text, "Strong communicator");
        assert_eq!(comments[1].category_name, "B");
        assert_eq!(comments[1].respondent_role, RespondentRole::Peer);
    }
}
