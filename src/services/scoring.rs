//! Scoring, ranking and pagination of a day's results.
//!
//! A right answer is worth [`BASE_POINTS`] plus a speed bonus of
//! `2 - timeTaken / timeWindow`, floored at zero. An instant answer earns the
//! full [`MAX_BONUS`], one at the deadline earns 1, and the bonus is gone at
//! twice the window. A perfect question is worth [`MAX_POINTS_PER_QUESTION`].

use std::collections::BTreeMap;

use crate::models::{
    attempt::{RankedResult, ResultRow, Verdict},
    question::QuestionType,
};

pub const BASE_POINTS: f64 = 4.0;
pub const MAX_BONUS: f64 = 2.0;
pub const MAX_POINTS_PER_QUESTION: f64 = BASE_POINTS + MAX_BONUS;

/// Compares a submitted answer with an answer key.
///
/// MCQ answers are option indices that arrive as `1`, `"1"` or `"1.0"`
/// depending on the client, so numeric values compare as numbers. An empty
/// answer (timeout) never matches.
pub fn answers_match(answer: &str, correct: Option<&str>) -> bool {
    let answer = answer.trim();
    let Some(correct) = correct.map(str::trim) else {
        return false;
    };
    if answer.is_empty() || correct.is_empty() {
        return false;
    }

    match (answer.parse::<f64>(), correct.parse::<f64>()) {
        (Ok(a), Ok(c)) => a == c,
        _ => answer == correct,
    }
}

/// Verdict of an MCQ answer, derived on every read.
pub fn mcq_verdict(answer: &str, correct: Option<&str>) -> Verdict {
    if answers_match(answer, correct) {
        Verdict::Right
    } else {
        Verdict::Wrong
    }
}

/// Effective verdict of an attempt given its question type and stored state.
pub fn verdict_for(
    question_type: QuestionType,
    answer: &str,
    correct: Option<&str>,
    stored: Option<Verdict>,
) -> Verdict {
    match question_type {
        QuestionType::Mcq => mcq_verdict(answer, correct),
        QuestionType::Descriptive => stored.unwrap_or(Verdict::Pending),
    }
}

/// `max(0, 2 - timeTaken / timeWindow)`, clamped to `[0, 2]`.
pub fn time_bonus(time_taken: f64, time_window: i32) -> f64 {
    if time_window <= 0 {
        return 0.0;
    }
    let taken = if time_taken.is_finite() {
        time_taken.max(0.0)
    } else {
        f64::from(time_window)
    };
    (MAX_BONUS - taken / f64::from(time_window)).clamp(0.0, MAX_BONUS)
}

/// Points earned by one attempt. Pending and wrong descriptive answers earn 0.
pub fn attempt_points(row: &ResultRow) -> f64 {
    let verdict = verdict_for(
        row.question_type,
        &row.answer,
        row.correct_answer.as_deref(),
        row.is_correct,
    );
    if verdict == Verdict::Right {
        BASE_POINTS + time_bonus(row.time_taken, row.time_window)
    } else {
        0.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Groups rows by user, scores and ranks them.
///
/// `search` filters by case-insensitive substring of the user's name before
/// ranking, so ranks describe standing within the filtered cohort. Ties on
/// score fall back to percentage, then to user id to keep the order stable.
pub fn rank_results(rows: &[ResultRow], search: &str) -> Vec<RankedResult> {
    let needle = search.trim().to_lowercase();

    let mut per_user: BTreeMap<i64, (String, f64, usize)> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|r| needle.is_empty() || r.name.to_lowercase().contains(&needle))
    {
        let entry = per_user
            .entry(row.user_id)
            .or_insert_with(|| (row.name.clone(), 0.0, 0));
        entry.1 += attempt_points(row);
        entry.2 += 1;
    }

    let mut ranked: Vec<RankedResult> = per_user
        .into_iter()
        .map(|(user_id, (name, score, total_questions))| {
            let percentage = if total_questions > 0 {
                round2(score / (total_questions as f64 * MAX_POINTS_PER_QUESTION) * 100.0)
            } else {
                0.0
            };
            RankedResult {
                user_id,
                name,
                score: round2(score),
                percentage,
                total_questions,
                rank: 0,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.percentage.total_cmp(&a.percentage))
            .then(a.user_id.cmp(&b.user_id))
    });
    for (position, result) in ranked.iter_mut().enumerate() {
        result.rank = position + 1;
    }
    ranked
}

/// One page of an already ranked list, plus the page count.
/// `page` is 1-based; ranks are never recomputed per page.
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> (Vec<T>, usize) {
    let limit = limit.max(1);
    let page = page.max(1);
    let total_pages = items.len().div_ceil(limit);
    let slice = items
        .iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .cloned()
        .collect();
    (slice, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(user_id: i64, name: &str, answer: &str, correct: &str, taken: f64) -> ResultRow {
        ResultRow {
            user_id,
            name: name.to_string(),
            question_type: QuestionType::Mcq,
            correct_answer: Some(correct.to_string()),
            time_window: 20,
            answer: answer.to_string(),
            time_taken: taken,
            is_correct: None,
        }
    }

    fn descriptive(user_id: i64, name: &str, verdict: Verdict, taken: f64) -> ResultRow {
        ResultRow {
            user_id,
            name: name.to_string(),
            question_type: QuestionType::Descriptive,
            correct_answer: None,
            time_window: 20,
            answer: "foo".to_string(),
            time_taken: taken,
            is_correct: Some(verdict),
        }
    }

    #[test]
    fn canonical_comparison_ignores_representation() {
        assert!(answers_match("1", Some("1")));
        assert!(answers_match(" 1 ", Some("1.0")));
        assert!(!answers_match("2", Some("1")));
        assert!(!answers_match("", Some("0")));
        assert!(!answers_match("1", None));
    }

    #[test]
    fn time_bonus_bounds() {
        assert_eq!(time_bonus(0.0, 20), 2.0);
        assert_eq!(time_bonus(10.0, 20), 1.5);
        assert_eq!(time_bonus(20.0, 20), 1.0);
        assert_eq!(time_bonus(40.0, 20), 0.0);
        assert_eq!(time_bonus(400.0, 20), 0.0);
        assert_eq!(time_bonus(-5.0, 20), 2.0);
        assert_eq!(time_bonus(5.0, 0), 0.0);
    }

    #[test]
    fn time_bonus_never_increases_with_time() {
        let mut previous = time_bonus(0.0, 30);
        for tenth in 1..=700 {
            let current = time_bonus(tenth as f64 / 10.0, 30);
            assert!(current <= previous);
            assert!((0.0..=MAX_BONUS).contains(&current));
            previous = current;
        }
    }

    #[test]
    fn mixed_day_scores_as_expected() {
        let rows = vec![
            mcq(1, "Asha", "1", "1", 10.0),
            descriptive(1, "Asha", Verdict::Pending, 5.0),
        ];
        let ranked = rank_results(&rows, "");

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 5.5);
        assert_eq!(ranked[0].total_questions, 2);
        assert_eq!(ranked[0].percentage, 45.83);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn marking_descriptive_right_adds_points() {
        let pending = vec![descriptive(1, "Ravi", Verdict::Pending, 10.0)];
        let right = vec![descriptive(1, "Ravi", Verdict::Right, 10.0)];
        let wrong = vec![descriptive(1, "Ravi", Verdict::Wrong, 10.0)];

        assert_eq!(rank_results(&pending, "")[0].score, 0.0);
        assert_eq!(rank_results(&wrong, "")[0].score, 0.0);
        assert_eq!(rank_results(&right, "")[0].score, 5.5);
    }

    #[test]
    fn ranks_by_score_then_percentage() {
        let rows = vec![
            mcq(1, "Slow", "0", "0", 20.0),
            mcq(2, "Fast", "0", "0", 0.0),
            mcq(3, "Wrong", "1", "0", 1.0),
            // Same score as Slow over two questions: lower percentage.
            mcq(4, "Two", "0", "0", 20.0),
            mcq(4, "Two", "", "0", 20.0),
        ];
        let ranked = rank_results(&rows, "");
        let order: Vec<i64> = ranked.iter().map(|r| r.user_id).collect();

        assert_eq!(order, vec![2, 1, 4, 3]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn search_filters_case_insensitively_before_ranking() {
        let rows = vec![
            mcq(1, "Priya Sharma", "0", "0", 0.0),
            mcq(2, "Arjun", "0", "0", 10.0),
            mcq(3, "PRIYANKA", "0", "0", 15.0),
        ];
        let ranked = rank_results(&rows, "priya");

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].user_id, 1);
        assert_eq!(ranked[1].user_id, 3);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn pagination_keeps_global_ranks() {
        let rows: Vec<ResultRow> = (1..=25)
            .map(|i| mcq(i, &format!("user{}", i), "0", "0", i as f64 / 2.0))
            .collect();
        let ranked = rank_results(&rows, "");

        let (first, total_pages) = paginate(&ranked, 1, 10);
        assert_eq!(total_pages, 3);
        assert_eq!(first.iter().map(|r| r.rank).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());

        let (third, _) = paginate(&ranked, 3, 10);
        assert_eq!(third.iter().map(|r| r.rank).collect::<Vec<_>>(), (21..=25).collect::<Vec<_>>());

        let (beyond, _) = paginate(&ranked, 9, 10);
        assert!(beyond.is_empty());
    }
}
