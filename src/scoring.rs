use crate::models::{OptionLabel, QuestionRecord, RankedRow, ResultRecord, ScoreSummary};
use std::collections::BTreeMap;

/// Only the first three positions carry a visible rank.
pub const PODIUM_SIZE: usize = 3;

/// Counts exact matches between recorded answers and answer keys.
///
/// A question without an answer key can never be answered correctly.
pub fn score(questions: &[QuestionRecord], answers: &BTreeMap<usize, OptionLabel>) -> ScoreSummary {
    let score = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| match (answers.get(i), q.correct_answer) {
            (Some(given), Some(expected)) => *given == expected,
            _ => false,
        })
        .count() as u32;
    let total = questions.len() as u32;
    ScoreSummary {
        score,
        total,
        percent: percent(score, total),
    }
}

fn percent(score: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (f64::from(score) * 100.0 / f64::from(total) * 100.0).round() / 100.0
    }
}

/// Orders results by submission time, earliest first. Equal times keep
/// their insertion order. The input is not modified.
pub fn rank(results: &[ResultRecord]) -> Vec<RankedRow> {
    let mut ordered: Vec<&ResultRecord> = results.iter().collect();
    ordered.sort_by_key(|r| r.submit_time);
    ordered
        .into_iter()
        .enumerate()
        .map(|(pos, r)| RankedRow {
            roll_number: r.roll_number.clone(),
            name: r.name.clone(),
            marks: r.score,
            rank: (pos < PODIUM_SIZE).then_some(pos as u32 + 1),
        })
        .collect()
}

/// Renders ranked rows as CSV with the `Roll No,Name,Marks,Rank` header.
pub fn export_csv(rows: &[RankedRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
