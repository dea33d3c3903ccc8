use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            OptionLabel::A => 'A',
            OptionLabel::B => 'B',
            OptionLabel::C => 'C',
            OptionLabel::D => 'D',
        }
    }

    /// Case-insensitive; anything outside `A..=D` is `None`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLabel::A),
            'B' => Some(OptionLabel::B),
            'C' => Some(OptionLabel::C),
            'D' => Some(OptionLabel::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One multiple-choice question as recovered from the uploaded document.
///
/// `options` always holds four entries, indexed by [`OptionLabel::index`].
/// Entries the parser could not find stay empty, and `correct_answer` is
/// `None` when no answer line was present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub text: String,
    pub options: [String; 4],
    pub correct_answer: Option<OptionLabel>,
}

impl QuestionRecord {
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    pub fn is_degraded(&self) -> bool {
        self.correct_answer.is_none() || self.options.iter().any(|o| o.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub code: String,
    pub timer: Option<TimerSettings>,
}

impl ExamConfig {
    pub fn timer_enabled(&self) -> bool {
        self.timer.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub roll_number: String,
    pub name: String,
    pub score: u32,
    pub submit_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreSummary {
    pub score: u32,
    pub total: u32,
    pub percent: f64,
}

/// Export row; `rank` is blank past the podium.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedRow {
    #[serde(rename = "Roll No")]
    pub roll_number: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Marks")]
    pub marks: u32,
    #[serde(rename = "Rank")]
    pub rank: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_option_slots() {
        for (i, label) in OptionLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
        assert_eq!(OptionLabel::from_char('c'), Some(OptionLabel::C));
        assert_eq!(OptionLabel::from_char('E'), None);
    }

    #[test]
    fn degraded_when_answer_or_option_missing() {
        let mut q = QuestionRecord {
            text: "Q".into(),
            options: ["1".into(), "2".into(), "3".into(), "4".into()],
            correct_answer: Some(OptionLabel::A),
        };
        assert!(!q.is_degraded());
        q.options[2].clear();
        assert!(q.is_degraded());
        q.options[2] = "3".into();
        q.correct_answer = None;
        assert!(q.is_degraded());
    }

    #[test]
    fn label_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&OptionLabel::B).unwrap(), "\"B\"");
    }
}
