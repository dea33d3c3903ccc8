use crate::models::{OptionLabel, QuestionRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static BLOCK_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").expect("valid block regex"));
static QUESTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\.\s*(.+)").expect("valid question regex"));
static OPTION_START: Lazy<[Regex; 4]> = Lazy::new(|| {
    OptionLabel::ALL.map(|label| {
        Regex::new(&format!(r"(?m)^{}\)", label.as_char())).expect("valid option regex")
    })
});
static OPTION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[A-D]\)|Answer)").expect("valid option end regex"));
static ANSWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Answer\s*:\s*([A-D])").expect("valid answer regex"));

/// Turns document text into question records.
///
/// Implementations never fail: text that does not look like a question is
/// dropped, and questions with missing parts come back partially empty.
pub trait QuestionParser: Send + Sync {
    fn parse(&self, text: &str) -> Vec<QuestionRecord>;

    fn parse_paragraphs(&self, paragraphs: &[String]) -> Vec<QuestionRecord> {
        self.parse(&join_paragraphs(paragraphs))
    }
}

/// Line-oriented parser for the `1. ... / A) ... / Answer: B` layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternParser;

impl QuestionParser for PatternParser {
    fn parse(&self, text: &str) -> Vec<QuestionRecord> {
        let mut questions = Vec::new();
        for block in split_blocks(text) {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            let Some(record) = parse_block(block) else {
                debug!("skipping text without a question number");
                continue;
            };
            if record.is_degraded() {
                warn!(
                    question = questions.len() + 1,
                    missing_answer = record.correct_answer.is_none(),
                    "question parsed with missing parts: {}",
                    record.text
                );
            }
            questions.push(record);
        }
        questions
    }
}

pub fn parse(text: &str) -> Vec<QuestionRecord> {
    PatternParser.parse(text)
}

pub fn parse_paragraphs(paragraphs: &[String]) -> Vec<QuestionRecord> {
    PatternParser.parse_paragraphs(paragraphs)
}

/// Blank paragraphs are dropped before joining.
pub fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        match blocks.last_mut() {
            Some(current) if !BLOCK_START.is_match(line) => current.push(line),
            _ => blocks.push(vec![line]),
        }
    }
    blocks.into_iter().map(|lines| lines.join("\n")).collect()
}

fn parse_block(block: &str) -> Option<QuestionRecord> {
    let text = QUESTION_LINE.captures(block)?.get(1)?.as_str().trim().to_string();

    let mut options: [String; 4] = Default::default();
    for (slot, start) in options.iter_mut().zip(OPTION_START.iter()) {
        if let Some(m) = start.find(block) {
            let rest = &block[m.end()..];
            let end = OPTION_END.find(rest).map(|e| e.start()).unwrap_or(rest.len());
            *slot = rest[..end].trim().to_string();
        }
    }

    let correct_answer = ANSWER
        .captures(block)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(OptionLabel::from_char);

    Some(QuestionRecord {
        text,
        options,
        correct_answer,
    })
}
