/*
 * src/questions.rs
 * Question data loaded from the catechism JSON files.
 */

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DataError;

/// A scripture citation attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reference {
    pub text: String,
}

/// One catechism question with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl Question {
    /// References joined for the single-line flashcard footer.
    pub fn joined_references(&self) -> String {
        self.references
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn matches(&self, needle: &str) -> bool {
        self.question.to_lowercase().contains(needle) || self.answer.to_lowercase().contains(needle)
    }
}

#[derive(Deserialize)]
struct QuestionFile {
    questions: Vec<Question>,
}

/// The full, immutable list of questions for one catechism.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Read and parse a data file.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json(&raw)?;
        info!(path = %path.display(), count = bank.len(), "loaded questions");
        Ok(bank)
    }

    pub fn from_json(raw: &str) -> Result<Self, DataError> {
        let file: QuestionFile = serde_json::from_str(raw)?;
        Self::new(file.questions)
    }

    pub fn new(questions: Vec<Question>) -> Result<Self, DataError> {
        if questions.is_empty() {
            return Err(DataError::Empty);
        }
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn all_ids(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.id).collect()
    }

    /// Largest id in the bank; ids are 1-based and contiguous.
    pub fn max_id(&self) -> u32 {
        self.questions.iter().map(|q| q.id).max().unwrap_or(0)
    }

    pub fn first_id(&self) -> u32 {
        self.questions.first().map(|q| q.id).unwrap_or(1)
    }

    /// Ids of the questions whose id falls inside `from..=to`, in data order.
    pub fn ids_in_range(&self, from: u32, to: u32) -> Vec<u32> {
        self.questions
            .iter()
            .filter(|q| q.id >= from && q.id <= to)
            .map(|q| q.id)
            .collect()
    }

    /// Case-insensitive search over question and answer text.
    /// An empty filter returns every question.
    pub fn search(&self, filter: &str) -> Vec<&Question> {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return self.questions.iter().collect();
        }
        let found: Vec<&Question> = self.questions.iter().filter(|q| q.matches(&needle)).collect();
        debug!(filter, hits = found.len(), "question search");
        found
    }
}

#[cfg(test)]
pub(crate) fn sample_bank(count: u32) -> QuestionBank {
    let questions = (1..=count)
        .map(|id| Question {
            id,
            question: format!("Question {id}?"),
            answer: format!("Answer {id}."),
            references: if id % 2 == 1 {
                vec![
                    Reference { text: format!("Genesis {id}:1") },
                    Reference { text: format!("John {id}:16") },
                ]
            } else {
                Vec::new()
            },
        })
        .collect();
    QuestionBank::new(questions).expect("non-empty sample")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "questions": [
            { "id": 1, "question": "Who made you?", "answer": "God.",
              "references": [{ "text": "Genesis 1:27" }] },
            { "id": 2, "question": "What else did God make?", "answer": "God made all things." }
        ]
    }"#;

    #[test]
    fn parses_questions_and_defaults_missing_references() {
        let bank = QuestionBank::from_json(DATA).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get(1).unwrap().references[0].text, "Genesis 1:27");
        assert!(bank.get(2).unwrap().references.is_empty());
        assert_eq!(bank.max_id(), 2);
    }

    #[test]
    fn malformed_and_empty_data_are_rejected() {
        assert!(matches!(
            QuestionBank::from_json("{ not json"),
            Err(DataError::Parse(_))
        ));
        assert!(matches!(
            QuestionBank::from_json(r#"{ "questions": [] }"#),
            Err(DataError::Empty)
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = QuestionBank::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn shipped_data_files_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        for name in ["children.json", "shorter.json"] {
            let bank = QuestionBank::load(&root.join(name)).unwrap();
            let ids = bank.all_ids();
            let expected: Vec<u32> = (1..=bank.len() as u32).collect();
            assert_eq!(ids, expected, "{name} ids are 1-based and contiguous");
        }
    }

    #[test]
    fn search_is_case_insensitive_over_question_and_answer() {
        let bank = QuestionBank::from_json(DATA).unwrap();
        let hits = bank.search("ALL THINGS");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
        assert_eq!(bank.search("  ").len(), 2);
        assert!(bank.search("zebra").is_empty());
    }

    #[test]
    fn range_and_joined_references() {
        let bank = sample_bank(12);
        assert_eq!(bank.ids_in_range(3, 5), vec![3, 4, 5]);
        assert_eq!(
            bank.get(1).unwrap().joined_references(),
            "Genesis 1:1; John 1:16"
        );
        assert_eq!(bank.get(2).unwrap().joined_references(), "");
    }
}
