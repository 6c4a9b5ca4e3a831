use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Stable identifier of a question inside the bank.
pub type QuestionId = u32;

/// A single question/answer pair, as stored in the bank file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Stable identifier, unique within the bank.
    pub id: QuestionId,
    /// Prompt read out to the participants.
    #[validate(length(min = 1))]
    pub question: String,
    /// Expected answer, only shown once revealed.
    #[validate(length(min = 1))]
    pub answer: String,
}

/// Reasons a question bank can be rejected at load time.
#[derive(Debug, Error)]
pub enum QuestionBankError {
    /// The bank does not contain a single question.
    #[error("question bank is empty")]
    Empty,
    /// Two records share the same identifier.
    #[error("duplicate question id `{0}`")]
    DuplicateId(QuestionId),
    /// A record failed field validation.
    #[error("question `{id}` is invalid: {source}")]
    Invalid {
        /// Identifier of the offending record.
        id: QuestionId,
        /// Field-level validation failures.
        #[source]
        source: ValidationErrors,
    },
}

/// Immutable, ordered collection of questions loaded once at startup.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Validate the records and build the bank, preserving their order.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            question
                .validate()
                .map_err(|source| QuestionBankError::Invalid {
                    id: question.id,
                    source,
                })?;
            if !seen.insert(question.id) {
                return Err(QuestionBankError::DuplicateId(question.id));
            }
        }

        Ok(Self { questions })
    }

    /// Number of questions in the bank.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the bank holds no question. Always false for a constructed bank.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Iterate the questions in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Look a question up by identifier.
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Whether `id` belongs to the bank.
    pub fn contains(&self, id: QuestionId) -> bool {
        self.get(id).is_some()
    }

    /// Return the bank order as a uniformly shuffled list of identifiers.
    ///
    /// Only used for display/sequencing; question selection goes through the
    /// usage tracker.
    pub fn shuffled_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<QuestionId> {
        let mut order: Vec<QuestionId> = self.questions.iter().map(|q| q.id).collect();
        order.shuffle(rng);
        order
    }
}

#[cfg(test)]
pub(crate) fn sample_bank(size: u32) -> QuestionBank {
    let questions = (1..=size)
        .map(|id| Question {
            id,
            question: format!("question {id}"),
            answer: format!("answer {id}"),
        })
        .collect();
    QuestionBank::new(questions).expect("valid sample bank")
}
