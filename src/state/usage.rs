use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::question::{Question, QuestionBank, QuestionId};

/// Failures raised while selecting the next question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// There is nothing to pick from; the bank was misconfigured.
    #[error("cannot pick a question from an empty bank")]
    EmptyBank,
}

/// Previously asked question identifiers, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageHistory {
    used: VecDeque<QuestionId>,
}

impl UsageHistory {
    /// Build a history from identifiers ordered oldest first.
    pub fn new(used: impl IntoIterator<Item = QuestionId>) -> Self {
        Self {
            used: used.into_iter().collect(),
        }
    }

    /// Identifiers in the history, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.used.iter().copied()
    }

    /// Number of remembered identifiers.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether nothing has been asked yet.
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Whether `id` is currently marked as used.
    pub fn contains(&self, id: QuestionId) -> bool {
        self.used.contains(&id)
    }

    /// Drop identifiers that are unknown to `bank` as well as repeated entries,
    /// keeping the first occurrence.
    pub fn retain_known(&mut self, bank: &QuestionBank) {
        let mut seen = HashSet::with_capacity(self.used.len());
        self.used.retain(|id| bank.contains(*id) && seen.insert(*id));
    }

    fn available<'a>(&self, bank: &'a QuestionBank) -> Vec<&'a Question> {
        bank.iter().filter(|q| !self.contains(q.id)).collect()
    }
}

/// Pick a question that is not in `history`, record it and return it.
///
/// When every question has been used, the oldest entries are forgotten one by
/// one until at least one question becomes available again.
pub fn pick_next<'a, R: Rng + ?Sized>(
    bank: &'a QuestionBank,
    history: &mut UsageHistory,
    rng: &mut R,
) -> Result<&'a Question, UsageError> {
    if bank.is_empty() {
        return Err(UsageError::EmptyBank);
    }

    let mut available = history.available(bank);
    while available.is_empty() {
        if history.used.pop_front().is_none() {
            break;
        }
        available = history.available(bank);
    }

    let question = *available.choose(rng).ok_or(UsageError::EmptyBank)?;
    history.used.push_back(question.id);
    Ok(question)
}

/// Process-wide usage tracker shared by every host running in this process.
#[derive(Debug)]
pub struct UsageTracker {
    bank: Arc<QuestionBank>,
    history: Mutex<UsageHistory>,
}

impl UsageTracker {
    /// Build a tracker from a bank and a previously persisted history.
    pub fn new(bank: Arc<QuestionBank>, mut history: UsageHistory) -> Self {
        history.retain_known(&bank);
        Self {
            bank,
            history: Mutex::new(history),
        }
    }

    /// The bank questions are drawn from.
    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    /// Snapshot of the current history.
    pub fn history(&self) -> UsageHistory {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pick the next question, returning it with the updated history that
    /// should be persisted.
    pub fn pick_next<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Question, UsageHistory), UsageError> {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let question = pick_next(&self.bank, &mut history, rng)?.clone();
        Ok((question, history.clone()))
    }
}
