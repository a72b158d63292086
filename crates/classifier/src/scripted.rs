//! Scripted classifier for tests: plays back a fixed sequence of results.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use triagedesk_core::{Category, TriageOutcome, Urgency};

use crate::result::ClassifierError;
use crate::traits::Classifier;

/// One scripted step.
pub enum Script {
    Ok(TriageOutcome),
    Fail(String),
}

/// Plays back scripted steps in order; once the script is exhausted it
/// repeats the final behavior. Counts invocations for assertions.
pub struct ScriptedClassifier {
    steps: Mutex<VecDeque<Script>>,
    last: Mutex<Option<Script>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(steps: Vec<Script>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeeds with the same outcome.
    pub fn always_ok(outcome: TriageOutcome) -> Self {
        Self::new(vec![Script::Ok(outcome)])
    }

    /// Always fails with the given reason.
    pub fn always_fail(reason: impl Into<String>) -> Self {
        Self::new(vec![Script::Fail(reason.into())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A plausible fixed outcome for tests that don't care about values.
    pub fn sample_outcome() -> TriageOutcome {
        TriageOutcome {
            category: Category::Technical,
            sentiment: 4,
            urgency: Urgency::Medium,
            draft: "Thanks for the report; we are on it.".to_string(),
        }
    }
}

fn replay(step: &Script) -> Result<TriageOutcome, ClassifierError> {
    match step {
        Script::Ok(outcome) => Ok(outcome.clone()),
        Script::Fail(reason) => Err(ClassifierError::Malformed(reason.clone())),
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn triage(&self, _content: &str) -> Result<TriageOutcome, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut steps = self.steps.lock().expect("lock poisoned");
        if let Some(step) = steps.pop_front() {
            let result = replay(&step);
            *self.last.lock().expect("lock poisoned") = Some(step);
            return result;
        }
        drop(steps);

        let last = self.last.lock().expect("lock poisoned");
        match last.as_ref() {
            Some(step) => replay(step),
            None => Err(ClassifierError::Malformed("empty script".to_string())),
        }
    }
}
