use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Named slots of [`PipelineState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Question,
    Context,
    Answer,
    FormattedOutput,
}

impl StateField {
    pub fn name(&self) -> &'static str {
        match self {
            StateField::Question => "question",
            StateField::Context => "context",
            StateField::Answer => "answer",
            StateField::FormattedOutput => "formatted_output",
        }
    }
}

/// Timing of one executed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    /// Unix timestamp when the stage started
    pub timestamp: i64,
    pub duration_ms: u64,
}

/// Per-request record threaded through the pipeline
///
/// Every field is write-once: the question is fixed at construction and each
/// later field can be set exactly one time through [`PipelineState::set`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    question: String,
    context: Option<String>,
    answer: Option<String>,
    formatted_output: Option<String>,
    #[serde(default)]
    steps: Vec<StageRecord>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            answer: None,
            formatted_output: None,
            steps: Vec::new(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Retrieved passages joined in rank order
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn formatted_output(&self) -> Option<&str> {
        self.formatted_output.as_deref()
    }

    pub fn steps(&self) -> &[StageRecord] {
        &self.steps
    }

    pub fn get(&self, field: StateField) -> Option<&str> {
        match field {
            StateField::Question => Some(&self.question),
            StateField::Context => self.context(),
            StateField::Answer => self.answer(),
            StateField::FormattedOutput => self.formatted_output(),
        }
    }

    /// Like [`Self::get`], but an unset field is an error
    pub fn require(&self, field: StateField) -> Result<&str> {
        self.get(field).ok_or(AppError::MissingField(field.name()))
    }

    /// Write a field that has not been written yet
    pub fn set(&mut self, field: StateField, value: String) -> Result<()> {
        let slot = match field {
            StateField::Question => return Err(AppError::FieldAlreadySet(field.name())),
            StateField::Context => &mut self.context,
            StateField::Answer => &mut self.answer,
            StateField::FormattedOutput => &mut self.formatted_output,
        };
        if slot.is_some() {
            return Err(AppError::FieldAlreadySet(field.name()));
        }
        *slot = Some(value);
        Ok(())
    }

    pub(crate) fn record_step(&mut self, record: StageRecord) {
        self.steps.push(record);
    }
}
