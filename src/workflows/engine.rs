//! Pipeline Executor
//!
//! Runs an ordered list of stages over a fresh [`PipelineState`] per
//! question. Each stage fires only after the previous one has written its
//! field; there is no branching or looping.

use crate::db::IndexHandle;
use crate::llm::{GatewayClient, ModelSettings};
use crate::types::{AppError, Result};
use crate::utils::toml_config::DocQaConfig;
use crate::workflows::stages::{FormatStage, GenerateStage, RetrieveStage, Stage, StageKind};
use crate::workflows::state::{PipelineState, StageRecord, StateField};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Emitted right after a stage writes its field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvent {
    pub stage: StageKind,
    pub field: StateField,
    pub value: String,
}

/// One item of a streamed execution
#[derive(Debug)]
pub enum StreamEvent {
    /// A stage completed
    Stage(StageEvent),
    /// Execution stopped; always the last item
    Failed {
        stage: Option<StageKind>,
        error: AppError,
    },
}

/// Sequential executor with invoke, batch, and stream modes
#[derive(Clone)]
pub struct PipelineExecutor {
    stages: Vec<Arc<dyn Stage>>,
    batch_concurrency: usize,
}

impl PipelineExecutor {
    /// Executor over an explicit ordered stage list
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            batch_concurrency: 1,
        }
    }

    /// The standard retrieve → generate → format pipeline
    pub fn standard(
        index: IndexHandle,
        gateway: Arc<dyn GatewayClient>,
        k: usize,
        settings: ModelSettings,
    ) -> Self {
        Self::new(vec![
            Arc::new(RetrieveStage::new(index, gateway.clone(), k)),
            Arc::new(GenerateStage::new(gateway, settings)),
            Arc::new(FormatStage),
        ])
    }

    pub fn from_config(
        config: &DocQaConfig,
        index: IndexHandle,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        Self::standard(
            index,
            gateway,
            config.retrieval.k,
            ModelSettings::from_config(&config.models),
        )
        .with_batch_concurrency(config.pipeline.batch_concurrency)
    }

    /// How many batch questions may be in flight at once
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Run every stage and return the finished state
    #[instrument(skip(self, question))]
    pub async fn invoke(&self, question: &str) -> Result<PipelineState> {
        let mut state = new_state(question)?;
        for stage in &self.stages {
            run_stage(stage.as_ref(), &mut state).await?;
        }
        Ok(state)
    }

    /// Invoke each question independently; results keep input order
    pub async fn batch(&self, questions: &[String]) -> Vec<Result<PipelineState>> {
        info!(count = questions.len(), "Running batch");
        stream::iter(questions.to_vec())
            .map(|q| async move { self.invoke(&q).await })
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    /// Run stages lazily, yielding one event per completed stage
    ///
    /// A stage only starts when the consumer polls for the next event, so a
    /// dropped or cancelled stream makes no further gateway calls.
    pub fn stream(&self, question: &str) -> ExecutionStream {
        let stages = self.stages.clone();
        let question = question.to_string();

        let events = async_stream::stream! {
            let mut state = match new_state(&question) {
                Ok(state) => state,
                Err(error) => {
                    yield StreamEvent::Failed { stage: None, error };
                    return;
                }
            };

            for stage in stages {
                match run_stage(stage.as_ref(), &mut state).await {
                    Ok(event) => yield StreamEvent::Stage(event),
                    Err(error) => {
                        yield StreamEvent::Failed { stage: Some(stage.kind()), error };
                        return;
                    }
                }
            }
        };

        ExecutionStream {
            inner: Some(Box::pin(events)),
        }
    }
}

fn new_state(question: &str) -> Result<PipelineState> {
    if question.trim().is_empty() {
        return Err(AppError::InvalidInput("question must not be empty".to_string()));
    }
    Ok(PipelineState::new(question))
}

async fn run_stage(stage: &dyn Stage, state: &mut PipelineState) -> Result<StageEvent> {
    let kind = stage.kind();
    for field in stage.reads() {
        state.require(*field)?;
    }

    let started = Instant::now();
    let timestamp = Utc::now().timestamp();

    let value = match stage.run(state).await {
        Ok(value) => value,
        Err(e) => {
            warn!(stage = kind.name(), error = %e, "Stage failed");
            return Err(e);
        }
    };

    let field = stage.writes();
    state.set(field, value.clone())?;

    let duration_ms = started.elapsed().as_millis() as u64;
    state.record_step(StageRecord {
        stage: kind.name().to_string(),
        timestamp,
        duration_ms,
    });
    info!(stage = kind.name(), duration_ms, "Stage complete");

    Ok(StageEvent {
        stage: kind,
        field,
        value,
    })
}

/// Cancellable stream of [`StreamEvent`]s
pub struct ExecutionStream {
    inner: Option<Pin<Box<dyn Stream<Item = StreamEvent> + Send>>>,
}

impl ExecutionStream {
    /// Abandon the remaining stages; the stream ends immediately
    pub fn cancel(&mut self) {
        if self.inner.take().is_some() {
            info!("Stream cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_none()
    }
}

impl Stream for ExecutionStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.as_mut() {
            Some(inner) => {
                let polled = inner.as_mut().poll_next(cx);
                if let Poll::Ready(None) = polled {
                    this.inner = None;
                }
                polled
            }
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed {
        kind: StageKind,
        reads: &'static [StateField],
        writes: StateField,
        value: &'static str,
    }

    #[async_trait]
    impl Stage for Fixed {
        fn kind(&self) -> StageKind {
            self.kind
        }
        fn reads(&self) -> &'static [StateField] {
            self.reads
        }
        fn writes(&self) -> StateField {
            self.writes
        }
        async fn run(&self, _state: &PipelineState) -> Result<String> {
            Ok(self.value.to_string())
        }
    }

    fn fixed(
        kind: StageKind,
        reads: &'static [StateField],
        writes: StateField,
        value: &'static str,
    ) -> Arc<dyn Stage> {
        Arc::new(Fixed {
            kind,
            reads,
            writes,
            value,
        })
    }

    fn three_stages() -> PipelineExecutor {
        PipelineExecutor::new(vec![
            fixed(StageKind::Retrieve, &[StateField::Question], StateField::Context, "ctx"),
            fixed(StageKind::Generate, &[StateField::Context], StateField::Answer, "ans"),
            fixed(StageKind::Format, &[StateField::Answer], StateField::FormattedOutput, "out"),
        ])
    }

    #[tokio::test]
    async fn test_invoke_fills_every_field_in_order() {
        let state = three_stages().invoke("q").await.unwrap();
        assert_eq!(state.context(), Some("ctx"));
        assert_eq!(state.answer(), Some("ans"));
        assert_eq!(state.formatted_output(), Some("out"));

        let stages: Vec<&str> = state.steps().iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, vec!["retrieve", "generate", "format"]);
    }

    #[tokio::test]
    async fn test_second_writer_of_a_field_is_rejected() {
        let executor = PipelineExecutor::new(vec![
            fixed(StageKind::Retrieve, &[], StateField::Context, "a"),
            fixed(StageKind::Generate, &[], StateField::Context, "b"),
        ]);
        let err = executor.invoke("q").await.unwrap_err();
        assert!(matches!(err, AppError::FieldAlreadySet("context")));
    }

    #[tokio::test]
    async fn test_stage_with_unset_input_is_rejected() {
        let executor = PipelineExecutor::new(vec![fixed(
            StageKind::Format,
            &[StateField::Answer],
            StateField::FormattedOutput,
            "x",
        )]);
        let err = executor.invoke("q").await.unwrap_err();
        assert!(matches!(err, AppError::MissingField("answer")));
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid() {
        let err = three_stages().invoke("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_stream_yields_stage_events_then_ends() {
        let events: Vec<StreamEvent> = three_stages().stream("q").collect().await;
        let kinds: Vec<StageKind> = events
            .iter()
            .map(|e| match e {
                StreamEvent::Stage(ev) => ev.stage,
                StreamEvent::Failed { .. } => panic!("unexpected failure"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![StageKind::Retrieve, StageKind::Generate, StageKind::Format]
        );
    }

    #[tokio::test]
    async fn test_cancelled_stream_ends() {
        let mut stream = three_stages().stream("q");
        assert!(matches!(stream.next().await, Some(StreamEvent::Stage(_))));
        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_batch_runs_on_a_spawned_task() {
        let executor = three_stages().with_batch_concurrency(2);
        let questions = vec!["a".to_string(), " ".to_string(), "c".to_string()];

        let results = tokio::spawn(async move { executor.batch(&questions).await })
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().question(), "a");
        assert!(matches!(results[1], Err(AppError::InvalidInput(_))));
        assert_eq!(results[2].as_ref().unwrap().question(), "c");
    }
}
