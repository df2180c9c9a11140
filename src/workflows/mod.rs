//! Question-answering pipeline
//!
//! A fixed sequence of stages threads one [`PipelineState`] per question:
//!
//! ```text
//! Retrieve ──► Generate ──► Format ──► Done
//!  context      answer      formatted_output
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let executor = PipelineExecutor::from_config(&config, index_handle, gateway);
//!
//! let state = executor.invoke("What is LangSmith?").await?;
//! println!("{}", state.formatted_output().unwrap_or_default());
//!
//! let mut events = executor.stream("How do I trace a run?");
//! while let Some(event) = events.next().await {
//!     // one StreamEvent::Stage per completed stage
//! }
//! ```

pub mod engine;
pub mod stages;
pub mod state;

pub use engine::{ExecutionStream, PipelineExecutor, StageEvent, StreamEvent};
pub use stages::{
    build_prompt, format_output, FormatStage, GenerateStage, RetrieveStage, Stage, StageKind,
    CONTEXT_SEPARATOR,
};
pub use state::{PipelineState, StageRecord, StateField};
