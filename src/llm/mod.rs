//! Gateway clients for embeddings and chat completions
//!
//! All model traffic is routed through a single configurable base URL with a
//! custom API-key header. The rest of the application only sees the
//! [`GatewayClient`] trait, so stages and ingestion can be tested against an
//! in-process double.
//!
//! # Example
//!
//! ```ignore
//! use docqa::llm::{GatewayClient, HttpGatewayClient, ModelSettings, Prompt};
//!
//! let gateway = HttpGatewayClient::from_config(&config)?;
//! let vectors = gateway.embed(&["What is tracing?".to_string()]).await?;
//! let answer = gateway
//!     .complete(&Prompt { system: "Be brief.".into(), user: "Hi".into() }, &settings)
//!     .await?;
//! ```

/// Core gateway trait and prompt types.
pub mod client;
/// reqwest-based gateway implementation.
pub mod gateway;

pub use client::{GatewayClient, ModelSettings, Prompt};
pub use gateway::HttpGatewayClient;
