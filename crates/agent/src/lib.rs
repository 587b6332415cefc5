//! Decision layer of the budtender assistant.
//!
//! Turns a customer message plus conversation history into a reply and a
//! classified intent:
//! 1. **Keywords** (`keywords`) - per-language trigger tables
//! 2. **Extraction** (`extractor`) - products, quantity and contact details
//! 3. **Classification** (`classifier`) - order, wish, staff question, feedback
//! 4. **Runtime** (`runtime`) - catalog, cache, model, relay and persistence
//!
//! The model only writes prose. Intent, prices and notifications are decided
//! by the deterministic rules in this crate and `budtender-core`.

pub mod classifier;
pub mod extractor;
pub mod keywords;
pub mod llm;
pub mod runtime;

pub use classifier::{IntentClassifier, OrderSignals};
pub use extractor::OrderExtractor;
pub use llm::{system_prompt, CompletionRequest, LlmClient};
pub use runtime::{AgentReply, AgentRuntime, InboundMessage, RuntimeDeps, RuntimeSettings};
