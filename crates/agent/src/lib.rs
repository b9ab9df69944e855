//! Agent runtime - intent classification, routing, and workflow orchestration
//!
//! This crate is the "brain" of the concierge backend:
//! - Classifies each user message into an intent (`classifier`)
//! - Routes intents to specialist handlers (`handlers`)
//! - Drives the multi-phase offer creation workflow (`offer_workflow`)
//! - Pauses for human approval before any UI-affecting action (`supervisor`)
//!
//! # Safety Principle
//!
//! The LLM is strictly a drafting aid. It never decides routing outcomes,
//! workflow transitions, or whether an action executes. Those are
//! deterministic decisions made in `concierge-core`, and every LLM call has
//! a deterministic fallback so a model outage degrades replies, not control
//! flow.

pub mod classifier;
pub mod handlers;
pub mod llm;
pub mod offer_workflow;
pub mod progress;
pub mod supervisor;

pub use llm::{FailingLlmClient, HttpLlmClient, LlmClient, LlmError, ScriptedLlmClient};
pub use progress::{ChannelProgressSink, NoopProgressSink, ProgressSink, ProgressUpdate};
pub use supervisor::{Supervisor, TurnReply};
