//! Sequential workflows built on the completion boundary.

pub mod agent;
pub mod chain;
pub mod decision;
pub mod faq;
pub mod hybrid;

pub use agent::{AgentReply, AutonomousAgent};
pub use chain::{ChainOutput, Pipeline, Stage, StageOutput};
pub use decision::{parse_action, Action, Decision, DecisionStep, CLARIFICATION_MESSAGE};
pub use faq::{FaqBase, FaqEntry};
pub use hybrid::{HybridApp, HybridOutcome};
