//! AnalysisAgent capability.
//!
//! This module provides the agent trait the pipeline calls, the Ollama-backed
//! implementation and the per-call-site response validation.

pub mod client;
pub mod response;
#[cfg(test)]
pub mod testing;

pub use client::{AgentConfig, OllamaAgent};
pub use response::invoke_typed;

use crate::error::AgentError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Named invocations of the analysis capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentTask {
    Classify,
    Summarize,
    Compare,
    Synthesize,
    DetectGaps,
    ExtractGraph,
    ScoreNovelty,
    ForecastTrends,
    Critique,
    PlanRoadmap,
    ReviewLiterature,
}

impl fmt::Display for AgentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentTask::Classify => "classify",
            AgentTask::Summarize => "summarize",
            AgentTask::Compare => "compare",
            AgentTask::Synthesize => "synthesize",
            AgentTask::DetectGaps => "detect_gaps",
            AgentTask::ExtractGraph => "extract_graph",
            AgentTask::ScoreNovelty => "score_novelty",
            AgentTask::ForecastTrends => "forecast_trends",
            AgentTask::Critique => "critique",
            AgentTask::PlanRoadmap => "plan_roadmap",
            AgentTask::ReviewLiterature => "review_literature",
        };
        f.write_str(name)
    }
}

/// One structured request to the agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub task: AgentTask,
    /// System role prompt.
    pub system: String,
    /// User prompt carrying the structured context.
    pub prompt: String,
    /// Token budget for the reply.
    pub max_tokens: usize,
}

impl AgentRequest {
    pub fn new(task: AgentTask, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task,
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 2000,
        }
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Maps structured input to structured JSON output, or fails.
///
/// Implementations own their retry policy; callers only observe the final
/// outcome of a call.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    async fn invoke(&self, request: AgentRequest) -> Result<Value, AgentError>;
}
