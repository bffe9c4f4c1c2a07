//! Phase registry and execution log
//!
//! A pipeline is a fixed, declared configuration: ordered phases, each owning
//! an ordered list of agents, with prerequisite edges between phases. Nothing
//! here is derived at runtime; the registry is the single source of truth the
//! orchestrator iterates and the flow validator checks against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One declared phase: a name plus the agents that belong to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Phase name
    pub name: String,

    /// Agents tested under this phase, in declared order
    pub agents: Vec<String>,
}

/// Static mapping of phases, prerequisites, and named workflows
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
    phases: Vec<Phase>,
    prerequisites: HashMap<String, Vec<String>>,
    workflows: HashMap<String, Vec<String>>,
}

impl PhaseRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The 41-agent content-creation pipeline
    pub fn content_pipeline() -> Self {
        let mut registry = Self::new()
            .with_phase(
                "research",
                ["topic-scout", "source-gatherer", "competitor-analyzer", "fact-verifier", "keyword-researcher"],
                &[],
            )
            .with_phase(
                "strategy",
                ["content-planner", "angle-definer", "audience-profiler", "spec-writer", "template-selector"],
                &["research"],
            )
            .with_phase(
                "content",
                ["outline-builder", "intro-writer", "body-writer", "conclusion-writer", "quote-integrator"],
                &["research", "strategy"],
            )
            .with_phase(
                "technical",
                ["code-example-writer", "api-documenter", "command-demonstrator", "error-handler"],
                &[],
            )
            .with_phase(
                "tutorial",
                ["step-sequencer", "exercise-designer", "solution-provider", "concept-explainer"],
                &[],
            )
            .with_phase(
                "qa",
                ["grammar-checker", "style-editor", "flow-optimizer", "readability-scorer", "link-validator"],
                &["content"],
            )
            .with_phase(
                "visual",
                ["ai-prompt-engineer", "chart-designer", "infographic-planner", "thumbnail-creator", "diagram-sketcher"],
                &[],
            )
            .with_phase(
                "distribution",
                ["content-atomizer", "twitter-formatter", "linkedin-adapter", "instagram-packager", "newsletter-curator"],
                &["content", "qa"],
            )
            .with_phase(
                "performance",
                ["metrics-collector", "trend-spotter", "improvement-advisor"],
                &["distribution"],
            );

        registry = registry
            .with_workflow("quick-news", ["research", "content", "distribution"])
            .with_workflow("blog-post", ["research", "strategy", "content", "qa", "distribution"])
            .with_workflow(
                "tutorial",
                ["research", "strategy", "content", "technical", "tutorial", "qa", "visual", "distribution"],
            )
            .with_workflow("standard", ["research", "strategy", "content", "qa", "distribution"]);

        registry
    }

    /// Declare a phase with its agents and prerequisite phases
    pub fn with_phase<I>(mut self, name: impl Into<String>, agents: I, prerequisites: &[&str]) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let name = name.into();
        self.phases.push(Phase {
            name: name.clone(),
            agents: agents.into_iter().map(Into::into).collect(),
        });
        if !prerequisites.is_empty() {
            self.prerequisites
                .insert(name, prerequisites.iter().map(|p| p.to_string()).collect());
        }
        self
    }

    /// Declare a named workflow selecting an ordered phase subset
    pub fn with_workflow<I>(mut self, name: impl Into<String>, phases: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.workflows
            .insert(name.into(), phases.into_iter().map(Into::into).collect());
        self
    }

    /// Phases in declared order
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase names in declared order
    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.name.as_str()).collect()
    }

    /// Agents of a phase, or `None` for an unknown phase
    pub fn agents_for_phase(&self, phase: &str) -> Option<&[String]> {
        self.phases
            .iter()
            .find(|p| p.name == phase)
            .map(|p| p.agents.as_slice())
    }

    /// Prerequisite phases of a phase (empty when none declared)
    pub fn prerequisites_of(&self, phase: &str) -> &[String] {
        self.prerequisites.get(phase).map_or(&[], Vec::as_slice)
    }

    /// The phase an agent belongs to
    pub fn phase_for_agent(&self, agent_id: &str) -> Option<&str> {
        self.phases
            .iter()
            .find(|p| p.agents.iter().any(|a| a == agent_id))
            .map(|p| p.name.as_str())
    }

    /// Ordered phases of a named workflow
    pub fn workflow_phases(&self, workflow: &str) -> Option<&[String]> {
        self.workflows.get(workflow).map(Vec::as_slice)
    }

    /// All agents across all phases, in declared order
    pub fn all_agents(&self) -> Vec<&str> {
        self.phases
            .iter()
            .flat_map(|p| p.agents.iter().map(String::as_str))
            .collect()
    }
}

/// One append-only record of an execution step
///
/// The optional input/output carry the data-handoff evidence the flow
/// validator inspects; entries without them still participate in ordering and
/// dependency checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// When the step completed
    pub timestamp: DateTime<Utc>,

    /// Phase the agent belongs to
    pub phase: String,

    /// Agent that executed
    pub agent_id: String,

    /// Outcome label ("passed", "failed", "error", ...)
    pub status: String,

    /// Short human-readable summary
    pub summary: String,

    /// Input the step consumed, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Output the step produced, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[cfg(test)]
mod phases_tests {
    use super::*;

    #[test]
    fn test_content_pipeline_shape() {
        let registry = PhaseRegistry::content_pipeline();
        assert_eq!(registry.phases().len(), 9);
        assert_eq!(registry.all_agents().len(), 41);
        assert_eq!(
            registry.prerequisites_of("content"),
            &["research".to_string(), "strategy".to_string()]
        );
        assert!(registry.prerequisites_of("research").is_empty());
    }

    #[test]
    fn test_agent_phase_lookup() {
        let registry = PhaseRegistry::content_pipeline();
        assert_eq!(registry.phase_for_agent("keyword-researcher"), Some("research"));
        assert_eq!(registry.phase_for_agent("body-writer"), Some("content"));
        assert_eq!(registry.phase_for_agent("nonexistent"), None);
    }

    #[test]
    fn test_unknown_phase_is_none() {
        let registry = PhaseRegistry::content_pipeline();
        assert!(registry.agents_for_phase("deployment").is_none());
    }

    #[test]
    fn test_workflow_selection() {
        let registry = PhaseRegistry::content_pipeline();
        let phases = registry.workflow_phases("quick-news").unwrap();
        assert_eq!(phases, &["research", "content", "distribution"]);
        assert!(registry.workflow_phases("nope").is_none());
    }
}
