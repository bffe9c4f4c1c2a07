//! Agent specifications
//!
//! Each agent under test carries a small declarative spec: what it does,
//! which model tier serves it, which tools it may touch, and the prompt text
//! a real backend would receive. Specs come from a [`SpecProvider`]; the
//! bundled [`StaticSpecProvider`] always answers, synthesizing a generic
//! spec for agents it has no hand-written entry for.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Model tier an agent is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fast tier for mechanical transforms and checks
    Haiku,
    /// Default tier for most generation work
    Sonnet,
    /// Heavy tier for planning and synthesis
    Opus,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Haiku => "haiku",
            Self::Sonnet => "sonnet",
            Self::Opus => "opus",
        };
        f.write_str(name)
    }
}

static TIER_MAP: Lazy<HashMap<&'static str, ModelTier>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for agent in [
        "keyword-researcher",
        "grammar-checker",
        "readability-scorer",
        "link-validator",
        "command-demonstrator",
        "solution-provider",
        "twitter-formatter",
        "linkedin-adapter",
        "instagram-packager",
        "metrics-collector",
    ] {
        map.insert(agent, ModelTier::Haiku);
    }
    for agent in [
        "content-planner",
        "spec-writer",
        "concept-explainer",
        "improvement-advisor",
    ] {
        map.insert(agent, ModelTier::Opus);
    }
    map
});

impl ModelTier {
    /// The tier serving an agent; agents without an explicit entry default
    /// to the sonnet tier
    pub fn for_agent(agent_id: &str) -> Self {
        TIER_MAP.get(agent_id).copied().unwrap_or(Self::Sonnet)
    }
}

/// Tools an agent spec may declare
pub const KNOWN_TOOLS: [&str; 9] = [
    "Read", "Write", "Edit", "MultiEdit", "WebSearch", "WebFetch", "Bash", "Grep", "Glob",
];

/// Declarative description of one agent under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Agent id, e.g. `keyword-researcher`
    pub agent_id: String,

    /// One-line description of the agent's job
    pub description: String,

    /// Model tier serving this agent
    pub model: ModelTier,

    /// Tools the agent may use
    pub tools: Vec<String>,

    /// Prompt text sent to a real backend
    pub prompt: String,
}

impl AgentSpec {
    /// Structural validation: required fields present, tools known
    pub fn validate(&self) -> (bool, Vec<String>) {
        let mut issues = Vec::new();
        if self.agent_id.is_empty() {
            issues.push("Missing agent id".to_string());
        }
        if self.description.is_empty() {
            issues.push("Missing description".to_string());
        }
        if self.prompt.is_empty() {
            issues.push("Missing prompt".to_string());
        }
        for tool in &self.tools {
            if !KNOWN_TOOLS.contains(&tool.as_str()) {
                issues.push(format!("Unknown tool: {}", tool));
            }
        }
        (issues.is_empty(), issues)
    }

    /// Compose the full request text for a dispatch: spec prompt plus the
    /// JSON input the agent should process
    pub fn build_prompt(&self, input: &Value) -> String {
        format!(
            "# Agent: {}\n\n{}\n\n## Input\n```json\n{}\n```",
            self.agent_id,
            self.prompt,
            serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string()),
        )
    }
}

/// Source of agent specs
///
/// Providers always answer; an agent without a hand-written spec gets a
/// synthesized generic one rather than an error.
pub trait SpecProvider: Send + Sync {
    /// The spec for one agent
    fn spec_for(&self, agent_id: &str) -> AgentSpec;

    /// Agents with hand-written (non-synthesized) specs
    fn known_agents(&self) -> Vec<String>;
}

/// In-memory spec provider with a few curated entries
#[derive(Debug, Clone, Default)]
pub struct StaticSpecProvider {
    specs: HashMap<String, AgentSpec>,
}

impl StaticSpecProvider {
    /// Provider with the curated default specs
    pub fn new() -> Self {
        let mut provider = Self::default();
        provider.insert(AgentSpec {
            agent_id: "keyword-researcher".to_string(),
            description: "Research and identify relevant keywords for content optimization"
                .to_string(),
            model: ModelTier::for_agent("keyword-researcher"),
            tools: vec!["WebSearch".to_string()],
            prompt: "Analyze the topic and audience, pick a primary keyword, find 3-5 \
                     long-tail variations, and rate search volume and difficulty."
                .to_string(),
        });
        provider.insert(AgentSpec {
            agent_id: "body-writer".to_string(),
            description: "Write main body content for articles and posts".to_string(),
            model: ModelTier::for_agent("body-writer"),
            tools: vec!["Write".to_string()],
            prompt: "Follow the outline, write each section in a consistent tone, and \
                     return the complete body text with the section names covered."
                .to_string(),
        });
        provider.insert(AgentSpec {
            agent_id: "grammar-checker".to_string(),
            description: "Check and correct grammar, spelling, and punctuation errors"
                .to_string(),
            model: ModelTier::for_agent("grammar-checker"),
            tools: vec!["Read".to_string()],
            prompt: "Scan the content for grammar, spelling, and punctuation errors, \
                     correct them, and list what was fixed."
                .to_string(),
        });
        provider
    }

    /// Add or replace a spec
    pub fn insert(&mut self, spec: AgentSpec) {
        self.specs.insert(spec.agent_id.clone(), spec);
    }

    fn synthesize(agent_id: &str) -> AgentSpec {
        AgentSpec {
            agent_id: agent_id.to_string(),
            description: "Specialized agent for the content pipeline".to_string(),
            model: ModelTier::for_agent(agent_id),
            tools: Vec::new(),
            prompt: format!(
                "You are the {} agent in the content creation pipeline. Process the \
                 input according to your role and return structured JSON output.",
                agent_id
            ),
        }
    }
}

impl SpecProvider for StaticSpecProvider {
    fn spec_for(&self, agent_id: &str) -> AgentSpec {
        self.specs
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| Self::synthesize(agent_id))
    }

    fn known_agents(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.specs.keys().cloned().collect();
        agents.sort_unstable();
        agents
    }
}
