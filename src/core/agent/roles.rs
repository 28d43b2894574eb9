//! Built-in agent roles and their personas.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Planner,
    Manager,
    ScrumMaster,
    Researcher,
    Backend,
    Frontend,
}

impl AgentRole {
    /// Stable identifier used in config and persisted records.
    pub fn tag(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Manager => "manager",
            AgentRole::ScrumMaster => "scrum_master",
            AgentRole::Researcher => "researcher",
            AgentRole::Backend => "backend",
            AgentRole::Frontend => "frontend",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "planner" => Some(AgentRole::Planner),
            "manager" => Some(AgentRole::Manager),
            "scrum_master" => Some(AgentRole::ScrumMaster),
            "researcher" => Some(AgentRole::Researcher),
            "backend" => Some(AgentRole::Backend),
            "frontend" => Some(AgentRole::Frontend),
            _ => None,
        }
    }

    /// Persona name recorded on messages this role produces.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Parker",
            AgentRole::Manager => "Elara",
            AgentRole::ScrumMaster => "Kai",
            AgentRole::Researcher => "Christopher",
            AgentRole::Backend => "Backend Agent",
            AgentRole::Frontend => "Frontend Agent",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Planner => {
                "You are Parker, a software planning agent. Break the requested \
                 work into concrete tasks. When you produce a plan, reply with a \
                 JSON object of the form {\"tasks\": [{\"feature\": ..., \
                 \"description\": ..., \"dependencies\": [...], \"priority\": \
                 \"High\"|\"Medium\"|\"Low\"}]}. Use the available tools to \
                 inspect the project before planning."
            }
            AgentRole::Manager => {
                "You are Elara, an engineering manager agent. Review task lists, \
                 adjust priorities, and assign work. Keep responses short and \
                 actionable."
            }
            AgentRole::ScrumMaster => {
                "You are Kai, a scrum master agent. Track task status, surface \
                 blockers, and summarize progress."
            }
            AgentRole::Researcher => {
                "You are Christopher, a research agent. Investigate questions \
                 using the available tools and report findings with sources."
            }
            AgentRole::Backend => {
                "You are a backend engineering agent. Implement server-side \
                 tasks using the available tools, and report what you changed."
            }
            AgentRole::Frontend => {
                "You are a frontend engineering agent. Implement UI tasks using \
                 the available tools, and report what you changed."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
