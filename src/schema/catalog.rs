use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LLM_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^LLM\d{2}(:\d{4})?$").unwrap());
static AGENTIC_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ASI\d{2}$").unwrap());
static MCP_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^MCP\d{2}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Llm,
    Agentic,
    Mcp,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [CatalogKind::Llm, CatalogKind::Agentic, CatalogKind::Mcp];

    /// Guess the owning catalog from the shape of a reference id.
    pub fn classify(id: &str) -> Option<Self> {
        let id = id.trim();
        if LLM_ID_RE.is_match(id) {
            Some(CatalogKind::Llm)
        } else if AGENTIC_ID_RE.is_match(id) {
            Some(CatalogKind::Agentic)
        } else if MCP_ID_RE.is_match(id) {
            Some(CatalogKind::Mcp)
        } else {
            None
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CatalogKind::Llm => "LLM risks",
            CatalogKind::Agentic => "Agentic risks",
            CatalogKind::Mcp => "MCP protocol risks",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ThreatCatalogEntry {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// The three immutable reference tables components cite by id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatCatalogs {
    #[serde(default)]
    pub llm: Vec<ThreatCatalogEntry>,
    #[serde(default)]
    pub agentic: Vec<ThreatCatalogEntry>,
    #[serde(default)]
    pub mcp: Vec<ThreatCatalogEntry>,
}

impl ThreatCatalogs {
    pub fn catalog(&self, kind: CatalogKind) -> &[ThreatCatalogEntry] {
        match kind {
            CatalogKind::Llm => &self.llm,
            CatalogKind::Agentic => &self.agentic,
            CatalogKind::Mcp => &self.mcp,
        }
    }

    /// Looks an id up in the catalog its shape suggests first, then in all.
    pub fn lookup(&self, id: &str) -> Option<(CatalogKind, &ThreatCatalogEntry)> {
        if let Some(kind) = CatalogKind::classify(id)
            && let Some(entry) = self.catalog(kind).iter().find(|e| e.id == id)
        {
            return Some((kind, entry));
        }
        CatalogKind::ALL.into_iter().find_map(|kind| {
            self.catalog(kind)
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| (kind, entry))
        })
    }

    pub fn builtin() -> Self {
        Self {
            llm: vec![
                ThreatCatalogEntry::new(
                    "LLM01:2025",
                    "Prompt Injection",
                    "Crafted input alters model behaviour or bypasses instructions.",
                ),
                ThreatCatalogEntry::new(
                    "LLM02:2025",
                    "Sensitive Information Disclosure",
                    "Model output exposes secrets, PII or proprietary data.",
                ),
                ThreatCatalogEntry::new(
                    "LLM03:2025",
                    "Supply Chain",
                    "Compromised models, datasets or plugins enter the pipeline.",
                ),
                ThreatCatalogEntry::new(
                    "LLM04:2025",
                    "Data and Model Poisoning",
                    "Tampered training or fine-tuning data skews behaviour.",
                ),
                ThreatCatalogEntry::new(
                    "LLM05:2025",
                    "Improper Output Handling",
                    "Downstream systems trust model output without validation.",
                ),
                ThreatCatalogEntry::new(
                    "LLM06:2025",
                    "Excessive Agency",
                    "The model can act with more capability than the task needs.",
                ),
                ThreatCatalogEntry::new(
                    "LLM07:2025",
                    "System Prompt Leakage",
                    "Hidden instructions or credentials in prompts are revealed.",
                ),
                ThreatCatalogEntry::new(
                    "LLM08:2025",
                    "Vector and Embedding Weaknesses",
                    "Retrieval stores are poisoned or leak across tenants.",
                ),
                ThreatCatalogEntry::new(
                    "LLM09:2025",
                    "Misinformation",
                    "Confident but false output is acted upon.",
                ),
                ThreatCatalogEntry::new(
                    "LLM10:2025",
                    "Unbounded Consumption",
                    "Uncontrolled inference cost or resource exhaustion.",
                ),
            ],
            agentic: vec![
                ThreatCatalogEntry::new(
                    "ASI01",
                    "Agent Goal Hijack",
                    "An attacker redirects the agent's objective.",
                ),
                ThreatCatalogEntry::new(
                    "ASI02",
                    "Tool Misuse and Exploitation",
                    "Legitimate tools are driven to harmful effect.",
                ),
                ThreatCatalogEntry::new(
                    "ASI03",
                    "Identity and Privilege Abuse",
                    "Delegated credentials are reused beyond their intent.",
                ),
                ThreatCatalogEntry::new(
                    "ASI04",
                    "Agentic Supply Chain",
                    "Third-party agents, tools or prompts are compromised.",
                ),
                ThreatCatalogEntry::new(
                    "ASI05",
                    "Unexpected Code Execution",
                    "Generated code runs without sandboxing.",
                ),
                ThreatCatalogEntry::new(
                    "ASI06",
                    "Memory and Context Poisoning",
                    "Persistent memory is seeded with malicious content.",
                ),
                ThreatCatalogEntry::new(
                    "ASI07",
                    "Insecure Inter-Agent Communication",
                    "Messages between agents are spoofed or tampered.",
                ),
                ThreatCatalogEntry::new(
                    "ASI08",
                    "Cascading Failures",
                    "One faulty agent propagates errors across the system.",
                ),
                ThreatCatalogEntry::new(
                    "ASI09",
                    "Human-Agent Trust Exploitation",
                    "Users over-trust agent recommendations.",
                ),
                ThreatCatalogEntry::new(
                    "ASI10",
                    "Rogue Agents",
                    "An agent drifts from or acts against its mandate.",
                ),
            ],
            mcp: vec![
                ThreatCatalogEntry::new(
                    "MCP01",
                    "Token Mismanagement and Secret Exposure",
                    "Long-lived tokens or secrets leak through context or logs.",
                ),
                ThreatCatalogEntry::new(
                    "MCP02",
                    "Privilege Escalation via Scope Creep",
                    "Server scopes grow past what clients approved.",
                ),
                ThreatCatalogEntry::new(
                    "MCP03",
                    "Tool Poisoning",
                    "Tool descriptions carry hidden instructions.",
                ),
                ThreatCatalogEntry::new(
                    "MCP04",
                    "Software Supply Chain Attacks",
                    "Malicious or typo-squatted MCP server packages.",
                ),
                ThreatCatalogEntry::new(
                    "MCP05",
                    "Command Injection and Execution",
                    "Tool arguments reach a shell or interpreter unsanitised.",
                ),
                ThreatCatalogEntry::new(
                    "MCP06",
                    "Prompt Injection via Contextual Payloads",
                    "Retrieved resources smuggle instructions to the model.",
                ),
                ThreatCatalogEntry::new(
                    "MCP07",
                    "Insufficient Authentication and Authorization",
                    "Servers accept unauthenticated or over-broad requests.",
                ),
                ThreatCatalogEntry::new(
                    "MCP08",
                    "Lack of Audit and Telemetry",
                    "Tool invocations cannot be traced after the fact.",
                ),
                ThreatCatalogEntry::new(
                    "MCP09",
                    "Shadow MCP Servers",
                    "Unvetted servers are connected outside governance.",
                ),
                ThreatCatalogEntry::new(
                    "MCP10",
                    "Context Injection and Over-Sharing",
                    "More context than necessary is shared with a server.",
                ),
            ],
        }
    }
}
