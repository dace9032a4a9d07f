//! Policy definition and the violation decision

use serde::{Deserialize, Serialize};

use guardpost_core::{Error, LabelScore, Result};

/// Labels eligible to cause a violation when no policy file is supplied
pub const DEFAULT_TRIGGER_LABELS: [&str; 4] = ["toxicity", "insult", "threat", "identity_attack"];

/// Score a trigger label must strictly exceed to cause a violation
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// A moderation policy: which labels may trigger, and above which score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name
    pub name: String,

    /// Description of what this policy enforces
    #[serde(default)]
    pub description: String,

    /// Score a trigger label must strictly exceed
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Labels eligible to cause a violation
    #[serde(default = "default_trigger_labels")]
    pub trigger_labels: Vec<String>,
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_trigger_labels() -> Vec<String> {
    DEFAULT_TRIGGER_LABELS.iter().map(|s| s.to_string()).collect()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: "Flag toxic, insulting, threatening, or identity-attacking content"
                .to_string(),
            threshold: default_threshold(),
            trigger_labels: default_trigger_labels(),
        }
    }
}

impl Policy {
    /// Load a policy from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse policy: {}", e)))
    }

    /// Load a policy from a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Decide whether a score vector violates this policy.
    ///
    /// A violation is declared when any entry carries a trigger label with a
    /// score strictly greater than the threshold. A score exactly at the
    /// threshold does not trigger. Pure: no I/O, no state, same input gives
    /// the same output.
    pub fn decide(&self, scores: &[LabelScore]) -> bool {
        scores.iter().any(|entry| {
            entry.score > self.threshold
                && self.trigger_labels.iter().any(|label| label == &entry.label)
        })
    }
}
