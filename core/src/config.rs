use crate::types::Period;
use serde::{Deserialize, Deserializer, Serialize};

/// Batch scoring parameters, provided by the external configuration
/// file. The target period selects which month gets labeled; the
/// top-risk fraction selects how much of the scored population enters
/// the cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(deserialize_with = "period_from_int_or_str")]
    pub target_period: Period,
    #[serde(default = "default_top_risk_fraction")]
    pub top_risk_fraction: f64,
}

fn default_top_risk_fraction() -> f64 {
    0.4
}

// Upstream configuration stores the period as an integer or a string,
// depending on which system wrote it. Accept both.
fn period_from_int_or_str<'de, D>(deserializer: D) -> Result<Period, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u32),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(p) => Ok(p),
        Raw::Str(s) => s.parse::<u32>().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringFile {
    scoring: ScoringConfig,
}

impl ScoringConfig {
    /// Load from the data/ directory.
    /// In tests, use ScoringConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/scoring/scoring.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: ScoringFile = serde_json::from_str(&content)?;
        Ok(file.scoring)
    }

    pub fn default_test() -> Self {
        Self {
            target_period: 202406,
            top_risk_fraction: 0.4,
        }
    }
}
