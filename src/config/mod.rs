// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::MemoryCacheConfig;
use crate::jit::JitConfig;
use crate::logging::LoggingConfig;
use crate::policy::PolicySchema;
use crate::source::SourceConfig;
use crate::storage::LocalStorageConfig;

/// Complete service configuration; every section is optional in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jit: JitConfig,
    #[serde(default)]
    pub cache: MemoryCacheConfig,
    /// Upload policy; the built-in default policy applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicySchema>,
    #[serde(default)]
    pub storage: LocalStorageConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.jit.validate()?;
        self.cache.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;

        if self.source.root_dir.as_os_str().is_empty() {
            return Err("source root_dir cannot be empty".to_string());
        }

        if let Some(policy) = &self.policy {
            validate_policy(policy)?;
        }

        Ok(())
    }
}

/// Every variant a rule can produce must be generatable
fn validate_policy(policy: &PolicySchema) -> Result<(), String> {
    for (index, rule) in policy.rules.iter().enumerate() {
        let label = rule
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", index + 1));
        for spec in &rule.result.variants {
            if spec.width == 0 {
                return Err(format!("Policy rule '{}' has a variant with width 0", label));
            }
            if let Some(quality) = spec.quality {
                if !(1..=100).contains(&quality) {
                    return Err(format!(
                        "Policy rule '{}' has quality {} outside 1-100",
                        label, quality
                    ));
                }
            }
        }
    }
    Ok(())
}
