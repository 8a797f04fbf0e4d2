//! Declarative policy schema
//!
//! Schemas are plain data and load from YAML or JSON:
//!
//! ```yaml
//! name: web-defaults
//! rules:
//!   - name: large-jpegs
//!     condition:
//!       width: { gt: 1200 }
//!       format: { in: [jpeg, png] }
//!     result:
//!       variants:
//!         - { width: 1200, format: webp, quality: 85 }
//!         - { width: 600, format: webp }
//!   - result:
//!       variants: []
//! ```

use serde::{Deserialize, Serialize};

use super::PolicyDecision;

/// Numeric predicate; every present operator must hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<u64>,
}

impl NumericCondition {
    pub fn gt(value: u64) -> Self {
        Self {
            gt: Some(value),
            ..Default::default()
        }
    }

    pub fn lt(value: u64) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    pub fn equals(value: u64) -> Self {
        Self {
            eq: Some(value),
            ..Default::default()
        }
    }

    pub fn between(lower_exclusive: u64, upper_exclusive: u64) -> Self {
        Self {
            gt: Some(lower_exclusive),
            lt: Some(upper_exclusive),
            eq: None,
        }
    }

    pub fn matches(&self, value: u64) -> bool {
        if let Some(gt) = self.gt {
            if value <= gt {
                return false;
            }
        }
        if let Some(lt) = self.lt {
            if value >= lt {
                return false;
            }
        }
        if let Some(eq) = self.eq {
            if value != eq {
                return false;
            }
        }
        true
    }
}

/// String predicate; exact equality and/or set membership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<String>>,
}

impl SetCondition {
    pub fn equals(value: impl Into<String>) -> Self {
        Self {
            eq: Some(value.into()),
            one_of: None,
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            eq: None,
            one_of: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        if let Some(eq) = &self.eq {
            if value != eq {
                return false;
            }
        }
        if let Some(set) = &self.one_of {
            if !set.iter().any(|member| member == value) {
                return false;
            }
        }
        true
    }
}

/// Per-field predicates; absent fields are unconstrained, present ones are ANDed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SetCondition>,
    /// Original byte size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<SetCondition>,
}

/// A conditional rule; a missing condition always matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub result: PolicyDecision,
}

/// Ordered rule list, evaluated top to bottom
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySchema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl PolicySchema {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
