//! Placement rules.
//!
//! A rule is an ordered list of steps:
//! 1. `take` seeds the working set from a named bucket
//! 2. `chooseleaf` picks leaf devices out of the working set
//! 3. `emit` marks the end of a selection group

use serde::{Deserialize, Serialize};

/// A step in a placement rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RuleStep {
    /// Seed the working set with the direct children of a bucket.
    Take {
        /// Name of the bucket to start from.
        item: String,
        /// Optional device class filter (e.g. `hdd`).
        ///
        /// Devices carry no class metadata yet, so every device matches any
        /// class, while sub-buckets are dropped from the working set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },

    /// Choose `count` leaf devices from the working set, descending through
    /// buckets until leaves are reached.
    #[serde(rename = "chooseleaf")]
    ChooseLeaf {
        /// Number of devices to choose.
        #[serde(rename = "num")]
        count: usize,
        /// Failure domain type the replicas should spread over (e.g. `rack`).
        /// Recorded but not enforced by the selector.
        #[serde(rename = "type")]
        failure_domain: String,
    },

    /// Mark the current selection as output.
    Emit,
}

impl RuleStep {
    /// Shorthand for a `take` step without class filter.
    #[must_use]
    pub fn take(item: impl Into<String>) -> Self {
        Self::Take { item: item.into(), class: None }
    }

    /// Shorthand for a `take` step filtered to a device class.
    #[must_use]
    pub fn take_class(item: impl Into<String>, class: impl Into<String>) -> Self {
        Self::Take { item: item.into(), class: Some(class.into()) }
    }

    /// Shorthand for a `chooseleaf` step.
    #[must_use]
    pub fn choose_leaf(count: usize, failure_domain: impl Into<String>) -> Self {
        Self::ChooseLeaf { count, failure_domain: failure_domain.into() }
    }

    /// Short operation name, as used in rule files and logs.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Take { .. } => "take",
            Self::ChooseLeaf { .. } => "chooseleaf",
            Self::Emit => "emit",
        }
    }
}

/// A named placement rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name.
    pub name: String,
    /// The steps in this rule.
    pub steps: Vec<RuleStep>,
}

impl Rule {
    /// Create a new empty rule.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), steps: Vec::new() }
    }

    /// Add a step to this rule.
    #[must_use]
    pub fn with_step(mut self, step: RuleStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Create a replicated rule: take `root`, choose `count` leaves spread
    /// over `failure_domain`, emit.
    #[must_use]
    pub fn replicated(
        name: impl Into<String>,
        root: impl Into<String>,
        count: usize,
        failure_domain: impl Into<String>,
    ) -> Self {
        Self::new(name)
            .with_step(RuleStep::take(root))
            .with_step(RuleStep::choose_leaf(count, failure_domain))
            .with_step(RuleStep::Emit)
    }

    /// Upper bound on the number of devices this rule can return: the sum of
    /// all `chooseleaf` counts.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.steps
            .iter()
            .map(|step| match step {
                RuleStep::ChooseLeaf { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }
}
