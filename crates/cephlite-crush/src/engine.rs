//! Rule execution.
//!
//! [`place_object`] interprets one rule against a topology and returns the
//! sorted device keys that hold a placement group. [`Placement`] wraps a
//! shared topology snapshot for callers that map many placement groups.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bucket::PgId;
use crate::hash::object_pg;
use crate::rule::RuleStep;
use crate::straw::choose_straw;
use crate::topology::Topology;

/// Errors that can occur during placement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// The named rule does not exist.
    #[error("rule '{0}' not found")]
    RuleNotFound(String),

    /// A `take` step names a bucket that does not exist.
    #[error("root bucket '{0}' not found for rule step")]
    RuleTargetNotFound(String),
}

impl PlacementError {
    /// Whether retrying the same call could succeed.
    ///
    /// Placement is a pure function of its inputs, so no current error is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Compute the devices for placement group `pg` under rule `rule_name`.
///
/// Returns the cumulative set of chosen device keys, sorted in ascending
/// lexicographic order with no key repeated. The list may be shorter than
/// the rule asks for when the hierarchy runs out of items or when rounds
/// pick the same devices.
///
/// # Errors
///
/// Returns [`PlacementError::RuleNotFound`] for an unknown rule and
/// [`PlacementError::RuleTargetNotFound`] when a `take` step names an unknown
/// bucket. No partial result is returned on error.
pub fn place_object(
    pg: PgId,
    topology: &Topology,
    rule_name: &str,
) -> Result<Vec<String>, PlacementError> {
    let rule =
        topology.rule(rule_name).ok_or_else(|| PlacementError::RuleNotFound(rule_name.to_string()))?;

    let mut selected: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for step in &rule.steps {
        match step {
            RuleStep::Take { item, class } => {
                let items = topology
                    .bucket_items(item)
                    .ok_or_else(|| PlacementError::RuleTargetNotFound(item.clone()))?;
                current = items.to_vec();

                if let Some(class) = class {
                    let before = current.len();
                    // Devices carry no class yet; every device matches.
                    current.retain(|name| topology.device(name).is_some());
                    if current.len() < before {
                        warn!(
                            bucket = %item,
                            %class,
                            dropped = before - current.len(),
                            "Class filter dropped non-device items"
                        );
                    }
                }
                debug!(
                    rule = rule_name,
                    pg,
                    op = step.op(),
                    bucket = %item,
                    items = current.len(),
                    "Rule step"
                );
            }

            RuleStep::ChooseLeaf { count, failure_domain } => {
                let chosen = choose_straw(topology, &current, pg, *count);
                debug!(
                    rule = rule_name,
                    pg,
                    op = step.op(),
                    requested = *count,
                    chosen = chosen.len(),
                    %failure_domain,
                    "Rule step"
                );
                selected.extend(chosen.iter().cloned());
                current = chosen;
            }

            RuleStep::Emit => {}
        }
    }

    selected.sort();
    // Later rounds can pick devices an earlier round already holds.
    selected.dedup();
    debug!(rule = rule_name, pg, devices = ?selected, "Placement computed");
    Ok(selected)
}

/// Devices computed for one placement group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgMapping {
    /// Placement group ID.
    pub pg: PgId,
    /// Sorted device keys.
    pub devices: Vec<String>,
}

/// A placement policy: a shared topology snapshot plus a default rule.
///
/// Cloning is cheap and clones share the snapshot, so one topology can serve
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Placement {
    topology: Arc<Topology>,
    rule: String,
}

impl Placement {
    /// Create a placement policy over `topology` using `rule` by default.
    #[must_use]
    pub fn new(topology: impl Into<Arc<Topology>>, rule: impl Into<String>) -> Self {
        Self { topology: topology.into(), rule: rule.into() }
    }

    /// The topology snapshot.
    #[must_use]
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// The default rule name.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Place a placement group with the default rule.
    pub fn place(&self, pg: PgId) -> Result<Vec<String>, PlacementError> {
        place_object(pg, &self.topology, &self.rule)
    }

    /// Place a placement group with a named rule.
    pub fn place_with_rule(&self, pg: PgId, rule: &str) -> Result<Vec<String>, PlacementError> {
        place_object(pg, &self.topology, rule)
    }

    /// Hash an object name to its placement group and place it.
    pub fn place_object_name(
        &self,
        pool: &str,
        object: &str,
        pg_count: u32,
    ) -> Result<PgMapping, PlacementError> {
        let pg = object_pg(pool, object, pg_count);
        Ok(PgMapping { pg, devices: self.place(pg)? })
    }

    /// Place every placement group in `pgs`.
    ///
    /// # Errors
    ///
    /// Fails on the first placement error; rule errors do not depend on the
    /// placement group, so either all succeed or the first fails.
    pub fn map_pgs(&self, pgs: Range<PgId>) -> Result<Vec<PgMapping>, PlacementError> {
        pgs.map(|pg| Ok(PgMapping { pg, devices: self.place(pg)? })).collect()
    }
}

/// Count how many placement groups each device holds across `mappings`.
#[must_use]
pub fn distribution(mappings: &[PgMapping]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for mapping in mappings {
        for device in &mapping.devices {
            *counts.entry(device.clone()).or_insert(0) += 1;
        }
    }
    counts
}
