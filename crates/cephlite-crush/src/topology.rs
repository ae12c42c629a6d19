//! Topology store for placement.
//!
//! The topology holds every device, bucket and rule of the cluster by name.
//! It is assembled once with a [`TopologyBuilder`] and is read-only
//! afterwards; placement only ever borrows it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::bucket::{device_key, Bucket, BucketId, Device, DeviceId, ItemRef};
use crate::rule::{Rule, RuleStep};

/// Errors that can occur when building or validating a topology.
#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    /// Device key already registered.
    #[error("device '{0}' already exists")]
    DuplicateDevice(String),

    /// Bucket name already registered.
    #[error("bucket '{0}' already exists")]
    DuplicateBucket(String),

    /// Rule name already registered.
    #[error("rule '{0}' already exists")]
    DuplicateRule(String),

    /// Device weight is negative or not a number.
    #[error("device '{key}' has invalid weight {weight}")]
    InvalidWeight {
        /// Key of the offending device.
        key: String,
        /// The rejected weight.
        weight: f64,
    },

    /// Bucket not found.
    #[error("bucket '{0}' not found")]
    BucketNotFound(String),

    /// A bucket lists a child that is neither a device nor a bucket.
    #[error("bucket '{bucket}' references unknown item '{item}'")]
    UnknownItem {
        /// Bucket holding the reference.
        bucket: String,
        /// The unresolvable child name.
        item: String,
    },

    /// A bucket lists the same child more than once.
    #[error("bucket '{bucket}' lists item '{item}' more than once")]
    DuplicateItem {
        /// Bucket holding the repeated child.
        bucket: String,
        /// The repeated child name.
        item: String,
    },

    /// The bucket hierarchy contains a cycle through the named bucket.
    #[error("bucket hierarchy contains a cycle through '{0}'")]
    Cycle(String),
}

/// The complete, read-only cluster topology.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    /// Devices, indexed by device key.
    devices: HashMap<String, Device>,
    /// Buckets, indexed by name.
    buckets: HashMap<String, Bucket>,
    /// Bucket ID to name mapping.
    bucket_names: HashMap<BucketId, String>,
    /// Rules, indexed by name.
    rules: HashMap<String, Rule>,
    /// Root bucket ID.
    root_id: Option<BucketId>,
}

impl Topology {
    /// Start building a new topology.
    #[must_use]
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    /// Get a device by key.
    #[must_use]
    pub fn device(&self, key: &str) -> Option<&Device> {
        self.devices.get(key)
    }

    /// Get the weight of a device, or `0.0` if the key is unknown.
    #[must_use]
    pub fn device_weight(&self, key: &str) -> f64 {
        self.devices.get(key).map_or(0.0, Device::weight)
    }

    /// Get all devices.
    #[must_use]
    pub fn devices(&self) -> &HashMap<String, Device> {
        &self.devices
    }

    /// Get a bucket by name.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    /// Get a bucket by ID.
    #[must_use]
    pub fn bucket_by_id(&self, id: BucketId) -> Option<&Bucket> {
        self.bucket_names.get(&id).and_then(|name| self.buckets.get(name))
    }

    /// Get the ordered child items of a bucket.
    #[must_use]
    pub fn bucket_items(&self, name: &str) -> Option<&[String]> {
        self.buckets.get(name).map(|b| b.items.as_slice())
    }

    /// Get all buckets.
    #[must_use]
    pub fn buckets(&self) -> &HashMap<String, Bucket> {
        &self.buckets
    }

    /// Get a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Get all rules.
    #[must_use]
    pub fn rules(&self) -> &HashMap<String, Rule> {
        &self.rules
    }

    /// Resolve an item name to a device or bucket reference.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ItemRef> {
        if let Some(device) = self.devices.get(name) {
            return Some(ItemRef::Device(device.id));
        }
        self.buckets.get(name).map(|b| ItemRef::Bucket(b.id))
    }

    /// Get the root bucket.
    #[must_use]
    pub fn root(&self) -> Option<&Bucket> {
        self.root_id.and_then(|id| self.bucket_by_id(id))
    }

    /// Get the root bucket ID.
    #[must_use]
    pub fn root_id(&self) -> Option<BucketId> {
        self.root_id
    }

    /// Get the total number of devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Get the total number of buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Get the total number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Recursively list the device keys under a bucket, in hierarchy order.
    #[must_use]
    pub fn devices_under(&self, bucket: &str) -> Vec<String> {
        let mut devices = Vec::new();
        let mut visited = HashSet::new();
        self.collect_devices_recursive(bucket, &mut devices, &mut visited);
        devices
    }

    fn collect_devices_recursive<'a>(
        &'a self,
        bucket: &'a str,
        devices: &mut Vec<String>,
        visited: &mut HashSet<&'a str>,
    ) {
        if !visited.insert(bucket) {
            return;
        }
        if let Some(bucket) = self.buckets.get(bucket) {
            for item in &bucket.items {
                match self.resolve(item) {
                    Some(ItemRef::Device(_)) => devices.push(item.clone()),
                    Some(ItemRef::Bucket(_)) => {
                        self.collect_devices_recursive(item, devices, visited);
                    }
                    None => {}
                }
            }
        }
    }

    /// Find the bucket that lists `item` as a direct child.
    #[must_use]
    pub fn find_parent(&self, item: &str) -> Option<&Bucket> {
        self.buckets.values().find(|b| b.contains(item))
    }

    /// Check that every bucket child resolves, that no bucket lists a child
    /// twice, and that the hierarchy is acyclic.
    ///
    /// Placement itself never calls this; it assumes a well-formed tree.
    ///
    /// # Errors
    ///
    /// Returns the first dangling or repeated child, or cycle, found while
    /// scanning buckets in name order.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut names: Vec<&String> = self.buckets.keys().collect();
        names.sort();

        for name in &names {
            let bucket = &self.buckets[name.as_str()];
            let mut seen = HashSet::new();
            for item in &bucket.items {
                if self.resolve(item).is_none() {
                    return Err(TopologyError::UnknownItem {
                        bucket: bucket.name.clone(),
                        item: item.clone(),
                    });
                }
                if !seen.insert(item.as_str()) {
                    return Err(TopologyError::DuplicateItem {
                        bucket: bucket.name.clone(),
                        item: item.clone(),
                    });
                }
            }
        }

        let mut done: HashSet<&str> = HashSet::new();
        for name in names {
            let mut path = Vec::new();
            self.check_acyclic(name, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn check_acyclic<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), TopologyError> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(TopologyError::Cycle(name.to_string()));
        }
        let Some(bucket) = self.buckets.get(name) else {
            return Ok(());
        };

        path.push(name);
        for item in &bucket.items {
            if self.buckets.contains_key(item.as_str()) {
                self.check_acyclic(item, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }
}

/// Incremental builder for a [`Topology`].
///
/// The builder owns the bucket ID counter, so independent topologies can be
/// built side by side.
#[derive(Debug)]
pub struct TopologyBuilder {
    topology: Topology,
    /// Next bucket ID to assign (starts at -1, decrements).
    next_bucket_id: BucketId,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { topology: Topology::default(), next_bucket_id: -1 }
    }

    /// Register a device and return its key.
    pub fn add_device(&mut self, id: DeviceId, weight: f64) -> Result<String, TopologyError> {
        let key = device_key(id);
        if !weight.is_finite() || weight < 0.0 {
            return Err(TopologyError::InvalidWeight { key, weight });
        }
        if self.topology.devices.contains_key(&key) {
            return Err(TopologyError::DuplicateDevice(key));
        }
        self.topology.devices.insert(key.clone(), Device::new(id, weight));
        Ok(key)
    }

    /// Register a bucket and return its ID.
    ///
    /// IDs are `-(number of buckets registered so far + 1)`. Child items are
    /// stored as given; they may name devices or buckets registered later.
    pub fn add_bucket<I, S>(
        &mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        algorithm: impl Into<String>,
        items: I,
    ) -> Result<BucketId, TopologyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.topology.buckets.contains_key(&name) {
            return Err(TopologyError::DuplicateBucket(name));
        }

        let bucket_id = self.next_bucket_id;
        self.next_bucket_id -= 1;

        let items = items.into_iter().map(Into::into).collect();
        let bucket = Bucket::new(bucket_id, name.clone(), kind, algorithm, items);

        self.topology.bucket_names.insert(bucket_id, name.clone());
        self.topology.buckets.insert(name, bucket);

        Ok(bucket_id)
    }

    /// Register a rule from its name and steps.
    pub fn add_rule(
        &mut self,
        name: impl Into<String>,
        steps: Vec<RuleStep>,
    ) -> Result<(), TopologyError> {
        self.add_rule_value(Rule { name: name.into(), steps })
    }

    /// Register a prepared rule.
    pub fn add_rule_value(&mut self, rule: Rule) -> Result<(), TopologyError> {
        if self.topology.rules.contains_key(&rule.name) {
            return Err(TopologyError::DuplicateRule(rule.name));
        }
        self.topology.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Point the root at a registered bucket.
    pub fn set_root(&mut self, name: &str) -> Result<(), TopologyError> {
        let id = self
            .topology
            .buckets
            .get(name)
            .map(|b| b.id)
            .ok_or_else(|| TopologyError::BucketNotFound(name.to_string()))?;
        self.topology.root_id = Some(id);
        Ok(())
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Topology {
        self.topology
    }
}
