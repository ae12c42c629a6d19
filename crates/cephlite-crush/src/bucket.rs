//! Devices, buckets and item references of the placement hierarchy.
//!
//! The hierarchy is a rooted tree: buckets are interior nodes (root, rack,
//! host, ...) and devices are the leaves. Bucket children are stored by name,
//! each name being either a device key (`osd.<id>`) or another bucket's name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a storage device (OSD).
pub type DeviceId = u32;

/// Numeric identifier of a bucket. Always negative.
pub type BucketId = i32;

/// Placement group identifier.
pub type PgId = u32;

/// Prefix of every device key.
pub const DEVICE_KEY_PREFIX: &str = "osd.";

/// Format the key of a device from its numeric identifier.
#[must_use]
pub fn device_key(id: DeviceId) -> String {
    format!("{DEVICE_KEY_PREFIX}{id}")
}

/// A leaf storage target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique device ID.
    pub id: DeviceId,
    /// Capacity weight. Carried for callers, not consumed by selection.
    pub weight: f64,
}

impl Device {
    /// Create a new device.
    #[must_use]
    pub fn new(id: DeviceId, weight: f64) -> Self {
        Self { id, weight }
    }

    /// The device key, e.g. `osd.3`.
    #[must_use]
    pub fn key(&self) -> String {
        device_key(self.id)
    }

    /// The capacity weight of this device.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// An interior node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket ID, assigned at registration (`-1`, `-2`, ...).
    pub id: BucketId,
    /// Unique bucket name.
    pub name: String,
    /// Type tag such as `host`, `rack` or `root`. Only a label.
    pub kind: String,
    /// Algorithm tag such as `straw` or `straw2`. Every bucket is treated
    /// the same by the selector regardless of this tag.
    pub algorithm: String,
    /// Ordered child item names.
    pub items: Vec<String>,
}

impl Bucket {
    /// Create a new bucket.
    #[must_use]
    pub fn new(
        id: BucketId,
        name: impl Into<String>,
        kind: impl Into<String>,
        algorithm: impl Into<String>,
        items: Vec<String>,
    ) -> Self {
        Self { id, name: name.into(), kind: kind.into(), algorithm: algorithm.into(), items }
    }

    /// Returns true if the bucket lists `item` among its direct children.
    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }
}

/// A resolved reference to an item in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemRef {
    /// A storage device (leaf node).
    Device(DeviceId),
    /// A bucket (interior node).
    Bucket(BucketId),
}

impl ItemRef {
    /// The identifier fed to the placement hash.
    ///
    /// Devices hash with their own ID, buckets with their negative ID, so the
    /// two ranges never collide.
    #[must_use]
    pub fn numeric_id(self) -> i64 {
        match self {
            Self::Device(id) => i64::from(id),
            Self::Bucket(id) => i64::from(id),
        }
    }

    /// Returns true for a leaf device.
    #[must_use]
    pub fn is_device(self) -> bool {
        matches!(self, Self::Device(_))
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "{}", device_key(*id)),
            Self::Bucket(id) => write!(f, "bucket({id})"),
        }
    }
}
