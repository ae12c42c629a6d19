//! Deterministic CRUSH-style data placement.
//!
//! Given a cluster topology, a placement rule and a placement group ID, this
//! crate computes the storage devices that hold the placement group's
//! replicas. Every client holding the same topology computes the same answer,
//! so no central directory is needed.
//!
//! # Architecture
//!
//! ```text
//!   place_object(pg, topology, rule)        rule engine   (engine.rs)
//!        │  take / chooseleaf / emit
//!        ▼
//!   choose_straw(candidates, pg, count)     straw select  (straw.rs)
//!        │  minimum hash per attempt
//!        ▼
//!   crush_hash(pg, item, attempt)           SHA-1 hash    (hash.rs)
//!
//!   Topology (devices, buckets, rules)      read-only     (topology.rs)
//! ```
//!
//! # Usage
//!
//! ```
//! use cephlite_crush::{place_object, Rule, Topology};
//!
//! let mut builder = Topology::builder();
//! for id in 0..4 {
//!     builder.add_device(id, 1.0).unwrap();
//! }
//! builder.add_bucket("host_node1", "host", "straw", ["osd.0", "osd.1"]).unwrap();
//! builder.add_bucket("host_node2", "host", "straw", ["osd.2", "osd.3"]).unwrap();
//! builder.add_bucket("rack_a", "rack", "straw", ["host_node1"]).unwrap();
//! builder.add_bucket("rack_b", "rack", "straw", ["host_node2"]).unwrap();
//! builder.add_bucket("default", "root", "straw", ["rack_a", "rack_b"]).unwrap();
//! builder.set_root("default").unwrap();
//! builder.add_rule_value(Rule::replicated("replicated_rule", "default", 3, "rack")).unwrap();
//! let topology = builder.build();
//!
//! let devices = place_object(100, &topology, "replicated_rule").unwrap();
//! assert_eq!(devices, vec!["osd.0", "osd.2"]);
//! ```

#![warn(missing_docs)]

pub mod bucket;
pub mod engine;
pub mod hash;
pub mod rule;
pub mod straw;
pub mod topology;

pub use bucket::{device_key, Bucket, BucketId, Device, DeviceId, ItemRef, PgId};
pub use engine::{distribution, place_object, PgMapping, Placement, PlacementError};
pub use hash::{crush_hash, object_pg};
pub use rule::{Rule, RuleStep};
pub use straw::choose_straw;
pub use topology::{Topology, TopologyBuilder, TopologyError};
