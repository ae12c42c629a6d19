//! Command handlers.
//!
//! Each handler computes its result from a shared [`Placement`] and prints it
//! either as a human-readable table or as JSON.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use cephlite_crush::{distribution, object_pg, PgId, PgMapping, Placement, Topology};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::{MapArgs, ObjectArgs, OutputFormat, PlaceArgs};
use crate::config::Config;

/// Placement of a named object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectPlacement {
    /// Pool name.
    pub pool: String,
    /// Object name.
    pub object: String,
    /// Number of placement groups in the pool.
    pub pg_count: PgId,
    /// Placement group the object hashes to.
    pub pg: PgId,
    /// Sorted device keys.
    pub devices: Vec<String>,
}

/// Result of mapping a range of placement groups.
#[derive(Debug, Serialize, Deserialize)]
pub struct MapReport {
    /// Rule that was applied.
    pub rule: String,
    /// Number of placement groups mapped.
    pub pg_count: PgId,
    /// Placement groups that got fewer devices than the rule asks for.
    pub undersized: usize,
    /// Number of placement groups held by each device.
    pub distribution: BTreeMap<String, usize>,
    /// Per-PG mappings.
    pub mappings: Vec<PgMapping>,
}

/// Topology summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopologySummary {
    /// Root bucket name.
    pub root: Option<String>,
    /// Number of devices.
    pub device_count: usize,
    /// Buckets ordered by ID, most recent last.
    pub buckets: Vec<BucketSummary>,
    /// Rule names, sorted.
    pub rules: Vec<String>,
}

/// One bucket in a [`TopologySummary`].
#[derive(Debug, Serialize, Deserialize)]
pub struct BucketSummary {
    /// Bucket ID.
    pub id: i32,
    /// Bucket name.
    pub name: String,
    /// Type label.
    #[serde(rename = "type")]
    pub kind: String,
    /// Direct children.
    pub items: Vec<String>,
    /// Number of devices anywhere below this bucket.
    pub devices: usize,
}

/// Pick the command line rule if given, else the configured default.
fn rule_name<'a>(arg: Option<&'a str>, config: &'a Config) -> &'a str {
    arg.unwrap_or(&config.placement.rule)
}

/// Handle the place command.
pub fn handle_place(
    placement: &Placement,
    config: &Config,
    args: PlaceArgs,
    format: OutputFormat,
) -> Result<()> {
    let rule = rule_name(args.rule.as_deref(), config);
    let devices = placement
        .place_with_rule(args.pg, rule)
        .with_context(|| format!("Failed to place PG {}", args.pg))?;
    let mapping = PgMapping { pg: args.pg, devices };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        }
        OutputFormat::Text => {
            print_mapping(placement.topology(), rule, &mapping);
        }
    }

    Ok(())
}

/// Handle the object command.
pub fn handle_object(
    placement: &Placement,
    config: &Config,
    args: ObjectArgs,
    format: OutputFormat,
) -> Result<()> {
    let rule = rule_name(args.rule.as_deref(), config);
    let pg_count = args.pg_count.unwrap_or(config.placement.pg_count);
    if pg_count == 0 {
        anyhow::bail!("PG count must be greater than zero");
    }

    let pg = object_pg(&args.pool, &args.object, pg_count);
    let devices = placement
        .place_with_rule(pg, rule)
        .with_context(|| format!("Failed to place object '{}/{}'", args.pool, args.object))?;

    let result = ObjectPlacement { pool: args.pool, object: args.object, pg_count, pg, devices };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("\n  Object: {}/{}", result.pool, result.object);
            print_mapping(
                placement.topology(),
                rule,
                &PgMapping { pg: result.pg, devices: result.devices },
            );
        }
    }

    Ok(())
}

/// Handle the map command.
pub fn handle_map(
    placement: &Placement,
    config: &Config,
    args: MapArgs,
    format: OutputFormat,
) -> Result<()> {
    let rule = rule_name(args.rule.as_deref(), config).to_string();
    let pg_count = args.pgs.unwrap_or(config.placement.pg_count);

    let placement = Placement::new(placement.topology().clone(), rule.clone());
    let mappings = placement
        .map_pgs(0..pg_count)
        .with_context(|| format!("Failed to map PGs with rule '{rule}'"))?;

    let wanted = placement.topology().rule(&rule).map(|r| r.max_size()).unwrap_or_default();
    let undersized = mappings.iter().filter(|m| m.devices.len() < wanted).count();
    info!(rule = %rule, pg_count, undersized, "Mapped placement groups");

    let report =
        MapReport { rule, pg_count, undersized, distribution: distribution(&mappings), mappings };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            print_map_report(placement.topology(), &report);
        }
    }

    Ok(())
}

/// Handle the show command.
pub fn handle_show(topology: &Topology, format: OutputFormat) -> Result<()> {
    let summary = summarize(topology);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            print_topology(topology, &summary);
        }
    }

    Ok(())
}

/// Build a summary of `topology`.
pub fn summarize(topology: &Topology) -> TopologySummary {
    let mut buckets: Vec<BucketSummary> = topology
        .buckets()
        .values()
        .map(|bucket| BucketSummary {
            id: bucket.id,
            name: bucket.name.clone(),
            kind: bucket.kind.clone(),
            items: bucket.items.clone(),
            devices: topology.devices_under(&bucket.name).len(),
        })
        .collect();
    buckets.sort_by(|a, b| b.id.cmp(&a.id));

    let mut rules: Vec<String> = topology.rules().keys().cloned().collect();
    rules.sort();

    TopologySummary {
        root: topology.root().map(|b| b.name.clone()),
        device_count: topology.device_count(),
        buckets,
        rules,
    }
}

/// Print one mapping with each device's parent bucket.
fn print_mapping(topology: &Topology, rule: &str, mapping: &PgMapping) {
    println!("\n  PG {} (rule {})", mapping.pg, rule);
    println!("  ─────────────────────────────────────────────");
    if mapping.devices.is_empty() {
        println!("  No devices selected.");
    }
    for device in &mapping.devices {
        let parent = topology.find_parent(device).map_or("-", |b| b.name.as_str());
        println!("  {:<10}  {}", device, parent);
    }
    println!();
}

/// Print the per-device distribution of a map report.
fn print_map_report(topology: &Topology, report: &MapReport) {
    let total: usize = report.distribution.values().sum();

    println!("\n  PG Distribution (rule {}, {} PGs):", report.rule, report.pg_count);
    println!("  ─────────────────────────────────────────────");
    println!("  {:<10}  {:>6}  {:>7}", "DEVICE", "PGS", "SHARE");
    println!("  ─────────────────────────────────────────────");

    let mut devices: Vec<&String> = topology.devices().keys().collect();
    devices.sort();
    for device in devices {
        let count = report.distribution.get(device).copied().unwrap_or(0);
        let share = if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 };
        println!("  {:<10}  {:>6}  {:>6.1}%", device, count, share);
    }

    println!("  ─────────────────────────────────────────────");
    println!("  Replicas:     {}", total);
    println!("  Undersized:   {}", report.undersized);
    println!();
}

/// Print the topology as a tree below the root, then the rule list.
fn print_topology(topology: &Topology, summary: &TopologySummary) {
    println!("\n  Topology");
    println!("  ─────────────────────────────────────────────");
    println!("  Devices:  {}", summary.device_count);
    println!("  Buckets:  {}", summary.buckets.len());
    println!("  Rules:    {}", summary.rules.join(", "));
    println!();

    match &summary.root {
        Some(root) => print_tree(topology, root, 1),
        None => {
            for bucket in &summary.buckets {
                println!("  {:>4}  {:<12} {}", bucket.id, bucket.name, bucket.kind);
            }
        }
    }
    println!();
}

fn print_tree(topology: &Topology, name: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    match topology.bucket(name) {
        Some(bucket) => {
            println!("{indent}{} ({}, id {})", bucket.name, bucket.kind, bucket.id);
            for item in &bucket.items {
                print_tree(topology, item, depth + 1);
            }
        }
        None => {
            println!("{indent}{name} (weight {})", topology.device_weight(name));
        }
    }
}
