//! Integration tests for rule-driven placement.

use std::collections::HashSet;

use cephlite_crush::{place_object, Placement, PlacementError, Rule, RuleStep, Topology};
use proptest::prelude::*;

/// Four devices, two hosts, two racks, one root.
fn reference_topology() -> Topology {
    let mut builder = Topology::builder();

    builder.add_device(0, 1.0).unwrap();
    builder.add_device(1, 1.0).unwrap();
    builder.add_device(2, 1.0).unwrap();
    builder.add_device(3, 1.0).unwrap();

    builder.add_bucket("host_node1", "host", "straw", ["osd.0", "osd.1"]).unwrap();
    builder.add_bucket("host_node2", "host", "straw", ["osd.2", "osd.3"]).unwrap();

    builder.add_bucket("rack_a", "rack", "straw", ["host_node1"]).unwrap();
    builder.add_bucket("rack_b", "rack", "straw", ["host_node2"]).unwrap();

    builder.add_bucket("default", "root", "straw", ["rack_a", "rack_b"]).unwrap();
    builder.set_root("default").unwrap();

    builder
        .add_rule(
            "replicated_rule",
            vec![RuleStep::take("default"), RuleStep::choose_leaf(3, "rack"), RuleStep::Emit],
        )
        .unwrap();

    builder.build()
}

/// Three racks of three hosts of four devices, with multi-group rules.
fn larger_topology() -> Topology {
    let mut builder = Topology::builder();
    let mut racks = Vec::new();

    for rack in 0..3u32 {
        let mut hosts = Vec::new();
        for host in 0..3u32 {
            let mut devices = Vec::new();
            for disk in 0..4u32 {
                let id = rack * 12 + host * 4 + disk;
                devices.push(builder.add_device(id, 1.0 + f64::from(disk)).unwrap());
            }
            let name = format!("host-{rack}-{host}");
            builder.add_bucket(name.clone(), "host", "straw2", devices).unwrap();
            hosts.push(name);
        }
        let name = format!("rack-{rack}");
        builder.add_bucket(name.clone(), "rack", "straw2", hosts).unwrap();
        racks.push(name);
    }
    builder.add_bucket("root", "root", "straw2", racks).unwrap();
    builder.set_root("root").unwrap();

    builder.add_rule_value(Rule::replicated("three_racks", "root", 3, "rack")).unwrap();
    builder
        .add_rule_value(
            Rule::new("split")
                .with_step(RuleStep::take("rack-0"))
                .with_step(RuleStep::choose_leaf(2, "host"))
                .with_step(RuleStep::Emit)
                .with_step(RuleStep::take("rack-2"))
                .with_step(RuleStep::choose_leaf(1, "host"))
                .with_step(RuleStep::Emit),
        )
        .unwrap();
    builder
        .add_rule_value(
            Rule::new("rounds")
                .with_step(RuleStep::take("root"))
                .with_step(RuleStep::choose_leaf(2, "rack"))
                .with_step(RuleStep::choose_leaf(2, "host"))
                .with_step(RuleStep::Emit)
                .with_step(RuleStep::take("root"))
                .with_step(RuleStep::choose_leaf(3, "rack"))
                .with_step(RuleStep::Emit),
        )
        .unwrap();

    builder.build()
}

#[test]
fn test_reference_scenario() {
    let topology = reference_topology();

    assert_eq!(place_object(100, &topology, "replicated_rule").unwrap(), vec!["osd.0", "osd.2"]);
    assert_eq!(place_object(101, &topology, "replicated_rule").unwrap(), vec!["osd.0", "osd.3"]);
}

#[test]
fn test_unknown_rule() {
    let topology = reference_topology();
    assert_eq!(
        place_object(100, &topology, "erasure_rule"),
        Err(PlacementError::RuleNotFound("erasure_rule".to_string()))
    );
}

#[test]
fn test_unknown_take_target() {
    let mut builder = Topology::builder();
    builder.add_device(0, 1.0).unwrap();
    builder.add_rule("broken", vec![RuleStep::take("nonexistent"), RuleStep::Emit]).unwrap();
    let topology = builder.build();

    assert_eq!(
        place_object(0, &topology, "broken"),
        Err(PlacementError::RuleTargetNotFound("nonexistent".to_string()))
    );
}

#[test]
fn test_take_failure_after_choose_discards_partial_result() {
    let mut builder = Topology::builder();
    for id in 0..2 {
        builder.add_device(id, 1.0).unwrap();
    }
    builder.add_bucket("host", "host", "straw", ["osd.0", "osd.1"]).unwrap();
    builder
        .add_rule(
            "late_failure",
            vec![
                RuleStep::take("host"),
                RuleStep::choose_leaf(1, "host"),
                RuleStep::Emit,
                RuleStep::take("gone"),
            ],
        )
        .unwrap();

    let placement = Placement::new(builder.build(), "late_failure");
    assert_eq!(placement.place(3), Err(PlacementError::RuleTargetNotFound("gone".to_string())));
}

#[test]
fn test_three_racks_spread() {
    let topology = larger_topology();

    for pg in 0..200 {
        let devices = place_object(pg, &topology, "three_racks").unwrap();
        assert_eq!(devices.len(), 3, "PG {pg} got {devices:?}");

        // One pick per rack: the root's pool only holds the three racks.
        let racks: HashSet<_> = devices
            .iter()
            .map(|key| key.trim_start_matches("osd.").parse::<u32>().unwrap() / 12)
            .collect();
        assert_eq!(racks.len(), 3, "PG {pg} got {devices:?}");
    }
}

#[test]
fn test_multiple_groups_accumulate() {
    let topology = larger_topology();

    for pg in 0..100 {
        let devices = place_object(pg, &topology, "split").unwrap();
        assert_eq!(devices.len(), 3, "PG {pg} got {devices:?}");

        let ids: Vec<u32> =
            devices.iter().map(|k| k.trim_start_matches("osd.").parse().unwrap()).collect();
        assert_eq!(ids.iter().filter(|id| **id < 12).count(), 2);
        assert_eq!(ids.iter().filter(|id| **id >= 24).count(), 1);
    }
}

#[test]
fn test_all_devices_reachable() {
    let topology = larger_topology();
    let placement = Placement::new(topology, "three_racks");

    let mappings = placement.map_pgs(0..1024).unwrap();
    let counts = cephlite_crush::distribution(&mappings);
    assert_eq!(counts.len(), 36, "unused devices: {counts:?}");
}

proptest! {
    #[test]
    fn prop_deterministic(pg in any::<u32>()) {
        let topology = larger_topology();
        let first = place_object(pg, &topology, "three_racks").unwrap();
        let second = place_object(pg, &topology, "three_racks").unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_sorted_unique_bounded(pg in any::<u32>(), count in 0usize..8) {
        let mut builder = Topology::builder();
        for id in 0..6 {
            builder.add_device(id, 1.0).unwrap();
        }
        builder.add_bucket("h1", "host", "straw", ["osd.0", "osd.1", "osd.2"]).unwrap();
        builder.add_bucket("h2", "host", "straw", ["osd.3", "osd.4"]).unwrap();
        builder.add_bucket("root", "root", "straw", ["h1", "h2", "osd.5"]).unwrap();
        builder.add_rule_value(Rule::replicated("r", "root", count, "host")).unwrap();
        let topology = builder.build();

        let devices = place_object(pg, &topology, "r").unwrap();

        prop_assert!(devices.len() <= count);
        prop_assert!(devices.len() <= 3);
        prop_assert!(devices.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(devices.iter().all(|d| topology.device(d).is_some()));
    }

    #[test]
    fn prop_multi_round_unique(pg in any::<u32>()) {
        let topology = larger_topology();
        let max = topology.rule("rounds").unwrap().max_size();

        let devices = place_object(pg, &topology, "rounds").unwrap();
        prop_assert!(!devices.is_empty());
        prop_assert!(devices.len() <= max);
        prop_assert!(devices.windows(2).all(|w| w[0] < w[1]));
    }
}
