//! End-to-end routing tests for meshroute-simulation
//!
//! These drive whole meshes tick by tick and check rerouting, failure
//! memory, acknowledgements and the per-tick delivery guard.

use std::collections::BTreeSet;
use std::sync::Arc;

use meshroute_core::{
    EventLog, Link, MeshDescription, MeshError, MeshEvent, NodeId, NullSink, PacketKind, Path,
};
use meshroute_simulation::{FailureKind, Mesh, MeshConfig, MeshPreset, SimulationPlan, simulate};

// Test helpers
fn id(name: &str) -> NodeId {
    NodeId::from(name)
}

fn link(a: &str, b: &str) -> Link {
    Link::new(id(a), id(b))
}

fn path(names: &[&str]) -> Path {
    Path::new(names.iter().map(|n| id(n)).collect())
}

fn build(edges: &[(&str, &str)], log: Arc<EventLog>) -> Mesh {
    let description = MeshDescription::from_edges(edges);
    let mut mesh = Mesh::from_description(&description, MeshConfig::quiet(), log).unwrap();
    mesh.generate_topology();
    mesh
}

/// A-B-C and A-D-C, B listed first so B is the preferred relay
const DIAMOND: &[(&str, &str)] = &[("A", "B"), ("A", "D"), ("B", "C"), ("D", "C")];

fn buffers_empty(mesh: &Mesh) -> bool {
    mesh.nodes().all(|n| n.buffer_len() == 0)
}

#[test]
fn test_topology_complete_on_full_mesh() {
    let edges = [
        ("0", "1"),
        ("0", "2"),
        ("0", "3"),
        ("1", "2"),
        ("1", "3"),
        ("2", "3"),
    ];
    let mesh = build(&edges, Arc::new(EventLog::new()));

    for node in mesh.nodes() {
        let topology = node.topology();
        assert_eq!(topology.len(), 15, "node {}", node.id());
        for entry in topology.paths() {
            assert!(entry.is_simple());
            assert_eq!(entry.origin(), Some(node.id()));
        }
        // Every other node is reached
        assert_eq!(topology.reachable().count(), 3);
    }
    assert_eq!(mesh.average_topology_size(), 15.0);
}

#[test]
fn test_routes_are_adjacent_and_avoid_failures() {
    let mesh = MeshPreset::Throughput
        .build(MeshConfig::quiet(), Arc::new(NullSink))
        .unwrap();
    let failed = BTreeSet::from([link("0", "2"), link("6", "9")]);

    let origin = mesh.node(&id("0")).unwrap();
    let route = origin.find_route(&id("11"), &failed).unwrap();

    assert_eq!(route.origin(), Some(&id("0")));
    assert_eq!(route.destination(), Some(&id("11")));
    for pair in route.nodes().windows(2) {
        assert!(mesh.adjacency().are_adjacent(&pair[0], &pair[1]));
        assert!(!failed.contains(&Link::between(&pair[0], &pair[1])));
    }
}

#[test]
fn test_shortest_route_wins() {
    // Direct A-E beside A-B-C-E
    let mesh = build(
        &[("A", "B"), ("B", "C"), ("C", "E"), ("A", "E")],
        Arc::new(EventLog::new()),
    );
    let a = mesh.node(&id("A")).unwrap();
    let route = a.find_route(&id("E"), &BTreeSet::new()).unwrap();
    assert_eq!(route, path(&["A", "E"]));
}

#[test]
fn test_reroutes_around_dead_link() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    mesh.toggle_link(&id("B"), &id("C")).unwrap();

    let flow = mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("C"), None)
        .unwrap();

    // B holds the packet while it retries with a new route
    while log.count("LINK_FAILED") == 0 {
        assert!(mesh.tick() < 10, "B never tried B-C");
        mesh.run();
    }
    let memory = mesh
        .node(&id("B"))
        .unwrap()
        .failed_links_for(&flow)
        .unwrap();
    assert!(memory.contains(&link("B", "C")));

    let mut delivered_at = None;
    for _ in 0..10 {
        mesh.run();
        if log.count("PACKET_DELIVERED") > 0 {
            delivered_at = Some(mesh.tick());
            break;
        }
    }
    assert!(delivered_at.is_some(), "packet never reached C");

    assert_eq!(log.count("LINK_FAILED"), 1);
    assert_eq!(log.count("ROUTE_FOUND"), 1);
    let stats = mesh.stats();
    assert_eq!(stats.hops, vec![2]);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.unreached, 0);
}

#[test]
fn test_ack_retraces_forward_path() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    mesh.toggle_link(&id("B"), &id("C")).unwrap();

    let flow = mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("C"), None)
        .unwrap();
    for _ in 0..15 {
        mesh.run();
    }

    let events = log.events();
    let acks: Vec<&MeshEvent> = events
        .iter()
        .filter(|e| matches!(e, MeshEvent::PacketCreated { kind: PacketKind::Ack, .. }))
        .collect();
    assert_eq!(acks.len(), 1);
    let MeshEvent::PacketCreated { packet_id: ack_id, route, .. } = acks[0] else {
        unreachable!();
    };
    assert_eq!(route, &path(&["C", "D", "A"]));

    let hops: Vec<(NodeId, NodeId)> = events
        .iter()
        .filter_map(|e| match e {
            MeshEvent::PacketTransmitted { packet_id, from, to, .. } if packet_id == ack_id => {
                Some((from.clone(), to.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(hops, vec![(id("C"), id("D")), (id("D"), id("A"))]);

    assert_eq!(log.count("ACK_RECEIVED"), 1);
    assert_eq!(mesh.stats().round_trips, 1);
    assert!(buffers_empty(&mesh));

    // Round trip complete: the source forgot the flow
    assert!(mesh.node(&id("A")).unwrap().failed_links_for(&flow).is_none());
}

#[test]
fn test_no_failure_memory_outlives_the_flow() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    mesh.toggle_link(&id("B"), &id("C")).unwrap();

    let flow = mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("C"), None)
        .unwrap();
    for _ in 0..30 {
        mesh.run();
    }

    assert!(mesh.is_idle());
    assert_eq!(mesh.stats().round_trips, 1);
    // B is off the ACK's path and must still have let go of the flow
    for node in mesh.nodes() {
        assert_eq!(node.failed_links_for(&flow), None, "node {}", node.id());
        assert_eq!(node.remembered_flows(), 0, "node {}", node.id());
    }
}

#[test]
fn test_failure_memory_drains_after_simulation() {
    let config = MeshConfig {
        seed: Some(11),
        ..MeshConfig::quiet()
    };
    let mut mesh = MeshPreset::Throughput
        .build(config, Arc::new(NullSink))
        .unwrap();
    let plan = SimulationPlan::for_preset(MeshPreset::Throughput, 10).with_failures(0, 30);
    let report = simulate(&mut mesh, &plan);

    if !report.timed_out {
        for node in mesh.nodes() {
            assert_eq!(node.remembered_flows(), 0, "node {}", node.id());
        }
    }
}

#[test]
fn test_hand_made_ack_counts_a_round_trip() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(&[("A", "B"), ("B", "C")], log.clone());

    mesh.generate_packet(&id("A"), PacketKind::Ack, &id("C"), None).unwrap();
    for _ in 0..5 {
        mesh.run();
    }

    assert_eq!(log.count("ACK_RECEIVED"), 1);
    assert_eq!(log.count("PACKET_DELIVERED"), 0);
    assert_eq!(mesh.stats().round_trips, 1);
    // An ACK is never answered
    assert_eq!(mesh.stats().packets_created, 1);
    assert!(buffers_empty(&mesh));
}

#[test]
fn test_isolated_destination_is_refused() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    mesh.toggle_link(&id("B"), &id("C")).unwrap();
    mesh.toggle_link(&id("D"), &id("C")).unwrap();

    let err = mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("C"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        MeshError::UnreachableDestination { ref from, ref to } if from == &id("A") && to == &id("C")
    ));
    assert!(buffers_empty(&mesh));
    assert_eq!(log.count("PACKET_CREATED"), 0);

    // A dead destination is just as unreachable
    mesh.restore();
    mesh.toggle_node(&id("C")).unwrap();
    assert!(mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("C"), None)
        .is_err());
    assert!(buffers_empty(&mesh));
}

#[test]
fn test_statically_isolated_node() {
    let mut description = MeshDescription::from_edges(&[("A", "B")]);
    description.add_node(id("E"));
    let mut mesh =
        Mesh::from_description(&description, MeshConfig::quiet(), Arc::new(NullSink)).unwrap();
    mesh.generate_topology();

    let err = mesh
        .generate_packet(&id("A"), PacketKind::Data, &id("E"), None)
        .unwrap_err();
    assert!(matches!(err, MeshError::UnreachableDestination { .. }));
    assert!(buffers_empty(&mesh));
}

#[test]
fn test_one_hop_per_tick() {
    let mut mesh = build(&[("A", "B"), ("B", "C"), ("C", "D")], Arc::new(EventLog::new()));
    mesh.generate_packet(&id("A"), PacketKind::Data, &id("D"), None)
        .unwrap();

    // B and C step after A in the same tick, yet the packet only moves once
    for (tick, holder) in [(1, "B"), (2, "C"), (3, "D")] {
        mesh.run();
        assert_eq!(mesh.tick(), tick);
        for node in mesh.nodes() {
            let expected = usize::from(node.id() == &id(holder));
            assert_eq!(node.buffer_len(), expected, "tick {} node {}", tick, node.id());
        }
    }
}

#[test]
fn test_one_hop_per_tick_in_reverse_order() {
    // Receivers step before senders here
    let mut mesh = build(&[("D", "C"), ("C", "B"), ("B", "A")], Arc::new(EventLog::new()));
    mesh.generate_packet(&id("D"), PacketKind::Data, &id("A"), None)
        .unwrap();

    for holder in ["C", "B", "A"] {
        mesh.run();
        assert_eq!(mesh.node(&id(holder)).unwrap().buffer_len(), 1);
    }
}

#[test]
fn test_json_ingestion_errors() {
    let config = MeshConfig::quiet;
    let sink = || Arc::new(NullSink);

    let err = Mesh::from_json("{\"A\": [\"B\"", config(), sink()).unwrap_err();
    assert!(matches!(err, MeshError::Json(_)));

    let err = Mesh::from_json(r#"{"A": ["Z"]}"#, config(), sink()).unwrap_err();
    assert!(matches!(err, MeshError::UnknownNode(ref n) if n == &id("Z")));

    let err = Mesh::from_json(r#"{"A": ["A"]}"#, config(), sink()).unwrap_err();
    assert!(matches!(err, MeshError::InvalidDescription(_)));

    // One-sided entries are mirrored
    let mesh = Mesh::from_json(r#"{"A": ["B"], "B": []}"#, config(), sink()).unwrap();
    assert!(mesh.adjacency().are_adjacent(&id("B"), &id("A")));
}

#[test]
fn test_toggle_twice_restores_link() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    let before: Vec<Link> = mesh.dead_links().cloned().collect();

    mesh.toggle_link(&id("A"), &id("D")).unwrap();
    mesh.toggle_link(&id("D"), &id("A")).unwrap();

    let after: Vec<Link> = mesh.dead_links().cloned().collect();
    assert_eq!(before, after);
    assert_eq!(log.count("LINK_TOGGLED"), 2);
}

#[test]
fn test_restore_brings_everything_back() {
    let log = Arc::new(EventLog::new());
    let mut mesh = build(DIAMOND, log.clone());
    mesh.toggle_link(&id("A"), &id("B")).unwrap();
    mesh.toggle_node(&id("D")).unwrap();
    assert!(!mesh.link_usable(&id("A"), &id("D")));

    mesh.restore();

    for l in mesh.get_links() {
        let (a, b) = l.endpoints();
        assert!(mesh.link_usable(a, b));
    }
    assert_eq!(log.count("RESTORED"), 1);
}

#[test]
fn test_seeded_failures_are_reproducible() {
    let run = |seed: u64| {
        let config = MeshConfig {
            seed: Some(seed),
            ..MeshConfig::quiet()
        };
        let mut mesh = MeshPreset::Throughput
            .build(config, Arc::new(NullSink))
            .unwrap();
        let plan = SimulationPlan::for_preset(MeshPreset::Throughput, 10).with_failures(20, 40);
        let report = simulate(&mut mesh, &plan);
        let dead: Vec<Link> = mesh.dead_links().cloned().collect();
        (report, dead)
    };

    let (first, first_dead) = run(42);
    let (second, second_dead) = run(42);

    assert_eq!(first.stats.ticks, second.stats.ticks);
    assert_eq!(first.stats.hops, second.stats.hops);
    assert_eq!(first.stats.errors, second.stats.errors);
    assert_eq!(first.stats.unreached, second.stats.unreached);
    assert_eq!(first.stats.round_trips, second.stats.round_trips);
    assert_eq!(first.refused, second.refused);
    assert_eq!(first_dead, second_dead);
}

#[test]
fn test_random_failures_spare_protected_nodes() {
    let config = MeshConfig {
        seed: Some(3),
        never_fail: BTreeSet::from([id("0"), id("1")]),
        ..MeshConfig::quiet()
    };
    let mut mesh = MeshPreset::Abridged
        .build(config, Arc::new(NullSink))
        .unwrap();

    for _ in 0..200 {
        mesh.rand_fail(FailureKind::Node, 100);
    }
    assert!(mesh.node(&id("0")).unwrap().is_alive());
    assert!(mesh.node(&id("1")).unwrap().is_alive());
}

#[test]
fn test_every_preset_drains() {
    for preset in MeshPreset::ALL {
        let mut mesh = preset
            .build(MeshConfig::quiet(), Arc::new(NullSink))
            .unwrap();
        let report = simulate(&mut mesh, &SimulationPlan::for_preset(preset, 10));

        assert!(!report.timed_out, "{} timed out", preset);
        assert_eq!(report.generated, 20);
        assert_eq!(report.stats.deliveries(), 20);
        assert_eq!(report.stats.round_trips, 20);
        assert!(report.stats.average_congestion().is_some());
    }
}
