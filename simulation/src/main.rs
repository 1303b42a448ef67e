//! meshroute - mesh routing simulator
//!
//! Runs throughput simulations, inspects topologies and offers an
//! interactive operator console over the built-in meshes.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use meshroute_core::{EventLog, NodeId, NullSink, PacketKind};
use meshroute_simulation::{FailureKind, Mesh, MeshConfig, MeshPreset, SimulationPlan, simulate};

#[derive(Parser)]
#[command(
    name = "meshroute",
    about = "Packet routing simulator for meshes of unreliable nodes and links",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a throughput simulation from the first two nodes to the preset target
    Simulate {
        /// Preset mesh: 1 assignment, 2 abridged, 3 throughput
        #[arg(short, long, default_value = "3")]
        mesh: MeshPreset,

        /// Packets generated at each source
        #[arg(short, long, default_value = "10")]
        packets: usize,

        /// Node failure chance per tick (percent)
        #[arg(long, default_value = "0")]
        node_fail: u8,

        /// Link failure chance per tick (percent)
        #[arg(long, default_value = "0")]
        link_fail: u8,

        /// RNG seed for reproducible failures
        #[arg(short, long)]
        seed: Option<u64>,

        /// Let random failures hit the sources and the target too
        #[arg(long)]
        fail_endpoints: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a preset's adjacency and topology
    Topology {
        #[arg(short, long, default_value = "1")]
        mesh: MeshPreset,

        /// Dump the full topology of one node
        #[arg(short, long)]
        node: Option<String>,
    },

    /// Interactive operator console
    Interactive {
        #[arg(short, long, default_value = "1")]
        mesh: MeshPreset,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            mesh: preset,
            packets,
            node_fail,
            link_fail,
            seed,
            fail_endpoints,
            json,
        } => {
            let config = MeshConfig {
                verbose: cli.verbose,
                seed,
                ..MeshConfig::default()
            };
            let mut mesh = preset.build(config, Arc::new(NullSink))?;
            let plan = SimulationPlan::for_preset(preset, packets)
                .with_failures(node_fail, link_fail)
                .with_protected_endpoints(!fail_endpoints);
            let report = simulate(&mut mesh, &plan);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Topology { mesh: preset, node } => {
            let mesh = preset.build(MeshConfig::quiet(), Arc::new(NullSink))?;
            println!("{}", preset);
            println!("{}", mesh.adjacency().visualize());
            match node {
                Some(name) => {
                    let id = NodeId::from(name);
                    let node = mesh
                        .node(&id)
                        .ok_or_else(|| anyhow::anyhow!("Unknown node: {}", id))?;
                    println!("{}", node.describe_links());
                    println!("{}", node.describe_topology());
                }
                None => {
                    println!("Average topology size: {:.2}", mesh.average_topology_size());
                }
            }
        }
        Commands::Interactive { mesh } => {
            run_interactive(mesh, cli.verbose)?;
        }
    }

    Ok(())
}

fn run_interactive(preset: MeshPreset, verbose: bool) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let log = Arc::new(EventLog::new());
    let config = MeshConfig {
        verbose,
        ..MeshConfig::default()
    };
    let mut mesh = preset.build(config, log.clone())?;
    println!("{}", preset);
    println!("{}", mesh.adjacency().visualize());
    log.drain();

    print_help();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "packet" | "p" => match parse_packet_command(&parts[1..]) {
                Some((from, to, kind, data)) => {
                    match mesh.generate_packet(&from, kind, &to, data) {
                        Ok(id) => println!("  Created {} packet {}", kind, id),
                        Err(e) => println!("  {}", e),
                    }
                }
                None => println!("  Usage: packet <from> <to> [data|ack] [payload]"),
            },
            "next" | "n" => {
                let n: u64 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                for _ in 0..n {
                    mesh.run();
                    print_tick(&mesh, &log);
                }
            }
            "simulate" | "s" => {
                let packets = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
                let node_fail = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
                let link_fail = parts.get(3).and_then(|s| s.parse().ok()).unwrap_or(0);
                let plan =
                    SimulationPlan::for_preset(preset, packets).with_failures(node_fail, link_fail);
                let report = simulate(&mut mesh, &plan);
                log.drain();
                println!("{}", report);
            }
            "fail" | "r" => {
                let kind = match parts.get(1).map(|s| s.parse::<FailureKind>()) {
                    Some(Ok(kind)) => kind,
                    Some(Err(e)) => {
                        println!("  {}", e);
                        continue;
                    }
                    None => FailureKind::Node,
                };
                let chance = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
                if mesh.rand_fail(kind, chance) {
                    print_events(&log);
                } else {
                    println!("  Nothing failed");
                }
            }
            "chance" | "c" => {
                if parts.len() >= 3 {
                    match (parts[1].parse::<FailureKind>(), parts[2].parse::<u8>()) {
                        (Ok(kind), Ok(chance)) => {
                            mesh.set_fail_chance(kind, chance);
                            println!(
                                "  Fail chances: node {}, link {}",
                                mesh.config().node_fail_chance,
                                mesh.config().link_fail_chance
                            );
                        }
                        _ => println!("  Usage: chance <node|link> <0-100>"),
                    }
                } else {
                    println!("  Usage: chance <node|link> <0-100>");
                }
            }
            "node" | "f" => {
                if let Some(name) = parts.get(1) {
                    match mesh.toggle_node(&NodeId::from(*name)) {
                        Ok(alive) => println!("  Node {} is now {}", name, up_down(alive)),
                        Err(e) => println!("  {}", e),
                    }
                } else {
                    println!("  Usage: node <id>");
                }
            }
            "link" | "l" => {
                if parts.len() >= 3 {
                    let (a, b) = (NodeId::from(parts[1]), NodeId::from(parts[2]));
                    match mesh.toggle_link(&a, &b) {
                        Ok(alive) => println!("  Link ({}, {}) is now {}", a, b, up_down(alive)),
                        Err(e) => println!("  {}", e),
                    }
                } else {
                    println!("  Usage: link <a> <b>");
                }
            }
            "restore" | "t" => {
                mesh.restore();
                println!("  Restored all links and nodes");
            }
            "buffers" | "b" => {
                for node in mesh.nodes() {
                    println!("{}", node.describe_buffer());
                }
            }
            "inspect" | "i" => {
                let Some(node) = parts.get(1).and_then(|name| mesh.node(&NodeId::from(*name)))
                else {
                    println!("  Usage: inspect <id> [buffer|links|topology]");
                    continue;
                };
                match parts.get(2).copied().unwrap_or("buffer") {
                    "links" => println!("{}", node.describe_links()),
                    "topology" => println!("{}", node.describe_topology()),
                    _ => println!("{}", node.describe_buffer()),
                }
            }
            "average" | "a" => {
                println!("  Average topology size: {:.2}", mesh.average_topology_size());
                println!("  Links: {}", mesh.get_links().len());
            }
            "status" => {
                println!("{}", mesh.status_report());
            }
            "stats" => {
                println!("{}", mesh.stats());
            }
            "verbose" => {
                let verbose = !mesh.config().verbose;
                mesh.set_verbose(verbose);
                println!("  Verbose narration {}", if verbose { "on" } else { "off" });
            }
            "help" | "h" => print_help(),
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                println!("  Unknown command: {}", parts[0]);
            }
        }
    }

    Ok(())
}

/// `<from> <to> [data|ack] [payload...]`
fn parse_packet_command(args: &[&str]) -> Option<(NodeId, NodeId, PacketKind, Option<String>)> {
    let (from, to) = match args {
        [from, to, ..] => (NodeId::from(*from), NodeId::from(*to)),
        _ => return None,
    };
    let mut rest = &args[2..];
    let kind = match rest.first().map(|token| token.parse::<PacketKind>()) {
        Some(Ok(kind)) => {
            rest = &rest[1..];
            kind
        }
        _ => PacketKind::Data,
    };
    let data = (!rest.is_empty()).then(|| rest.join(" "));
    Some((from, to, kind, data))
}

fn print_help() {
    println!("\nInteractive mode. Commands:");
    println!("  packet <from> <to> [data|ack] [payload]");
    println!("                                 - Generate a packet (DATA by default)");
    println!("  next [n]                       - Run n ticks (default 1)");
    println!("  simulate [packets] [nf] [lf]   - Throughput simulation");
    println!("  fail [node|link] [chance]      - Random failure");
    println!("  chance <node|link> <pct>       - Set per-tick failure chance");
    println!("  node <id>                      - Toggle node failure");
    println!("  link <a> <b>                   - Toggle link failure");
    println!("  restore                        - Bring everything back up");
    println!("  buffers                        - Show every buffer");
    println!("  inspect <id> [buffer|links|topology]");
    println!("  average                        - Average topology size");
    println!("  status                         - Down nodes, links, pending buffers");
    println!("  stats                          - Delivery metrics");
    println!("  verbose                        - Toggle event narration");
    println!("  quit                           - Exit");
    println!();
}

fn print_tick(mesh: &Mesh, log: &EventLog) {
    println!("{}", mesh.status_report());
    println!("Network events for tick {}:", mesh.tick());
    print_events(log);
    println!("--------------");
}

fn print_events(log: &EventLog) {
    for event in log.drain() {
        println!("    {:?}", event);
    }
}

fn up_down(alive: bool) -> &'static str {
    if alive { "up" } else { "down" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_command_defaults_to_data() {
        let (from, to, kind, data) = parse_packet_command(&["0", "12"]).unwrap();
        assert_eq!((from.as_str(), to.as_str()), ("0", "12"));
        assert_eq!(kind, PacketKind::Data);
        assert_eq!(data, None);
    }

    #[test]
    fn test_packet_command_takes_kind_and_payload() {
        let (_, _, kind, data) = parse_packet_command(&["0", "12", "ack", "hello", "there"]).unwrap();
        assert_eq!(kind, PacketKind::Ack);
        assert_eq!(data.as_deref(), Some("hello there"));

        let (_, _, kind, data) = parse_packet_command(&["0", "12", "hello"]).unwrap();
        assert_eq!(kind, PacketKind::Data);
        assert_eq!(data.as_deref(), Some("hello"));
    }

    #[test]
    fn test_packet_command_needs_both_ends() {
        assert!(parse_packet_command(&["0"]).is_none());
        assert!(parse_packet_command(&[]).is_none());
    }
}
