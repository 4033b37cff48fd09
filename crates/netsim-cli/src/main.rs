use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netsim_core::{InMemoryMetrics, Kernel, Link, RenoPolicy};
use netsim_types::{FlowId, LinkId, NodeId};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Discrete-event packet network simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and run a JSON topology file to completion.
    Run {
        /// Path to the topology JSON file.
        topology: PathBuf,
        /// Stop early at this much virtual simulated time (seconds).
        #[arg(long)]
        until: Option<f64>,
        /// Write the recorded metrics report as JSON to this path.
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
    /// Run a small built-in two-host topology with no input file, for a
    /// quick smoke check.
    Demo {
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.command {
        Command::Run {
            topology,
            until,
            report_out,
        } => {
            info!(path = %topology.display(), "loading topology");
            let mut kernel = netsim_topology::load_topology_file(&topology)
                .with_context(|| format!("failed to load topology {}", topology.display()))?;
            run_and_report(&mut kernel, until, report_out.as_deref())
        }
        Command::Demo { report_out } => {
            info!("building built-in demo topology");
            let mut kernel = build_demo();
            run_and_report(&mut kernel, None, report_out.as_deref())
        }
    }
}

fn run_and_report(kernel: &mut Kernel, until: Option<f64>, report_out: Option<&std::path::Path>) -> Result<()> {
    info!("running simulation to completion");
    kernel.run(until);
    info!(
        time = kernel.current_time(),
        active_flows = kernel.active_flows(),
        "simulation finished"
    );

    if let Some(path) = report_out {
        write_report(kernel, path)?;
    }
    Ok(())
}

fn write_report(kernel: &Kernel, path: &std::path::Path) -> Result<()> {
    let report = kernel
        .metrics()
        .as_any()
        .downcast_ref::<InMemoryMetrics>()
        .context("metrics sink is not an in-memory report")?;
    let data = serde_json::to_vec_pretty(report).context("failed to serialize metrics report")?;
    std::fs::write(path, &data)
        .with_context(|| format!("failed to write report file {}", path.display()))?;
    Ok(())
}

fn build_demo() -> Kernel {
    let mut kernel = Kernel::new(Box::new(InMemoryMetrics::new()));
    kernel.add_host(NodeId::from("H1"));
    kernel.add_host(NodeId::from("H2"));
    kernel.add_link(Link::new(
        LinkId::from("L1"),
        10_000_000.0,
        0.01,
        64.0 * 8000.0,
        (NodeId::from("H1"), NodeId::from("H2")),
    ));
    kernel.attach_host_link(&NodeId::from("H1"), LinkId::from("L1"));
    kernel.attach_host_link(&NodeId::from("H2"), LinkId::from("L1"));
    kernel.add_flow(
        FlowId(1),
        NodeId::from("H1"),
        NodeId::from("H2"),
        1_000_000.0 * 8.0,
        0.0,
        Box::new(RenoPolicy::new()),
    );
    kernel
}
