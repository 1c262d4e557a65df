//! DeviceGraph CLI - edit, wire and evaluate device schemes from the command line.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use devicegraph::persist::with_extension;
use devicegraph::prelude::*;
use devicegraph::TickDriver;
use std::io::Read;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "devicegraph")]
#[command(about = "Device graph editor and state evaluator", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the category files (overrides the settings file)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List categories and their device templates
    Catalog {
        /// Only list this category
        #[arg(long)]
        category: Option<String>,

        /// Print the full I/O description of every device
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the port types declared by the connections category
    Ports,

    /// Create an empty category file
    AddCategory {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Validate a device description and append it to a category
    AddDevice {
        #[arg(long)]
        category: String,

        /// Description file in key:value lines, `-` for stdin
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Place a device into a scheme (the scheme is created if absent)
    Place {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,

        #[arg(long)]
        category: String,

        #[arg(long)]
        device: String,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i32,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        y: i32,
    },

    /// Move a node
    Move {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,

        #[arg(value_name = "NODE")]
        node: String,

        #[arg(long, allow_hyphen_values = true)]
        x: i32,

        #[arg(long, allow_hyphen_values = true)]
        y: i32,
    },

    /// Wire two inputs (zero-based indices)
    Bind {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,
        node_a: String,
        input_a: usize,
        node_b: String,
        input_b: usize,
    },

    /// Disconnect an input and its peer
    Unbind {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,
        node: String,
        input: usize,
    },

    /// Delete a node and every link touching it
    Remove {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,
        node: String,
    },

    /// Run a single evaluation pass
    Check {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Evaluate periodically until interrupted
    Run {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,

        /// Stop after this many passes
        #[arg(long)]
        ticks: Option<u64>,

        /// Tick period in milliseconds (overrides the settings file)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Write the device report of a scheme
    Report {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Summarize nodes, links and islands
    Info {
        #[arg(value_name = "SCHEME")]
        scheme: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let mut ws = open_workspace(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Catalog { category, verbose } => handle_catalog(&ws, category.as_deref(), verbose),
        Commands::Ports => {
            handle_ports(&ws);
            Ok(())
        }
        Commands::AddCategory { name } => {
            let path = ws.create_category(&name)?;
            println!("Created category {} at {}", name.to_lowercase(), path.display());
            Ok(())
        }
        Commands::AddDevice { category, file } => handle_add_device(&mut ws, &category, &file),
        Commands::Place {
            scheme,
            category,
            device,
            x,
            y,
        } => {
            load_scheme(&mut ws, &scheme, true)?;
            let id = ws.add_node(&category, &device, Position::new(x, y))?;
            ws.save_scheme(&scheme)?;
            println!("{}", id);
            Ok(())
        }
        Commands::Move { scheme, node, x, y } => {
            load_scheme(&mut ws, &scheme, false)?;
            ws.move_node(&node, Position::new(x, y))?;
            ws.save_scheme(&scheme)?;
            Ok(())
        }
        Commands::Bind {
            scheme,
            node_a,
            input_a,
            node_b,
            input_b,
        } => handle_bind(&mut ws, &scheme, Endpoint::new(node_a, input_a), Endpoint::new(node_b, input_b)),
        Commands::Unbind { scheme, node, input } => {
            load_scheme(&mut ws, &scheme, false)?;
            match ws.unbind(&node, input)? {
                Some(link) => {
                    ws.save_scheme(&scheme)?;
                    println!("unbound {}", link);
                }
                None => println!("unchanged (not connected)"),
            }
            Ok(())
        }
        Commands::Remove { scheme, node } => {
            load_scheme(&mut ws, &scheme, false)?;
            let removed = ws.delete_node(&node)?;
            ws.save_scheme(&scheme)?;
            println!("removed {} ({})", node, removed.device.name);
            Ok(())
        }
        Commands::Check { scheme, format } => {
            load_scheme(&mut ws, &scheme, false)?;
            handle_check(&ws, &format)
        }
        Commands::Run {
            scheme,
            ticks,
            interval_ms,
        } => {
            load_scheme(&mut ws, &scheme, false)?;
            handle_run(&ws, ticks, interval_ms).await;
            Ok(())
        }
        Commands::Report { scheme, output } => {
            load_scheme(&mut ws, &scheme, false)?;
            let path = ws.write_report(&output)?;
            println!("Report written to {}", path.display());
            Ok(())
        }
        Commands::Info { scheme } => {
            load_scheme(&mut ws, &scheme, false)?;
            handle_info(&ws);
            Ok(())
        }
    }
}

fn open_workspace(config: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Workspace> {
    let mut settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = data_dir {
        settings = settings.with_data_dir(dir);
    }
    tracing::debug!("Using data directory {:?}", settings.data_dir);
    Ok(Workspace::open(settings))
}

/// Load `scheme` into the workspace. With `create`, a missing file leaves the
/// workspace on an empty graph instead of failing.
fn load_scheme(ws: &mut Workspace, scheme: &Path, create: bool) -> anyhow::Result<()> {
    let file = with_extension(scheme, &ws.settings().scheme_extension);
    if create && !file.exists() {
        tracing::info!("Starting new scheme {:?}", file);
        return Ok(());
    }
    ws.load_scheme(scheme)
        .with_context(|| format!("Failed to load scheme {}", file.display()))
}

fn handle_catalog(ws: &Workspace, only: Option<&str>, verbose: bool) -> anyhow::Result<()> {
    let library = ws.library();

    if let Some(name) = only {
        if library.catalog.category(name).is_none() {
            bail!("Unknown category {:?}", name);
        }
    }

    for (name, category) in library.catalog.categories() {
        if only.map_or(false, |o| o != name.as_str()) {
            continue;
        }
        println!("{} ({} devices)", name, category.len());
        for (id, device) in category {
            println!("  {:<38} {}", id, device.name);
            if verbose {
                for line in device.describe().lines() {
                    println!("      {}", line);
                }
            }
        }
    }
    Ok(())
}

fn handle_ports(ws: &Workspace) {
    let library = ws.library();
    if library.ports.is_empty() {
        println!("No port types declared");
        return;
    }
    for port in library.ports.iter() {
        println!("{}", port);
    }
}

fn handle_add_device(ws: &mut Workspace, category: &str, file: &Path) -> anyhow::Result<()> {
    let description = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read description from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    };

    let device = ws.author_device(category, &description)?;
    println!("Added {} ({}) to {}", device.id, device.name, category);
    Ok(())
}

fn handle_bind(ws: &mut Workspace, scheme: &Path, a: Endpoint, b: Endpoint) -> anyhow::Result<()> {
    load_scheme(ws, scheme, false)?;
    match ws.bind(a, b)? {
        BindOutcome::Bound(link) => {
            ws.save_scheme(scheme)?;
            println!("bound {}", link);
        }
        BindOutcome::AlreadyConnected => println!("unchanged (already connected)"),
        BindOutcome::NoMatchingConnection => println!("unchanged (no matching connection)"),
    }
    Ok(())
}

fn handle_check(ws: &Workspace, format: &OutputFormat) -> anyhow::Result<()> {
    let report = ws.tick();
    match format {
        OutputFormat::Human => output_human(ws.graph(), &report),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "evaluated_at": report.evaluated_at.to_rfc3339(),
                "nodes": ws.graph().nodes().iter().map(|(id, node)| {
                    serde_json::json!({
                        "id": id,
                        "category": node.category,
                        "device": node.device.id,
                        "name": node.device.name,
                        "on": report.state(id).unwrap_or(false),
                    })
                }).collect::<Vec<_>>(),
                "summary": {
                    "total_nodes": report.states.len(),
                    "active": report.active_count(),
                    "total_power": report.total_power,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn output_human(graph: &Graph, report: &TickReport) {
    println!("Evaluated at {}", report.evaluated_at.format("%Y-%m-%d %H:%M:%S%.3f"));
    println!("{}", "─".repeat(60));

    if graph.is_empty() {
        println!("  No nodes");
    }
    for (id, node) in graph.nodes() {
        let state = if report.state(id).unwrap_or(false) { "ON" } else { "off" };
        println!("  {:<4} {:<20} {}", state, node.device.name, id);
    }

    println!("\n  Summary:");
    println!("    Active: {}/{}", report.active_count(), report.states.len());
    println!("    Power:  {}", report.total_power);
}

async fn handle_run(ws: &Workspace, ticks: Option<u64>, interval_ms: Option<u64>) {
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ws.settings().tick_interval());
    let mut driver = TickDriver::new(period);
    if let Some(ticks) = ticks {
        driver = driver.with_max_ticks(ticks);
    }

    let graph = ws.graph();
    let run = driver.run(ws.evaluator(), graph, |report| {
        let on: Vec<&str> = graph
            .nodes()
            .iter()
            .filter(|(id, _)| report.state(id).unwrap_or(false))
            .map(|(_, node)| node.device.name.as_str())
            .collect();
        println!(
            "[{}] {}/{} on: {}",
            report.evaluated_at.format("%H:%M:%S%.3f"),
            report.active_count(),
            report.states.len(),
            on.join(", ")
        );
        ControlFlow::Continue(())
    });

    tokio::select! {
        passes = run => println!("Finished after {} passes", passes),
        _ = tokio::signal::ctrl_c() => eprintln!("Interrupted"),
    }
}

fn handle_info(ws: &Workspace) {
    let graph = ws.graph();
    println!("Nodes:   {}", graph.nodes().len());
    println!("Links:   {}", graph.links().len());
    println!("Islands: {}", graph.islands());
    println!("Power:   {}", graph.total_power());

    for (id, node) in graph.nodes() {
        println!(
            "\n{} {}/{} ({}) at ({}, {})",
            id, node.category, node.device.id, node.device.name, node.position.x, node.position.y
        );
        for (index, input) in node.inputs().iter().enumerate() {
            match graph.connection(id, index) {
                Some(conn) => println!(
                    "  [{}] {:<16} -> {}[{}]",
                    index, input.name, conn.peer_node, conn.peer_input
                ),
                None => println!("  [{}] {}", index, input.name),
            }
        }
    }
}
