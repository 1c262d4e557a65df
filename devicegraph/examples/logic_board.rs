//! Build a small board from a data directory, wire it and print the states.

use devicegraph::prelude::*;
use std::path::PathBuf;

fn main() -> Result<(), DeviceGraphError> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("devicegraph/tests/fixtures/data"));

    let mut ws = Workspace::open(Settings::default().with_data_dir(&data_dir));
    if ws.library().catalog.categories().count() == 0 {
        eprintln!("No categories found in {}", data_dir.display());
        eprintln!("Usage: cargo run --example logic_board [path/to/data]");
        std::process::exit(1);
    }

    let battery = ws.add_node("sources", "battery", Position::new(0, 0))?;
    let gate = ws.add_node("gates", "g1", Position::new(120, 0))?;

    let outcome = ws.bind(Endpoint::new(battery.clone(), 0), Endpoint::new(gate.clone(), 0))?;
    println!("battery -> AND.in1: {:?}", outcome);

    let report = ws.tick();
    for (id, node) in ws.graph().nodes() {
        println!("  {:<10} {}", node.device.name, report.state(id).unwrap_or(false));
    }
    println!("Power: {} W", report.total_power);

    Ok(())
}
