use std::collections::BTreeMap;
use std::io;
use std::thread;

use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{error, info, warn};

use dispatcher::building::Building;
use dispatcher::cli::Args;
use dispatcher::console;
use dispatcher::debug::Dashboard;
use dispatcher::error::{BuildingError, BuildingResult};
use dispatcher::service::BuildingEvent;
use dispatcher::simulator::{self, Simulator};
use shared_resources::config::BuildingConfig;

fn main() -> BuildingResult<()> {
    let args = Args::parse();

    // LOGGING
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    // READ CONFIGURATION
    let config = BuildingConfig::load(args.config.as_deref())?.scaled(args.speedup);

    // START BUILDING AND HARDWARE
    let building = Building::start(&config)?;
    let start_floors: BTreeMap<_, _> = config.cars.iter().map(|car| (car.id, car.home_floor)).collect();
    let simulator_handle = simulator::spawn(
        Simulator::new(building.topology().clone(), &start_floors),
        building.commands().clone(),
        building.link(),
    )?;

    let events = building.events().clone();
    let dashboard = args.dashboard;
    let monitor_handle = thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || monitor(events, dashboard))
        .map_err(|source| BuildingError::Spawn { name: "monitor", source })?;

    eprintln!("{}", console::HELP);
    let result = console::run(&building, io::stdin().lock());

    building.shutdown();
    for handle in [simulator_handle, monitor_handle] {
        if handle.join().is_err() {
            warn!(target: "building", "helper thread panicked");
        }
    }
    result
}

fn monitor(events: Receiver<BuildingEvent>, dashboard: bool) {
    let mut table = dashboard.then(Dashboard::new);
    for event in events.iter() {
        if let Some(table) = table.as_mut() {
            if let Err(e) = table.update(&event) {
                error!(target: "building", error = %e, "dashboard could not draw");
            }
            continue;
        }
        match event {
            BuildingEvent::Status(status) => info!(
                target: "building",
                car = %status.car,
                floor = status.floor,
                state = status.state.as_str(),
                doors = status.door_state.as_str(),
                load = status.load,
                "status"
            ),
            BuildingEvent::Backlogged { request } => info!(target: "building", %request, "waiting for a car"),
            BuildingEvent::Refused { button, reason } => warn!(target: "building", ?button, %reason, "refused"),
            BuildingEvent::Withdrawn { request } => info!(target: "building", %request, "withdrawn"),
            BuildingEvent::Alert(_) | BuildingEvent::Assigned { .. } | BuildingEvent::Served { .. } => {}
        }
    }
}
