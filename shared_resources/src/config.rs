use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::ids::{CarId, Floor};

const CONFIG_FILE_PATH: &str = "config.json";
const FALLBACK_CONFIG_FILE_PATH: &str = "_config.json";

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct TopologyFile {
    #[serde(default)]
    pub lowest_floor: Floor,
    pub floor_count: u8,
    pub floor_travel_ms: u64,
    pub door_cycle_ms: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ControlFile {
    pub tick_ms: u64,
    pub door_dwell_ms: u64,
    pub sensor_slack_ms: u64,
    pub max_missed_confirmations: u8,
    pub rebalance_after_ms: u64,
    pub backlog_alert_after_ms: u64,
    pub audit_capacity: usize,
}

impl Default for ControlFile {
    fn default() -> Self {
        ControlFile {
            tick_ms: 100,
            door_dwell_ms: 3000,
            sensor_slack_ms: 1000,
            max_missed_confirmations: 2,
            rebalance_after_ms: 10_000,
            backlog_alert_after_ms: 30_000,
            audit_capacity: 64,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct CarFile {
    pub capacity: u16,
    #[serde(default)]
    pub home_floor: Option<Floor>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub topology: TopologyFile,
    #[serde(default)]
    pub control: ControlFile,
    pub cars: Vec<CarFile>,
}

/// Static shape of the building. Read-only once the building is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingTopology {
    pub lowest_floor: Floor,
    pub floor_count: u8,
    pub floor_travel_time: Duration,
    pub door_cycle_time: Duration,
}

impl BuildingTopology {
    pub fn top_floor(&self) -> Floor {
        self.lowest_floor
            .saturating_add(self.floor_count.saturating_sub(1))
    }

    pub fn contains(&self, floor: Floor) -> bool {
        (self.lowest_floor..=self.top_floor()).contains(&floor)
    }

    /// Home floors spread evenly over the shaft, one per car.
    pub fn spread_home_floors(&self, cars: usize) -> Vec<Floor> {
        let span = u32::from(self.floor_count.saturating_sub(1));
        let slots = cars.saturating_sub(1).max(1) as u32;
        (0..cars as u32)
            .map(|i| {
                let offset = (i * span + slots / 2) / slots;
                self.lowest_floor.saturating_add(offset.min(span) as u8)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSettings {
    pub tick_interval: Duration,
    pub door_dwell: Duration,
    pub sensor_slack: Duration,
    pub max_missed_confirmations: u8,
    pub rebalance_after: Duration,
    pub backlog_alert_after: Duration,
    pub audit_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarSettings {
    pub id: CarId,
    pub capacity: u16,
    pub home_floor: Floor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingConfig {
    pub topology: BuildingTopology,
    pub control: ControlSettings,
    pub cars: Vec<CarSettings>,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        let file = ConfigFile {
            topology: TopologyFile {
                lowest_floor: 0,
                floor_count: 10,
                floor_travel_ms: 2000,
                door_cycle_ms: 1000,
            },
            control: ControlFile::default(),
            cars: vec![
                CarFile { capacity: 8, home_floor: None },
                CarFile { capacity: 8, home_floor: None },
                CarFile { capacity: 8, home_floor: None },
            ],
        };
        BuildingConfig::build(file)
    }
}

fn read_config_file(path: &Path) -> ConfigResult<ConfigFile> {
    let config_contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&config_contents)?)
}

impl BuildingConfig {
    /// Reads the given file, or `config.json` / `_config.json` from the working
    /// directory. Falls back to the built-in settings when neither exists.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => {
                let mut found = None;
                for candidate in [CONFIG_FILE_PATH, FALLBACK_CONFIG_FILE_PATH] {
                    let candidate = Path::new(candidate);
                    if candidate.exists() {
                        found = Some(read_config_file(candidate)?);
                        break;
                    }
                }
                match found {
                    Some(file) => file,
                    None => {
                        info!(target: "building", "no configuration file provided, using default settings");
                        return Ok(BuildingConfig::default());
                    }
                }
            }
        };
        BuildingConfig::from_file(file)
    }

    pub fn from_json(contents: &str) -> ConfigResult<Self> {
        BuildingConfig::from_file(serde_json::from_str(contents)?)
    }

    pub fn from_file(file: ConfigFile) -> ConfigResult<Self> {
        validate(&file)?;
        Ok(BuildingConfig::build(file))
    }

    fn build(file: ConfigFile) -> Self {
        let topology = BuildingTopology {
            lowest_floor: file.topology.lowest_floor,
            floor_count: file.topology.floor_count,
            floor_travel_time: Duration::from_millis(file.topology.floor_travel_ms),
            door_cycle_time: Duration::from_millis(file.topology.door_cycle_ms),
        };
        let spread = topology.spread_home_floors(file.cars.len());
        let cars = file
            .cars
            .iter()
            .zip(spread)
            .enumerate()
            .map(|(index, (car, spread_floor))| CarSettings {
                id: CarId(index as u8 + 1),
                capacity: car.capacity,
                home_floor: car.home_floor.unwrap_or(spread_floor),
            })
            .collect();
        let control = ControlSettings {
            tick_interval: Duration::from_millis(file.control.tick_ms),
            door_dwell: Duration::from_millis(file.control.door_dwell_ms),
            sensor_slack: Duration::from_millis(file.control.sensor_slack_ms),
            max_missed_confirmations: file.control.max_missed_confirmations,
            rebalance_after: Duration::from_millis(file.control.rebalance_after_ms),
            backlog_alert_after: Duration::from_millis(file.control.backlog_alert_after_ms),
            audit_capacity: file.control.audit_capacity,
        };
        BuildingConfig { topology, control, cars }
    }

    /// Same building with every duration divided by `factor`. Used to run
    /// the simulator faster than real time.
    pub fn scaled(mut self, factor: u32) -> Self {
        let factor = factor.max(1);
        self.topology.floor_travel_time /= factor;
        self.topology.door_cycle_time /= factor;
        self.control.door_dwell /= factor;
        self.control.sensor_slack /= factor;
        self.control.rebalance_after /= factor;
        self.control.backlog_alert_after /= factor;
        self
    }
}

fn validate(file: &ConfigFile) -> ConfigResult<()> {
    let invalid = |message: String| Err(ConfigError::Invalid(message));
    let topology = &file.topology;
    if topology.floor_count < 2 {
        return invalid(format!("a building needs at least two floors, got {}", topology.floor_count));
    }
    if u16::from(topology.lowest_floor) + u16::from(topology.floor_count) - 1 > u16::from(Floor::MAX) {
        return invalid("floor numbers do not fit in the floor range".to_owned());
    }
    if topology.floor_travel_ms == 0 || topology.door_cycle_ms == 0 {
        return invalid("travel and door cycle times must be positive".to_owned());
    }
    if file.control.tick_ms == 0 {
        return invalid("control tick must be positive".to_owned());
    }
    if file.control.max_missed_confirmations == 0 {
        return invalid("max_missed_confirmations must be at least 1".to_owned());
    }
    if file.cars.is_empty() {
        return invalid("at least one car is required".to_owned());
    }
    if file.cars.len() > usize::from(u8::MAX) {
        return invalid(format!("too many cars: {}", file.cars.len()));
    }
    let top = topology.lowest_floor + (topology.floor_count - 1);
    for (index, car) in file.cars.iter().enumerate() {
        if car.capacity == 0 {
            return invalid(format!("car {} has zero capacity", index + 1));
        }
        if let Some(home) = car.home_floor {
            if home < topology.lowest_floor || home > top {
                return invalid(format!("car {} home floor {} is outside the building", index + 1, home));
            }
        }
    }
    Ok(())
}
