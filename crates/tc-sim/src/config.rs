//! Manager configuration.
//!
//! Hosts usually ship configuration as JSON; every field has a default so a
//! minimal document is `{}`.
//!
//! ```
//! use tc_sim::ManagerConfig;
//!
//! let config = ManagerConfig::from_json_str(r#"{ "time_step_s": 0.05, "seed": 7 }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.ego_safe_radius_m, 5.0);
//! ```

use serde::{Deserialize, Serialize};

use tc_core::{GeoPoint, InputAgentId, MapRange, RoadId, TcError};

use crate::{SimError, SimResult};

/// A configured spawn point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputAgentConfig {
    pub id:       InputAgentId,
    pub location: GeoPoint,
    /// Candidate routes; one is picked per spawned vehicle.
    pub routes:   Vec<Vec<RoadId>>,
    /// Seconds between spawns while the agent is active.
    pub period_s: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Step length for `step` and for absolute-mode steps, seconds.
    pub time_step_s:       f64,
    /// Timeline origin for relative-mode steps, milliseconds.
    pub start_abs_time_ms: u64,
    /// Global seed for input-agent route choice.
    pub seed:              u64,
    /// Worker threads for parallel scans.  `None` = all cores.
    pub num_threads:       Option<usize>,
    /// Regions installed at `init`.  Empty keeps the current table.
    pub regions:           Vec<MapRange>,
    pub input_agents:      Vec<InputAgentConfig>,
    /// A non-forced ego may not be placed closer than this to a kernel vehicle.
    pub ego_safe_radius_m: f64,
    /// First id handed to spawned vehicles.
    pub spawn_id_base:     u64,
    /// Initial speed of spawned vehicles.
    pub spawn_speed_mps:   f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            time_step_s:       0.1,
            start_abs_time_ms: 0,
            seed:              42,
            num_threads:       None,
            regions:           Vec::new(),
            input_agents:      Vec::new(),
            ego_safe_radius_m: 5.0,
            spawn_id_base:     1_000_000_000,
            spawn_speed_mps:   12.0,
        }
    }
}

impl ManagerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SimError::Core(TcError::Parse(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the manager cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: String| Err(SimError::Config(msg));

        if !self.time_step_s.is_finite() || self.time_step_s <= 0.0 {
            return fail(format!("time_step_s must be positive, got {}", self.time_step_s));
        }
        if self.num_threads == Some(0) {
            return fail("num_threads must be at least 1".into());
        }
        if !self.ego_safe_radius_m.is_finite() || self.ego_safe_radius_m < 0.0 {
            return fail(format!("ego_safe_radius_m must be >= 0, got {}", self.ego_safe_radius_m));
        }
        if !self.spawn_speed_mps.is_finite() || self.spawn_speed_mps < 0.0 {
            return fail(format!("spawn_speed_mps must be >= 0, got {}", self.spawn_speed_mps));
        }
        for agent in &self.input_agents {
            if agent.routes.is_empty() || agent.routes.iter().any(Vec::is_empty) {
                return fail(format!("input agent {} needs at least one non-empty route", agent.id));
            }
            if !agent.period_s.is_finite() || agent.period_s <= 0.0 {
                return fail(format!("input agent {} period must be positive", agent.id));
            }
            if !agent.location.is_finite() {
                return fail(format!("input agent {} has a non-finite location", agent.id));
            }
        }
        Ok(())
    }
}
