//! Input agents: configured spawn points that inject kernel vehicles.
//!
//! An agent is active only while its location lies inside the region table;
//! activation is re-evaluated whenever the table is replaced.  An active
//! agent spawns at most one vehicle per step, once `passed_s` reaches its
//! timer.  Inactive agents do not build up a backlog: their timer is held at
//! the current time so they spawn promptly, once, after reactivation.

use tracing::{debug, warn};

use tc_core::{GeoPoint, InputAgentId, RoadId, SpawnRng, TimeParams, VehicleId};
use tc_spatial::RegionTable;
use tc_vehicle::{EgoRegistry, PopulationStore, VehicleRecord};

use crate::InputAgentConfig;

#[derive(Debug)]
pub struct InputAgent {
    pub id:           InputAgentId,
    pub location:     GeoPoint,
    pub routes:       Vec<Vec<RoadId>>,
    pub period_s:     f64,
    pub active:       bool,
    /// Simulated time (`passed_s`) of the next spawn.
    pub next_spawn_s: f64,
    rng:              SpawnRng,
}

impl InputAgent {
    pub fn new(config: &InputAgentConfig, seed: u64) -> Self {
        Self {
            id:           config.id,
            location:     config.location,
            routes:       config.routes.clone(),
            period_s:     config.period_s,
            active:       false,
            next_spawn_s: 0.0,
            rng:          SpawnRng::new(seed, config.id),
        }
    }
}

/// All spawn points of one manager, in configuration order.
#[derive(Debug, Default)]
pub struct InputAgents {
    agents: Vec<InputAgent>,
}

impl InputAgents {
    pub fn from_config(configs: &[InputAgentConfig], seed: u64) -> Self {
        Self {
            agents: configs.iter().map(|c| InputAgent::new(c, seed)).collect(),
        }
    }

    /// Activate exactly the agents whose location is in range.  Returns the
    /// number of active agents.
    pub fn reactivate(&mut self, regions: &RegionTable) -> usize {
        for agent in &mut self.agents {
            agent.active = regions.in_range(agent.location);
        }
        self.active_count()
    }

    pub fn active_count(&self) -> usize {
        self.agents.iter().filter(|a| a.active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputAgent> + '_ {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Spawn one kernel vehicle for every active agent whose timer elapsed.
    ///
    /// Ids come from [`PopulationStore::next_spawn_id`], skipping ids held by
    /// egos.  Returns the spawned ids.
    pub fn spawn_due(
        &mut self,
        store:     &mut PopulationStore,
        egos:      &EgoRegistry,
        time:      &TimeParams,
        speed_mps: f64,
    ) -> Vec<VehicleId> {
        let mut spawned = Vec::new();
        for agent in &mut self.agents {
            if !agent.active {
                agent.next_spawn_s = agent.next_spawn_s.max(time.passed_s);
                continue;
            }
            if time.passed_s < agent.next_spawn_s {
                continue;
            }
            let Some(route) = agent.rng.choose(&agent.routes).cloned() else {
                continue;
            };
            let id = loop {
                let candidate = store.next_spawn_id();
                if !egos.contains(candidate) {
                    break candidate;
                }
            };
            let record = VehicleRecord::spawned(id, agent.location, route, speed_mps, time.abs_time_ms);
            match store.add_kernel_vehicle(record) {
                Ok(()) => {
                    debug!(agent = %agent.id, vehicle = %id, "spawned vehicle");
                    spawned.push(id);
                }
                Err(e) => warn!(agent = %agent.id, error = %e, "spawn rejected"),
            }
            agent.next_spawn_s += agent.period_s;
        }
        spawned
    }
}
