//! `tc-sim` — handoff engine, step controller, and the `TrafficManager`
//! control plane.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`config`]   | `ManagerConfig`, `InputAgentConfig` (serde / JSON)             |
//! | [`handoff`]  | `HandoffPass`, `HandoffReport`, `DEFAULT_MAX_ERROR_DISTANCE`   |
//! | [`step`]     | one simulation advance, `StepReport`                           |
//! | [`spawn`]    | `InputAgents` — spawn points active inside the region table    |
//! | [`snapshot`] | `PopulationSnapshot`, `VehicleSnapshot`                        |
//! | [`observer`] | `StepObserver` hooks, `NoopObserver`                           |
//! | [`manager`]  | `TrafficManager`, `ErrCode`                                    |
//! | [`error`]    | `SimError`, `SimResult<T>`                                     |
//!
//! # Call cycle
//!
//! ```text
//! host                               TrafficManager
//! ────                               ──────────────
//! reset_simulation_range(ranges) ──► replace region table
//! init(config)                   ──► store, clock, egos, worker pool
//! reset_traffic_info(t, batch)   ──► kill out-of-range kernel vehicles
//!                                    clear edges, classify batch, apply
//! step_abs(t) / step_relative(dt)──► spawn, intents, apply, range flags
//! snapshot_micro(frame)          ──► read-only export
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                      |
//! |------------|-------------------------------------------------------------|
//! | `parallel` | Runs the kill, classify, and intent scans on a Rayon pool.  |

pub mod config;
pub mod error;
pub mod handoff;
pub mod manager;
pub mod observer;
pub mod snapshot;
pub mod spawn;
pub mod step;

#[cfg(test)]
mod tests;

pub use config::{InputAgentConfig, ManagerConfig};
pub use error::{SimError, SimResult};
pub use handoff::{DEFAULT_MAX_ERROR_DISTANCE, HandoffPass, HandoffReport};
pub use manager::{ErrCode, TrafficManager};
pub use observer::{NoopObserver, StepObserver};
pub use snapshot::{PopulationSnapshot, VehicleSnapshot};
pub use spawn::{InputAgent, InputAgents};
pub use step::StepReport;
