//! `tc-core` — foundational types for the traffic-cloud population manager.
//!
//! This crate is a dependency of every other `tc-*` crate.  It intentionally
//! has no `tc-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `VehicleId`, `RoadId`, `InputAgentId`                 |
//! | [`geo`]         | `GeoPoint`, `MapRange`, haversine distance            |
//! | [`time`]        | `TimeParams`, `SimClock`, `ClockMode`                 |
//! | [`rng`]         | `SpawnRng` (per input agent)                          |
//! | [`error`]       | `TcError`, `TcResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types;        |
//! |         | required by the manager configuration in `tc-sim`.         |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{TcError, TcResult};
pub use geo::{GeoPoint, MapRange};
pub use ids::{InputAgentId, RoadId, VehicleId};
pub use rng::SpawnRng;
pub use time::{ClockMode, SimClock, TimeParams};
