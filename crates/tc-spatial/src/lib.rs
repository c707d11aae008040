//! `tc-spatial` — region table, map-service seam, and vehicle spatial index.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`region`]  | `RegionTable`: the set of kernel-fidelity `MapRange`s       |
//! | [`network`] | `RoadMap` trait, `RoadTable` in-memory implementation       |
//! | [`index`]   | `VehicleIndex` (R-tree) for nearest / radius queries        |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod error;
pub mod index;
pub mod network;
pub mod region;


pub use error::{SpatialError, SpatialResult};
pub use index::VehicleIndex;
pub use network::{RoadMap, RoadTable};
pub use region::RegionTable;
