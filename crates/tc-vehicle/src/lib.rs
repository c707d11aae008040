//! `tc-vehicle` — the vehicle population and the ego registry.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                         |
//! |--------------|------------------------------------------------------------------|
//! | [`record`]   | `VehicleRecord`, `Representation`, `ArchiveKind`, `Kinematics`   |
//! | [`incoming`] | `IncomingRecord` (`Full` / `Simple`), validation                 |
//! | [`store`]    | `PopulationStore` — kernel and edge subsets, per-road index      |
//! | [`ego`]      | `EgoRegistry`, `EgoRecord`, `LocationState`, `EgoDiff`           |
//! | [`error`]    | `StoreError`, `StoreResult<T>`                                   |
//!
//! # Ownership model
//!
//! The store exclusively owns every `VehicleRecord`.  A vehicle is either a
//! **kernel** vehicle (inside a region, advanced each step by the traffic
//! kernel) or an **edge** vehicle (outside every region, a stand-in that is
//! rebuilt from scratch on every traffic reset).  The same id is never alive
//! in both subsets.
//!
//! Egos live in their own registry keyed by the same id space.

pub mod ego;
pub mod error;
pub mod incoming;
pub mod record;
pub mod store;


pub use ego::{EgoDiff, EgoRecord, EgoRegistry, LocationState};
pub use error::{StoreError, StoreResult};
pub use incoming::{IncomingRecord, MalformedReason, PositionOnly, VehicleState};
pub use record::{ArchiveKind, Kinematics, Representation, VehicleRecord, VehicleType};
pub use store::PopulationStore;
