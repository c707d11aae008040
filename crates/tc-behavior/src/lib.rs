//! `tc-behavior` — the traffic kernel seam and its intent types.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`intent`]  | `Intent` enum (`Move`, `Despawn`, `Stay`), `Motion`             |
//! | [`context`] | `StepContext<'a>` — read-only step snapshot shared by vehicles  |
//! | [`kernel`]  | `TrafficKernel` trait                                           |
//! | [`noop`]    | `NoopKernel` — vehicles never move                              |
//! | [`cruise`]  | `CruiseKernel` — constant speed along the route                 |
//! | [`error`]   | `BehaviorError`, `BehaviorResult<T>`                            |
//!
//! # Design notes
//!
//! The advance phase in tc-sim works as follows:
//!
//! 1. **Intent phase** (parallel): for every alive kernel vehicle, call
//!    `TrafficKernel::advance`.  All reads go through `&StepContext`; no
//!    mutation.
//!
//! 2. **Apply phase** (sequential, ascending id): consume the collected
//!    intents and mutate the `PopulationStore` accordingly.
//!
//! This split means `TrafficKernel` only needs to be `Send + Sync` — it never
//! holds mutable state that could cause data races.

pub mod context;
pub mod cruise;
pub mod error;
pub mod intent;
pub mod kernel;
pub mod noop;


pub use context::StepContext;
pub use cruise::CruiseKernel;
pub use error::{BehaviorError, BehaviorResult};
pub use intent::{Intent, Motion};
pub use kernel::TrafficKernel;
pub use noop::NoopKernel;
