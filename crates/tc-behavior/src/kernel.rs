//! The `TrafficKernel` trait — the main extension point for host code.

use tc_vehicle::VehicleRecord;

use crate::{BehaviorResult, Intent, StepContext};

/// Pluggable car-following / lane-change model.
///
/// The manager owns vehicle state and ownership; the kernel only decides how
/// each kernel vehicle moves over one step.  Edge vehicles are never passed
/// to a kernel.
///
/// # Thread safety
///
/// The step controller may call `advance` for many vehicles in parallel via
/// Rayon, so implementations must be `Send + Sync`.  Per-vehicle state must
/// live in the `VehicleRecord` (visible read-only through `ctx.population`),
/// not in the kernel itself.
///
/// # Errors
///
/// A failed `advance` is logged by the caller and the vehicle is left
/// unchanged for this step; it never aborts the step.
///
/// # Example
///
/// ```rust,ignore
/// struct StopAtRedLights { /* signal plan */ }
///
/// impl TrafficKernel for StopAtRedLights {
///     fn advance(&self, vehicle: &VehicleRecord, ctx: &StepContext<'_>) -> BehaviorResult<Intent> {
///         if self.is_red(vehicle.current_road(), ctx.time.abs_time_ms) {
///             return Ok(Intent::Stay);
///         }
///         CruiseKernel.advance(vehicle, ctx)
///     }
/// }
/// ```
pub trait TrafficKernel: Send + Sync + 'static {
    /// Advance `vehicle` by `ctx.time.delta_s` seconds.
    fn advance(&self, vehicle: &VehicleRecord, ctx: &StepContext<'_>) -> BehaviorResult<Intent>;

    /// Called after a vehicle enters the kernel set (handoff promotion or
    /// spawn).  Default: nothing.
    fn on_vehicle_added(&self, _vehicle: &VehicleRecord) {}

    /// Called after a kernel vehicle is killed or despawned.  Default: nothing.
    fn on_vehicle_removed(&self, _vehicle: &VehicleRecord) {}
}
