//! `StatsObserver` — feeds a shared `TrafficRecorder` from the manager's
//! step hook.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tc_core::TimeParams;
use tc_sim::{StepObserver, StepReport};
use tc_vehicle::PopulationStore;

use crate::TrafficRecorder;

/// A [`StepObserver`] that records the kernel population after every step.
///
/// The recorder is shared so the host can query it while the manager owns
/// the observer:
///
/// ```rust,ignore
/// let recorder = Arc::new(Mutex::new(TrafficRecorder::new(map.clone())));
/// manager.add_observer(Box::new(StatsObserver::new(Arc::clone(&recorder))));
/// // … steps …
/// let stat = recorder.lock().sim_stat(&present, now_ms);
/// ```
pub struct StatsObserver {
    recorder: Arc<Mutex<TrafficRecorder>>,
}

impl StatsObserver {
    pub fn new(recorder: Arc<Mutex<TrafficRecorder>>) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> &Arc<Mutex<TrafficRecorder>> {
        &self.recorder
    }
}

impl StepObserver for StatsObserver {
    fn on_step_end(&mut self, report: &StepReport, store: &PopulationStore) {
        self.recorder.lock().record_population(report.time.abs_time_ms, store);
    }

    fn on_release(&mut self, time: &TimeParams) {
        debug!(vehicles = self.recorder.lock().vehicle_count(), %time, "statistics recorder detached");
    }
}
