//! `tc-stats` — traffic statistics for the traffic-cloud manager.
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`recorder`] | `TrafficRecorder` — per-road mean travel time, per-vehicle trip |
//! | [`observer`] | `StatsObserver` — feeds the recorder from `StepObserver`       |
//! | [`stat`]     | `RoadTravelTime`, `VehicleTrip`, `SimStat` rows               |
//! | [`writer`]   | `StatsWriter` trait                                           |
//! | [`csv`]      | `CsvStatsWriter` → `road_stats.csv`, `vehicle_trips.csv`      |
//!
//! # Usage
//!
//! ```rust,ignore
//! use tc_stats::{CsvStatsWriter, StatsObserver, StatsWriter, TrafficRecorder};
//!
//! let recorder = Arc::new(Mutex::new(TrafficRecorder::new(map.clone())));
//! manager.add_observer(Box::new(StatsObserver::new(Arc::clone(&recorder))));
//! // … run …
//! let mut writer = CsvStatsWriter::new(Path::new("./output"))?;
//! writer.write_stat(&recorder.lock().sim_stat(&present, now_ms))?;
//! writer.finish()?;
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod recorder;
pub mod stat;
pub mod writer;

#[cfg(test)]
mod tests;

pub use csv::CsvStatsWriter;
pub use error::{OutputError, OutputResult};
pub use observer::StatsObserver;
pub use recorder::TrafficRecorder;
pub use stat::{RoadStat, RoadTravelTime, SimStat, TripStat, VehicleTrip};
pub use writer::StatsWriter;
