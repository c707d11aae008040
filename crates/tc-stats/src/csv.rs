//! CSV statistics exporter.
//!
//! Creates two files in the configured output directory:
//! - `road_stats.csv`
//! - `vehicle_trips.csv`
//!
//! A trip's `actual_path` is written as road ids joined by `;`.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::StatsWriter;
use crate::{OutputResult, SimStat};

pub const ROAD_STATS_FILE: &str = "road_stats.csv";
pub const VEHICLE_TRIPS_FILE: &str = "vehicle_trips.csv";

/// Writes statistics snapshots to two CSV files.
pub struct CsvStatsWriter {
    roads:    Writer<File>,
    trips:    Writer<File>,
    finished: bool,
}

impl CsvStatsWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut roads = Writer::from_path(dir.join(ROAD_STATS_FILE))?;
        roads.write_record(["at_ms", "road_id", "vehicle_count", "avg_time_ms", "avg_speed_mps", "length_m"])?;

        let mut trips = Writer::from_path(dir.join(VEHICLE_TRIPS_FILE))?;
        trips.write_record(["at_ms", "vehicle_id", "start_ms", "arrive_ms", "completed", "actual_path"])?;

        Ok(Self { roads, trips, finished: false })
    }
}

impl StatsWriter for CsvStatsWriter {
    fn write_stat(&mut self, stat: &SimStat) -> OutputResult<()> {
        for row in &stat.roads {
            self.roads.write_record(&[
                stat.at_ms.to_string(),
                row.road.0.to_string(),
                row.vehicle_count.to_string(),
                format!("{:.3}", row.avg_time_ms),
                format!("{:.3}", row.avg_speed_mps),
                format!("{:.3}", row.length_m),
            ])?;
        }
        for row in &stat.trips {
            let path: Vec<String> = row.actual_path.iter().map(|r| r.0.to_string()).collect();
            self.trips.write_record(&[
                stat.at_ms.to_string(),
                row.vehicle.0.to_string(),
                row.start_ms.to_string(),
                row.arrive_ms.map(|t| t.to_string()).unwrap_or_default(),
                (row.completed as u8).to_string(),
                path.join(";"),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.roads.flush()?;
        self.trips.flush()?;
        Ok(())
    }
}
