//! Unit tests for tc-stats.

#[cfg(test)]
mod recorder_tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use tc_core::{RoadId, VehicleId};
    use tc_spatial::RoadTable;

    use crate::{RoadTravelTime, TrafficRecorder};

    fn recorder() -> TrafficRecorder {
        let roads: RoadTable = [(RoadId(1), 100.0), (RoadId(2), 200.0)].into_iter().collect();
        TrafficRecorder::new(Arc::new(roads))
    }

    fn v(id: u64) -> VehicleId {
        VehicleId(id)
    }

    #[test]
    fn first_sighting_starts_trip() {
        let mut r = recorder();
        r.record_step(1_000, [(v(1), Some(RoadId(1)))]);
        let trip = r.trip(v(1)).unwrap();
        assert_eq!(trip.start_ms, 1_000);
        assert_eq!(trip.arrive_ms, None);
        assert_eq!(trip.actual_path, vec![RoadId(1)]);
    }

    #[test]
    fn path_appends_only_on_change() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1)))]);
        r.record_step(100, [(v(1), Some(RoadId(1)))]);
        r.record_step(200, [(v(1), None)]);
        r.record_step(300, [(v(1), Some(RoadId(2)))]);
        let trip = r.trip(v(1)).unwrap();
        assert_eq!(trip.arrive_ms, Some(300));
        assert_eq!(trip.actual_path, vec![RoadId(1), RoadId(2)]);
    }

    #[test]
    fn road_change_folds_travel_time() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1)))]);
        r.record_step(10_000, [(v(1), Some(RoadId(2)))]);
        let stat = r.road(RoadId(1)).unwrap();
        assert_eq!(stat.pass_count, 1);
        assert_eq!(stat.average_ms, 10_000.0);
        assert_eq!(stat.avg_speed_mps(), 10.0);
        assert!(r.road(RoadId(2)).is_none());
    }

    #[test]
    fn incremental_mean() {
        let mut t = RoadTravelTime::first(100.0, 4_000.0);
        t.fold(8_000.0);
        t.fold(12_000.0);
        assert_eq!(t.pass_count, 3);
        assert!((t.average_ms - 8_000.0).abs() < 1e-9);

        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1))), (v(2), Some(RoadId(1)))]);
        r.record_step(2_000, [(v(1), Some(RoadId(2))), (v(2), Some(RoadId(1)))]);
        r.record_step(6_000, [(v(1), Some(RoadId(2))), (v(2), Some(RoadId(2)))]);
        let stat = r.road(RoadId(1)).unwrap();
        assert_eq!(stat.pass_count, 2);
        assert_eq!(stat.average_ms, 4_000.0);
    }

    #[test]
    fn unknown_roads_are_not_tracked() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(99)))]);
        r.record_step(5_000, [(v(1), Some(RoadId(1)))]);
        assert!(r.road(RoadId(99)).is_none());
        // The trip still records the road.
        assert_eq!(r.trip(v(1)).unwrap().actual_path, vec![RoadId(99), RoadId(1)]);
    }

    #[test]
    fn final_times_include_finished_vehicles_without_mutating() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1))), (v(2), Some(RoadId(1)))]);
        r.record_step(3_000, [(v(1), Some(RoadId(2))), (v(2), Some(RoadId(1)))]);
        r.record_step(5_000, [(v(1), Some(RoadId(2))), (v(2), Some(RoadId(1)))]);

        // Vehicle 1 left the population; vehicle 2 is still driving.
        let present: BTreeSet<VehicleId> = [v(2)].into_iter().collect();
        let finals = r.final_road_travel_times(&present);
        assert_eq!(finals[&RoadId(1)].pass_count, 1);
        assert_eq!(finals[&RoadId(2)].pass_count, 1);
        assert_eq!(finals[&RoadId(2)].average_ms, 2_000.0);

        assert!(r.road(RoadId(2)).is_none());
        assert_eq!(r.final_road_travel_times(&present), finals);
    }

    #[test]
    fn sim_stat_rows() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1))), (v(2), Some(RoadId(2)))]);
        r.record_step(10_000, [(v(1), Some(RoadId(2))), (v(2), Some(RoadId(2)))]);

        let present: BTreeSet<VehicleId> = [v(2)].into_iter().collect();
        let stat = r.sim_stat(&present, 10_000);
        assert_eq!(stat.at_ms, 10_000);
        assert_eq!(stat.roads.len(), 2);
        assert_eq!(stat.roads[0].road, RoadId(1));
        assert_eq!(stat.roads[0].avg_speed_mps, 10.0);
        assert_eq!(stat.trips.iter().map(|t| t.completed).collect::<Vec<_>>(), vec![true, false]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut r = recorder();
        r.record_step(0, [(v(1), Some(RoadId(1)))]);
        r.record_step(1_000, [(v(1), Some(RoadId(2)))]);
        r.clear();
        assert_eq!(r.vehicle_count(), 0);
        assert!(r.road(RoadId(1)).is_none());
        assert!(r.sim_stat(&BTreeSet::new(), 0).roads.is_empty());
    }
}

#[cfg(test)]
mod observer_tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tc_behavior::CruiseKernel;
    use tc_core::{GeoPoint, MapRange, RoadId, VehicleId};
    use tc_sim::{DEFAULT_MAX_ERROR_DISTANCE, ManagerConfig, TrafficManager};
    use tc_spatial::{RoadMap, RoadTable};
    use tc_vehicle::{IncomingRecord, Kinematics, VehicleState, VehicleType};

    use crate::{StatsObserver, TrafficRecorder};

    #[test]
    fn records_every_step_of_a_manager() {
        // 10 m/s over a 15 m road, then a long one.
        let roads: RoadTable = [(RoadId(1), 15.0), (RoadId(2), 10_000.0)].into_iter().collect();
        let map: Arc<dyn RoadMap> = Arc::new(roads);

        let manager = TrafficManager::new(CruiseKernel, Arc::clone(&map));
        let config = ManagerConfig {
            time_step_s: 1.0,
            num_threads: Some(1),
            regions:     vec![MapRange::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0))],
            ..ManagerConfig::default()
        };
        assert!(manager.init(config).is_succ());

        let recorder = Arc::new(Mutex::new(TrafficRecorder::new(map)));
        manager.add_observer(Box::new(StatsObserver::new(Arc::clone(&recorder))));

        let state = VehicleState {
            id:            VehicleId(1),
            position:      GeoPoint::new(0.5, 0.5),
            kinematics:    Kinematics { speed_mps: 10.0, ..Kinematics::default() },
            route:         vec![RoadId(1), RoadId(2)],
            road_idx:      0,
            road_offset_m: 0.0,
            lane_id:       1,
            vehicle_type:  VehicleType::Car,
        };
        manager.reset_traffic_info(0, vec![IncomingRecord::Full(state)], DEFAULT_MAX_ERROR_DISTANCE);
        for _ in 0..3 {
            assert!(manager.step_relative(1.0).is_succ());
        }

        // Seen on road 1 at 1 s, road 2 from 2 s.
        let r = recorder.lock();
        let trip = r.trip(VehicleId(1)).unwrap();
        assert_eq!(trip.start_ms, 1_000);
        assert_eq!(trip.arrive_ms, Some(3_000));
        assert_eq!(trip.actual_path, vec![RoadId(1), RoadId(2)]);
        assert_eq!(r.road(RoadId(1)).unwrap().average_ms, 1_000.0);

        let present: BTreeSet<VehicleId> = [VehicleId(1)].into_iter().collect();
        assert!(!r.sim_stat(&present, 3_000).trips[0].completed);
    }
}

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use tc_core::{RoadId, VehicleId};

    use crate::csv::{CsvStatsWriter, ROAD_STATS_FILE, VEHICLE_TRIPS_FILE};
    use crate::writer::StatsWriter;
    use crate::{RoadStat, SimStat, TripStat};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn stat() -> SimStat {
        SimStat {
            at_ms: 5_000,
            roads: vec![RoadStat {
                road:          RoadId(7),
                vehicle_count: 2,
                avg_time_ms:   4_000.0,
                avg_speed_mps: 25.0,
                length_m:      100.0,
            }],
            trips: vec![
                TripStat {
                    vehicle:     VehicleId(1),
                    start_ms:    0,
                    arrive_ms:   Some(5_000),
                    completed:   true,
                    actual_path: vec![RoadId(7), RoadId(8)],
                },
                TripStat {
                    vehicle:     VehicleId(2),
                    start_ms:    1_000,
                    arrive_ms:   None,
                    completed:   false,
                    actual_path: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _w = CsvStatsWriter::new(dir.path()).unwrap();
        assert!(dir.path().join(ROAD_STATS_FILE).exists());
        assert!(dir.path().join(VEHICLE_TRIPS_FILE).exists());
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvStatsWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(ROAD_STATS_FILE)).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, ["at_ms", "road_id", "vehicle_count", "avg_time_ms", "avg_speed_mps", "length_m"]);

        let mut rdr = csv::Reader::from_path(dir.path().join(VEHICLE_TRIPS_FILE)).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, ["at_ms", "vehicle_id", "start_ms", "arrive_ms", "completed", "actual_path"]);
    }

    #[test]
    fn csv_rows_written() {
        let dir = tmp();
        let mut w = CsvStatsWriter::new(dir.path()).unwrap();
        w.write_stat(&stat()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap(); // idempotent

        let mut rdr = csv::Reader::from_path(dir.path().join(ROAD_STATS_FILE)).unwrap();
        let roads: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(roads.len(), 1);
        assert_eq!(&roads[0][1], "7");
        assert_eq!(&roads[0][4], "25.000");

        let mut rdr = csv::Reader::from_path(dir.path().join(VEHICLE_TRIPS_FILE)).unwrap();
        let trips: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(trips.len(), 2);
        assert_eq!(&trips[0][5], "7;8");
        assert_eq!(&trips[0][4], "1");
        assert_eq!(&trips[1][3], "");
        assert_eq!(&trips[1][4], "0");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tmp();
        assert!(CsvStatsWriter::new(&dir.path().join("missing")).is_err());
    }
}
