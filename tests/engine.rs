//! End-to-end tests for the traffic engine: streets in, fixes in,
//! speed samples and drop-off statistics out.
//!
//! The fixture geometry runs along meridians near the equator, where one
//! degree of latitude is ~111.2 km, so metric expectations stay easy to
//! derive by hand.

use trafficflow::{Bounds, GpsFix, GpsSegment, Node, RoadNetwork, TrafficEngine, Way};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gps(vehicle_id: &str, secs: f64, lon: f64, lat: f64) -> GpsFix {
    GpsFix::new(vehicle_id, (secs * 1_000_000.0) as i64, lon, lat)
}

/// One 111 m residential way running north from the equator at `lon`,
/// using node ids `base` and `base + 1`.
fn add_meridian_way(network: &mut RoadNetwork, way_id: i64, base: i64, lon: f64) {
    network.add_node(base, Node::new(lon, 0.0));
    network.add_node(base + 1, Node::new(lon, 0.001));
    network.add_way(
        way_id,
        Way::new(vec![base, base + 1]).with_tag("highway", "residential"),
    );
}

fn single_way_network() -> RoadNetwork {
    let mut network = RoadNetwork::new();
    add_meridian_way(&mut network, 10, 1, 0.0);
    network
}

fn oneway_network() -> RoadNetwork {
    let mut network = RoadNetwork::new();
    network.add_node(1, Node::new(0.0, 0.0));
    network.add_node(2, Node::new(0.0, 0.001));
    network.add_way(
        10,
        Way::new(vec![1, 2])
            .with_tag("highway", "residential")
            .with_tag("oneway", "yes"),
    );
    network
}

/// Two parallel 111 m ways ~111 m apart: way 100 at lon 0, way 200 at
/// lon 0.001.
fn two_way_network() -> RoadNetwork {
    let mut network = RoadNetwork::new();
    add_meridian_way(&mut network, 100, 1, 0.0);
    add_meridian_way(&mut network, 200, 3, 0.001);
    network
}

#[test]
fn test_single_vehicle_completes_one_sample() {
    init_logging();
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());
    assert_eq!(engine.triplines().len(), 2);

    // Drive the full way, entering before the first tripline and leaving
    // after the second.
    assert!(engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap().is_empty());
    let samples = engine.update(gps("v1", 5.0, 0.0, 0.00095)).unwrap();

    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.start.tripline.tl_index, 0);
    assert_eq!(sample.end.tripline.tl_index, 1);

    // The triplines sit 10 m from either end of the 111.2 m way, so the
    // sampled stretch is ~91.2 m, crossed in ~4.56 of the 5 seconds.
    let ds = (sample.end.tripline.dist - sample.start.tripline.dist).abs();
    assert!((ds - 91.2).abs() < 0.5, "ds = {ds}");
    assert!((sample.speed - 20.0).abs() < 0.5, "speed = {}", sample.speed);
    assert!(sample.speed > 0.0 && sample.speed <= 31.0);

    assert_eq!(engine.n_trip_events(&engine.triplines()[0]), 1);
    assert_eq!(engine.n_trip_events(&engine.triplines()[1]), 1);
}

#[test]
fn test_stale_fix_pair_is_discarded() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());

    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    // 21 s gap: the chord would cross both triplines but is too old to
    // trust.
    let samples = engine.update(gps("v1", 21.0, 0.0, 0.00095)).unwrap();

    assert!(samples.is_empty());
    assert_eq!(engine.stats().trip_event_total, 0);
    assert_eq!(engine.stats().pending_crossings, 0);
}

#[test]
fn test_stationary_vehicle_is_ignored() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());

    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    let samples = engine.update(gps("v1", 5.0, 0.0, 0.00005)).unwrap();

    assert!(samples.is_empty());
    assert_eq!(engine.stats().trip_event_total, 0);
}

#[test]
fn test_wrong_way_on_oneway_rejected() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&oneway_network());

    // Traverse from the way's last node toward its first.
    engine.update(gps("v1", 0.0, 0.0, 0.00095)).unwrap();
    let samples = engine.update(gps("v1", 5.0, 0.0, 0.00005)).unwrap();

    assert!(samples.is_empty());
    // Both triplines were still crossed.
    assert_eq!(engine.n_trip_events(&engine.triplines()[0]), 1);
    assert_eq!(engine.n_trip_events(&engine.triplines()[1]), 1);
}

#[test]
fn test_right_way_on_oneway_accepted() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&oneway_network());

    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    let samples = engine.update(gps("v1", 5.0, 0.0, 0.00095)).unwrap();

    assert_eq!(samples.len(), 1);
}

#[test]
fn test_drop_off_recorded_when_vehicle_switches_ways() {
    init_logging();
    let mut engine = TrafficEngine::new();
    engine.set_streets(&two_way_network());
    assert_eq!(engine.triplines().len(), 4);

    // Cross the first tripline of way 100, then leave the way unfinished.
    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    assert!(engine.update(gps("v1", 5.0, 0.0, 0.0005)).unwrap().is_empty());

    // Hop across to way 200, crossing its first tripline on the approach.
    assert!(engine.update(gps("v1", 10.0, 0.001, 0.00005)).unwrap().is_empty());

    // Complete a pair on way 200.
    let samples = engine.update(gps("v1", 15.0, 0.001, 0.00095)).unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].start.tripline.way_id, 200);

    // The crossing stranded on way 100 was picked back up on way 200.
    let drop_offs = engine.drop_offs();
    assert_eq!(drop_offs.len(), 1);
    assert_eq!(drop_offs.get(&0).and_then(|p| p.get(&2)), Some(&1));
    assert_eq!(engine.stats().drop_off_total, 1);
}

#[test]
fn test_over_speed_sample_rejected() {
    let mut network = RoadNetwork::new();
    network.add_node(1, Node::new(0.0, 0.0));
    network.add_node(2, Node::new(0.0, 0.002)); // ~222 m
    network.add_way(10, Way::new(vec![1, 2]).with_tag("highway", "residential"));

    let mut engine = TrafficEngine::new();
    engine.set_streets(&network);

    // ~202 m between the triplines in under a second: far beyond any
    // admissible speed, so it must be GPS junk.
    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    let samples = engine.update(gps("v1", 1.0, 0.0, 0.00195)).unwrap();

    assert!(samples.is_empty());
    assert_eq!(engine.stats().trip_event_total, 2);
    // The completing crossing still replaced the pending set.
    assert_eq!(engine.stats().pending_crossings, 1);
}

#[test]
fn test_recrossing_same_tripline_never_accumulates() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());

    // Oscillate back and forth across the first tripline only.
    engine.update(gps("v1", 0.0, 0.0, 0.00005)).unwrap();
    for (i, lat) in [0.0004, 0.00005, 0.0004, 0.00005].iter().enumerate() {
        let samples = engine
            .update(gps("v1", 5.0 * (i + 1) as f64, 0.0, *lat))
            .unwrap();
        assert!(samples.is_empty());
        assert_eq!(engine.stats().pending_crossings, 1);
    }

    assert_eq!(engine.n_trip_events(&engine.triplines()[0]), 4);
    assert!(engine.drop_offs().is_empty());
}

#[test]
fn test_crossings_are_time_ordered() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());

    let segment = GpsSegment::new(
        gps("v1", 0.0, 0.0, 0.00005),
        gps("v1", 5.0, 0.0, 0.00095),
    );
    let crossings = engine.crossings_in_order(&segment);

    assert_eq!(crossings.len(), 2);
    assert!(crossings.windows(2).all(|w| w[0].time_micros <= w[1].time_micros));

    // And in the reverse driving direction the other tripline comes first.
    let reverse = GpsSegment::new(
        gps("v1", 0.0, 0.0, 0.00095),
        gps("v1", 5.0, 0.0, 0.00005),
    );
    let crossings = engine.crossings_in_order(&reverse);
    assert_eq!(crossings[0].tripline.tl_index, 1);
    assert!(crossings.windows(2).all(|w| w[0].time_micros <= w[1].time_micros));
}

#[test]
fn test_identical_streams_produce_identical_samples() {
    let network = two_way_network();
    let fixes = vec![
        gps("a", 0.0, 0.0, 0.00005),
        gps("b", 1.0, 0.001, 0.00095),
        gps("a", 5.0, 0.0, 0.00095),
        gps("b", 6.0, 0.001, 0.00005),
        gps("a", 10.0, 0.001, 0.00005),
        gps("a", 15.0, 0.001, 0.00095),
    ];

    let run = |network: &RoadNetwork| {
        let mut engine = TrafficEngine::with_config(Default::default());
        engine.set_streets(network);
        let mut all = Vec::new();
        for fix in &fixes {
            all.extend(engine.update(fix.clone()).unwrap());
        }
        (all, engine.drop_offs().clone())
    };

    let (samples1, drop_offs1) = run(&network);
    let (samples2, drop_offs2) = run(&network);

    assert_eq!(samples1, samples2);
    assert_eq!(drop_offs1, drop_offs2);
    assert!(samples1.iter().all(|s| s.speed > 0.0 && s.speed <= 31.0));
}

#[test]
fn test_eviction_forgets_vehicle_state() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&single_way_network());

    engine.update(gps("old", 0.0, 0.0, 0.00005)).unwrap();
    engine.update(gps("new", 100.0, 0.0, 0.00005)).unwrap();
    assert_eq!(engine.stats().vehicle_count, 2);

    assert_eq!(engine.evict_vehicles_older_than(50_000_000), 1);
    assert_eq!(engine.stats().vehicle_count, 1);

    // The evicted vehicle starts from scratch: its next fix only primes.
    let samples = engine.update(gps("old", 101.0, 0.0, 0.00095)).unwrap();
    assert!(samples.is_empty());
    assert_eq!(engine.stats().vehicle_count, 2);
}

#[test]
fn test_viewport_query_matches_full_listing() {
    let mut engine = TrafficEngine::new();
    engine.set_streets(&two_way_network());

    let everything = engine.triplines_in(&Bounds {
        min_lat: -1.0,
        max_lat: 1.0,
        min_lng: -1.0,
        max_lng: 1.0,
    });
    assert_eq!(everything.len(), engine.triplines().len());

    // A window around way 100 only.
    let west = engine.triplines_in(&Bounds {
        min_lat: -1.0,
        max_lat: 1.0,
        min_lng: -0.0005,
        max_lng: 0.0005,
    });
    assert_eq!(west.len(), 2);
    assert!(west.iter().all(|tl| tl.way_id == 100));
}
