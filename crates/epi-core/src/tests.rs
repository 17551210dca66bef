//! Unit tests for epi-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(NodeId::default(), NodeId::INVALID);
        assert_eq!(NodeId::INVALID.0, u32::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::{DistanceMetric, GeoPoint};

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(40.786944, -119.204167);
        assert!(p.distance_km(p) < 1e-9);
        assert_eq!(p.planar_distance(p), 0.0);
    }

    #[test]
    fn one_degree_latitude() {
        let a = GeoPoint::new(30.0, -88.0);
        let b = GeoPoint::new(31.0, -88.0);
        let d = a.distance_km(b);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn planar_is_pythagorean() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(4.0, 3.0);
        assert!((DistanceMetric::Euclidean.distance(a, b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn validity() {
        assert!(GeoPoint::new(25.0, -125.0).is_valid());
        assert!(!GeoPoint::new(95.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}

#[cfg(test)]
mod time {
    use crate::Tick;

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(15).since(Tick(10)), 5);
    }

    #[test]
    fn years() {
        assert_eq!(Tick::from_years(2), Tick(730));
        assert_eq!(Tick(729).whole_years(), 1);
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = SimRng::new(12345);
        let mut r2 = SimRng::new(12345);
        for _ in 0..100 {
            assert_eq!(r1.uniform(), r2.uniform());
            assert_eq!(r1.standard_normal(), r2.standard_normal());
        }
    }

    #[test]
    fn children_are_deterministic_and_distinct() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        let mut a0 = a.child(0);
        let mut a1 = a.child(1);
        let mut b0 = b.child(0);
        let x: u64 = a0.random();
        assert_eq!(x, b0.random::<u64>());
        assert_ne!(x, a1.random::<u64>());
    }

    #[test]
    fn standard_normal_moments() {
        let mut rng = SimRng::new(99);
        let n = 50_000;
        let draws: Vec<f64> = (0..n).map(|_| rng.standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((var - 1.0).abs() < 0.03, "var {var}");
    }

    #[test]
    fn uniform_in_unit_interval() {
        let mut rng = SimRng::new(0);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }
}

#[cfg(test)]
mod config {
    use serde_json::json;

    use crate::{EpiError, MergePolicy, PropertySet};

    fn base() -> PropertySet {
        let mut p = PropertySet::new();
        p.add("nticks", json!(365)).unwrap();
        p.add("beta", json!(0.3)).unwrap();
        p
    }

    #[test]
    fn add_rejects_existing_key() {
        let mut p = base();
        let err = p.add("beta", json!(0.5)).unwrap_err();
        assert!(matches!(err, EpiError::DuplicateKey(k) if k == "beta"));
        assert_eq!(p.get_as::<f64>("beta").unwrap(), 0.3);
    }

    #[test]
    fn update_rejects_missing_key() {
        let mut p = base();
        assert!(matches!(p.update("gamma", json!(0.1)), Err(EpiError::MissingKey(_))));
        p.update("beta", json!(0.4)).unwrap();
        assert_eq!(p.get_as::<f64>("beta").unwrap(), 0.4);
    }

    #[test]
    fn merge_add_only_is_all_or_nothing() {
        let mut p = base();
        let other: PropertySet = [("gamma", json!(0.1)), ("beta", json!(9.0))].into_iter().collect();
        assert!(matches!(p.merge(&other, MergePolicy::AddOnly), Err(EpiError::DuplicateKey(_))));
        assert!(!p.contains("gamma"), "failed merge must not write any key");
    }

    #[test]
    fn merge_update_only() {
        let mut p = base();
        let other: PropertySet = [("nticks", json!(730))].into_iter().collect();
        p.merge(&other, MergePolicy::UpdateOnly).unwrap();
        assert_eq!(p.get_as::<u64>("nticks").unwrap(), 730);

        let bad: PropertySet = [("typo", json!(1))].into_iter().collect();
        assert!(matches!(p.merge(&bad, MergePolicy::UpdateOnly), Err(EpiError::MissingKey(_))));
    }

    #[test]
    fn merge_add_or_update_keeps_order() {
        let mut p = base();
        let other: PropertySet = [("gamma", json!(0.1)), ("nticks", json!(10))].into_iter().collect();
        p.merge(&other, MergePolicy::AddOrUpdate).unwrap();
        let keys: Vec<&str> = p.keys().collect();
        assert_eq!(keys, ["nticks", "beta", "gamma"]);
        assert_eq!(p.get_as::<u64>("nticks").unwrap(), 10);
    }

    #[test]
    fn get_as_type_mismatch() {
        let p = base();
        assert!(matches!(p.get_as::<String>("beta"), Err(EpiError::InvalidValue { .. })));
        assert_eq!(p.get_or("missing", 5u32).unwrap(), 5);
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let p = PropertySet::from_json_str(r#"{"z": 1, "a": [1.0, 2.0], "m": "x"}"#).unwrap();
        p.save_json(&path).unwrap();
        let q = PropertySet::load_json(&path).unwrap();
        assert_eq!(q.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
        assert_eq!(q.get_as::<Vec<f64>>("a").unwrap(), vec![1.0, 2.0]);
        assert_eq!(p, q);
    }
}
