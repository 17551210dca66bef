//! Unit tests for epi-agent.

#[cfg(test)]
mod store {
    use crate::{AgentError, AgentStore, ElementType};

    fn seir_store(capacity: usize) -> AgentStore {
        let mut store = AgentStore::new(capacity);
        store.add_property::<u8>("state", 0).unwrap();
        store.add_property::<u16>("nodeid", 0).unwrap();
        store.add_property::<f32>("susceptibility", 1.0).unwrap();
        store
    }

    #[test]
    fn add_sums_counts_and_respects_capacity() {
        let mut store = seir_store(4);
        let mut expected = 0;
        for n in [1, 3, 0, 7, 2, 40, 5] {
            let range = store.add(n).unwrap();
            assert_eq!(range, expected..expected + n);
            expected += n;
            assert_eq!(store.count(), expected);
            assert!(store.count() <= store.capacity());
        }
    }

    #[test]
    fn every_column_tracks_capacity() {
        let mut store = seir_store(2);
        store.add(9).unwrap();
        for (_, column) in store.properties() {
            assert_eq!(column.len(), store.capacity());
        }
    }

    #[test]
    fn growth_doubles() {
        let mut store = seir_store(10);
        store.add(10).unwrap();
        assert_eq!(store.capacity(), 10);
        store.add(1).unwrap();
        assert_eq!(store.capacity(), 20);
    }

    #[test]
    fn growth_uses_forecast_when_larger() {
        let mut store = seir_store(10);
        store.reserve_forecast(1_000);
        store.add(11).unwrap();
        assert_eq!(store.capacity(), 1_000);
    }

    #[test]
    fn growth_covers_large_requests() {
        let mut store = seir_store(10);
        store.add(55).unwrap();
        assert_eq!(store.capacity(), 55);
    }

    #[test]
    fn growth_preserves_values_and_defaults_new_slots() {
        let mut store = seir_store(2);
        let first = store.add(2).unwrap();
        store.column_mut::<u8>("state").unwrap()[first.clone()].copy_from_slice(&[2, 3]);
        let second = store.add(3).unwrap();

        let state = store.column::<u8>("state").unwrap();
        assert_eq!(&state[first], &[2, 3]);
        assert!(state[second.clone()].iter().all(|&s| s == 0));
        let sus = store.column::<f32>("susceptibility").unwrap();
        assert!(sus[second].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn capacity_error_leaves_store_untouched() {
        let mut store = seir_store(4);
        store.add(3).unwrap();
        let err = store.add(crate::MAX_CAPACITY).unwrap_err();
        assert!(matches!(err, AgentError::Capacity { .. }));
        assert_eq!(store.count(), 3);
        assert_eq!(store.capacity(), 4);
    }

    #[test]
    fn duplicate_property_rejected() {
        let mut store = seir_store(4);
        let err = store.add_property::<u32>("state", 7).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateProperty(name) if name == "state"));
        assert_eq!(store.element_type("state").unwrap(), ElementType::U8);
    }

    #[test]
    fn typed_access_checks_type_and_name() {
        let store = seir_store(4);
        assert!(matches!(
            store.column::<u32>("state"),
            Err(AgentError::TypeMismatch { expected: ElementType::U32, found: ElementType::U8, .. })
        ));
        assert!(matches!(store.column::<u8>("age"), Err(AgentError::UnknownProperty(_))));
    }

    #[test]
    fn column_pair_mut_reads_while_writing() {
        let mut store = seir_store(4);
        store.add(4).unwrap();
        store.column_mut::<u16>("nodeid").unwrap().copy_from_slice(&[0, 1, 1, 2]);
        let (state, node) = store.column_pair_mut::<u8, u16>("state", "nodeid").unwrap();
        for (s, &n) in state.iter_mut().zip(node) {
            *s = n as u8 + 1;
        }
        assert_eq!(store.column::<u8>("state").unwrap(), &[1, 2, 2, 3]);
        assert!(store.column_pair_mut::<u8, u8>("state", "state").is_err());
    }

    #[test]
    fn property_added_after_agents_covers_capacity() {
        let mut store = seir_store(4);
        store.add(3).unwrap();
        store.add_property::<bool>("vaccinated", false).unwrap();
        assert_eq!(store.column::<bool>("vaccinated").unwrap().len(), 3);
    }

    #[test]
    fn truncate_resets_tail() {
        let mut store = seir_store(8);
        store.add(5).unwrap();
        store.column_mut::<u8>("state").unwrap().fill(3);
        store.truncate(2);
        assert_eq!(store.count(), 2);
        assert_eq!(store.capacity(), 8);
        store.add(3).unwrap();
        assert_eq!(store.column::<u8>("state").unwrap(), &[3, 3, 0, 0, 0]);
    }

    #[test]
    fn squash_keeps_order() {
        let mut store = seir_store(8);
        store.add(5).unwrap();
        store.column_mut::<u16>("nodeid").unwrap().copy_from_slice(&[10, 11, 12, 13, 14]);
        let kept = store.squash(&[true, false, true, false, true]).unwrap();
        assert_eq!(kept, 3);
        assert_eq!(store.column::<u16>("nodeid").unwrap(), &[10, 12, 14]);
        assert!(store.squash(&[true]).is_err());
    }

    #[test]
    fn agent_ids_cover_active_range() {
        let mut store = seir_store(8);
        store.add(3).unwrap();
        let ids: Vec<u32> = store.agent_ids().map(|a| a.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}

#[cfg(test)]
mod builder {
    use serde_json::json;

    use epi_core::PropertySet;

    use crate::{AgentError, AgentStoreBuilder};

    #[test]
    fn builds_schema_and_agents() {
        let store = AgentStoreBuilder::new(16)
            .property::<u8>("state", 0)
            .property::<i32>("dob", 0)
            .agents(10)
            .build()
            .unwrap();
        assert_eq!(store.count(), 10);
        assert_eq!(store.capacity(), 16);
        assert_eq!(store.schema().len(), 2);
    }

    #[test]
    fn deferred_duplicate_error() {
        let result = AgentStoreBuilder::new(4)
            .property::<u8>("state", 0)
            .property::<u8>("state", 1)
            .build();
        assert!(matches!(result, Err(AgentError::DuplicateProperty(_))));
    }

    #[test]
    fn from_config_reads_sizing() {
        let params: PropertySet = [
            ("initial_capacity", json!(100)),
            ("forecast_capacity", json!(500)),
        ]
        .into_iter()
        .collect();
        let store = AgentStoreBuilder::from_config(&params).unwrap().build().unwrap();
        assert_eq!(store.capacity(), 100);
        assert_eq!(store.forecast_capacity(), 500);

        let empty = PropertySet::new();
        assert!(matches!(AgentStoreBuilder::from_config(&empty), Err(AgentError::Config(_))));
    }
}

#[cfg(test)]
mod population {
    use std::collections::BTreeMap;

    use indexmap::IndexMap;

    use epi_core::SimRng;

    use crate::{AgentError, AgentStore, StateDistribution};

    #[test]
    fn proportions_map_and_list_agree() {
        let list = StateDistribution::proportions(vec![("A", 0.5), ("B", 0.3), ("C", 0.2)]).unwrap();
        let btree = StateDistribution::proportions(BTreeMap::from([("A", 0.5), ("B", 0.3), ("C", 0.2)])).unwrap();
        let ordered: IndexMap<&str, f64> = [("A", 0.5), ("B", 0.3), ("C", 0.2)].into_iter().collect();
        let ordered = StateDistribution::proportions(ordered).unwrap();

        assert_eq!(list.apportion(100).unwrap(), vec![50, 30, 20]);
        assert_eq!(list, btree);
        assert_eq!(list, ordered);
    }

    #[test]
    fn remainder_goes_to_first_states() {
        let d = StateDistribution::proportions([(0u8, 1.0), (1, 1.0), (2, 1.0)].map(|(s, p)| (s, p / 3.0))).unwrap();
        let counts = d.apportion(100).unwrap();
        assert_eq!(counts, vec![34, 33, 33]);
        assert_eq!(d.apportion(2).unwrap(), vec![1, 1, 0]);
    }

    #[test]
    fn proportions_below_one_are_normalized() {
        let d = StateDistribution::proportions(vec![('S', 0.25), ('I', 0.25)]).unwrap();
        assert_eq!(d.apportion(10).unwrap(), vec![5, 5]);
    }

    #[test]
    fn zero_share_never_gets_remainder() {
        let d = StateDistribution::proportions(vec![('X', 0.0), ('S', 0.5), ('I', 0.5)]).unwrap();
        assert_eq!(d.apportion(7).unwrap(), vec![0, 4, 3]);
    }

    #[test]
    fn invalid_proportions_rejected() {
        assert!(matches!(
            StateDistribution::proportions(vec![('a', 0.7), ('b', 0.5)]),
            Err(AgentError::Distribution(_))
        ));
        assert!(StateDistribution::proportions(vec![('a', -0.1), ('b', 0.5)]).is_err());
        assert!(StateDistribution::proportions(vec![('a', f64::NAN)]).is_err());
        assert!(StateDistribution::<char>::proportions(vec![]).is_err());
    }

    #[test]
    fn counts_must_match_total() {
        let d = StateDistribution::counts(vec![(0u8, 90), (1, 5), (2, 5)]);
        assert_eq!(d.apportion(100).unwrap(), vec![90, 5, 5]);
        assert!(matches!(d.apportion(99), Err(AgentError::Distribution(_))));
    }

    #[test]
    fn overflowing_counts_rejected() {
        let d = StateDistribution::counts(vec![(0u8, u64::MAX), (1, 2)]);
        assert!(matches!(d.apportion(1), Err(AgentError::Distribution(_))));
    }

    #[test]
    fn shuffle_population_permutes_only_the_range() {
        let mut store = AgentStore::new(0);
        store.add_property::<u8>("state", 9).unwrap();
        store.add(1_000).unwrap();
        let d = StateDistribution::counts(vec![(0u8, 400), (1, 400)]);
        store.initialize_population("state", 100..900, &d).unwrap();

        let mut rng = SimRng::new(17);
        store.shuffle_population::<u8>("state", 100..900, &mut rng).unwrap();

        let state = store.column::<u8>("state").unwrap();
        assert!(state[..100].iter().chain(&state[900..]).all(|&s| s == 9));
        let block = &state[100..900];
        assert_eq!(block.iter().filter(|&&s| s == 1).count(), 400);
        // Blocks are broken up: ones now appear in the first half.
        assert!(block[..400].contains(&1));

        let mut again = AgentStore::new(0);
        again.add_property::<u8>("state", 9).unwrap();
        again.add(1_000).unwrap();
        again.initialize_population("state", 100..900, &d).unwrap();
        again.shuffle_population::<u8>("state", 100..900, &mut SimRng::new(17)).unwrap();
        assert_eq!(again.column::<u8>("state").unwrap(), state);
    }

    #[test]
    fn shuffle_population_checks_range() {
        let mut store = AgentStore::new(4);
        store.add_property::<u8>("state", 0).unwrap();
        store.add(4).unwrap();
        assert!(matches!(
            store.shuffle_population::<u8>("state", 2..6, &mut SimRng::new(1)),
            Err(AgentError::OutOfRange { .. })
        ));
    }

    #[test]
    fn initialize_population_writes_blocks() {
        let mut store = AgentStore::new(0);
        store.add_property::<u8>("state", 9).unwrap();
        store.add(12).unwrap();
        let d = StateDistribution::counts(vec![(0u8, 2), (1, 3)]);
        let counts = store.initialize_population("state", 5..10, &d).unwrap();
        assert_eq!(counts, vec![2, 3]);
        assert_eq!(
            store.column::<u8>("state").unwrap(),
            &[9, 9, 9, 9, 9, 0, 0, 1, 1, 1, 9, 9]
        );
    }

    #[test]
    fn initialize_population_rejects_bad_range_untouched() {
        let mut store = AgentStore::new(4);
        store.add_property::<u8>("state", 0).unwrap();
        store.add(4).unwrap();
        let d = StateDistribution::counts(vec![(1u8, 6)]);
        assert!(matches!(
            store.initialize_population("state", 0..6, &d),
            Err(AgentError::OutOfRange { .. })
        ));
        assert!(store.column::<u8>("state").unwrap().iter().all(|&s| s == 0));
    }
}

#[cfg(test)]
mod describe {
    use crate::{AgentStore, SummaryStats};

    #[test]
    fn numeric_and_categorical_summaries() {
        let mut store = AgentStore::new(8);
        store.add_property::<i32>("age", 0).unwrap();
        store.add_property::<bool>("vaccinated", false).unwrap();
        store.add(4).unwrap();
        store.column_mut::<i32>("age").unwrap().copy_from_slice(&[10, 20, 30, 40]);
        store.column_mut::<bool>("vaccinated").unwrap()[1] = true;

        let summary = store.describe();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "age");
        assert_eq!(summary[0].stats, SummaryStats::Numeric { min: 10.0, max: 40.0, mean: 25.0 });
        assert_eq!(summary[1].stats, SummaryStats::Categorical { levels: vec![(0, 3), (1, 1)] });
        // Reserve slots are not part of the statistics.
        assert!(summary.iter().all(|s| s.count == 4));
    }

    #[test]
    fn empty_store() {
        let mut store = AgentStore::new(8);
        store.add_property::<f64>("x", 0.0).unwrap();
        assert_eq!(store.describe()[0].stats, SummaryStats::Empty);
    }
}

#[cfg(test)]
mod snapshot {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::{AgentError, AgentStore};

    fn populated() -> AgentStore {
        let mut store = AgentStore::new(6);
        store.add_property::<u8>("state", 0).unwrap();
        store.add_property::<i64>("dob", -1).unwrap();
        store.add_property::<f64>("weight", 0.5).unwrap();
        store.add_property::<bool>("flag", false).unwrap();
        store.add(5).unwrap();
        store.column_mut::<u8>("state").unwrap().copy_from_slice(&[0, 1, 2, 3, 1]);
        store.column_mut::<i64>("dob").unwrap().copy_from_slice(&[-9000, 12, 0, i64::MIN, i64::MAX]);
        store.column_mut::<f64>("weight").unwrap()[2] = std::f64::consts::PI;
        store.column_mut::<bool>("flag").unwrap()[4] = true;
        store.reserve_forecast(40);
        store
    }

    fn fresh_schema() -> AgentStore {
        let mut store = AgentStore::new(0);
        store.add_property::<u8>("state", 0).unwrap();
        store.add_property::<i64>("dob", -1).unwrap();
        store.add_property::<f64>("weight", 0.5).unwrap();
        store.add_property::<bool>("flag", false).unwrap();
        store
    }

    fn path(dir: &TempDir) -> PathBuf {
        dir.path().join("agents.snap")
    }

    #[test]
    fn round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let original = populated();
        original.save_snapshot(&path(&dir)).unwrap();

        let mut restored = fresh_schema();
        restored.load_snapshot(&path(&dir)).unwrap();

        assert_eq!(restored.count(), original.count());
        assert_eq!(restored.capacity(), original.capacity());
        assert_eq!(restored.column::<u8>("state").unwrap(), original.column::<u8>("state").unwrap());
        assert_eq!(restored.column::<i64>("dob").unwrap(), original.column::<i64>("dob").unwrap());
        let a = restored.column::<f64>("weight").unwrap();
        let b = original.column::<f64>("weight").unwrap();
        assert!(a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits()));
        assert_eq!(restored.column::<bool>("flag").unwrap(), original.column::<bool>("flag").unwrap());
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn save_leaves_neighbouring_tmp_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let neighbour = dir.path().join("agents.tmp");
        std::fs::write(&neighbour, b"not ours").unwrap();

        populated().save_snapshot(&path(&dir)).unwrap();

        assert_eq!(std::fs::read(&neighbour).unwrap(), b"not ours");
        assert_eq!(entries(&dir), vec!["agents.snap", "agents.tmp"]);
    }

    #[test]
    fn failed_save_removes_its_temporary() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the final rename fail.
        std::fs::create_dir(path(&dir)).unwrap();
        std::fs::write(path(&dir).join("keep"), b"x").unwrap();

        assert!(matches!(populated().save_snapshot(&path(&dir)), Err(AgentError::Io(_))));
        assert_eq!(entries(&dir), vec!["agents.snap"]);
    }

    #[test]
    fn capacity_restored_independently_of_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut original = populated();
        assert_eq!((original.count(), original.capacity()), (5, 6));
        original.save_snapshot(&path(&dir)).unwrap();

        let mut restored = fresh_schema();
        restored.load_snapshot(&path(&dir)).unwrap();
        assert_eq!(restored.capacity(), 6);
        assert_eq!(restored.forecast_capacity(), 40);

        // Both stores must make the same growth decision afterwards.
        original.add(2).unwrap();
        restored.add(2).unwrap();
        assert_eq!(original.capacity(), restored.capacity());
        assert_eq!(restored.capacity(), 40);
        // Unissued slots keep the snapshot's defaults.
        assert_eq!(restored.column::<i64>("dob").unwrap()[6], -1);
    }

    #[test]
    fn schema_mismatch_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        populated().save_snapshot(&path(&dir)).unwrap();

        let mut target = AgentStore::new(3);
        target.add_property::<u8>("state", 7).unwrap();
        target.add_property::<i32>("dob", 0).unwrap();
        target.add_property::<f64>("weight", 0.5).unwrap();
        target.add_property::<bool>("flag", false).unwrap();
        target.add(2).unwrap();

        let err = target.load_snapshot(&path(&dir)).unwrap_err();
        assert!(matches!(err, AgentError::SnapshotSchema(_)));
        assert_eq!(target.count(), 2);
        assert_eq!(target.capacity(), 3);
        assert_eq!(target.column::<u8>("state").unwrap(), &[7, 7]);
    }

    #[test]
    fn missing_property_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        populated().save_snapshot(&path(&dir)).unwrap();
        let mut target = AgentStore::new(0);
        target.add_property::<u8>("state", 0).unwrap();
        assert!(matches!(target.load_snapshot(&path(&dir)), Err(AgentError::SnapshotSchema(_))));
    }

    #[test]
    fn corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        populated().save_snapshot(&path(&dir)).unwrap();
        let mut bytes = std::fs::read(path(&dir)).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(path(&dir), &bytes).unwrap();

        let mut target = fresh_schema();
        assert!(matches!(target.load_snapshot(&path(&dir)), Err(AgentError::SnapshotFormat(_))));
        assert_eq!(target.count(), 0);

        std::fs::write(path(&dir), b"not a snapshot").unwrap();
        assert!(matches!(target.load_snapshot(&path(&dir)), Err(AgentError::SnapshotFormat(_))));
    }

    #[test]
    fn from_snapshot_rebuilds_schema() {
        let dir = tempfile::tempdir().unwrap();
        let original = populated();
        original.save_snapshot(&path(&dir)).unwrap();
        let restored = AgentStore::from_snapshot(&path(&dir)).unwrap();
        assert_eq!(restored.schema(), original.schema());
        assert_eq!(restored.column::<u8>("state").unwrap(), &[0, 1, 2, 3, 1]);
    }
}

#[cfg(test)]
mod forecast {
    use epi_core::SimRng;

    use crate::{AgentError, CapacityForecaster, capacity_from_birthrates};

    #[test]
    fn deterministic_given_seed() {
        let f = CapacityForecaster::new(100_000, 0.0005, 0.01, 365).unwrap();
        let a = f.project_path(&mut SimRng::new(3));
        let b = f.project_path(&mut SimRng::new(3));
        assert_eq!(a, b);
        assert_eq!(a.len(), 366);
        assert_eq!(a[0], 100_000.0);
    }

    #[test]
    fn zero_volatility_is_pure_drift() {
        let f = CapacityForecaster::new(1_000, 0.01, 0.0, 100).unwrap();
        let peak = f.project_peak(&mut SimRng::new(0));
        let exact = 1_000.0 * (0.01_f64 * 100.0).exp();
        assert!((peak as f64 - exact.ceil()).abs() <= 1.0, "peak {peak} vs {exact}");
    }

    #[test]
    fn peak_matches_path_maximum() {
        let f = CapacityForecaster::new(20_000, 0.001, 0.03, 500).unwrap();
        let path = f.project_path(&mut SimRng::new(21));
        let max = path.iter().copied().fold(0.0_f64, f64::max);
        assert_eq!(f.project_peak(&mut SimRng::new(21)), max.ceil() as u64);
    }

    #[test]
    fn zero_horizon_peak_is_initial() {
        let f = CapacityForecaster::new(750, 0.5, 0.5, 0).unwrap();
        assert_eq!(f.project_path(&mut SimRng::new(2)), vec![750.0]);
        assert_eq!(f.project_peak(&mut SimRng::new(2)), 750);
    }

    #[test]
    fn capacity_never_below_initial() {
        let f = CapacityForecaster::new(5_000, -0.01, 0.05, 50).unwrap();
        let cap = f.project_capacity(8, 1.0, &mut SimRng::new(11)).unwrap();
        assert!(cap >= 5_000);
    }

    #[test]
    fn more_trials_never_lower_capacity() {
        let f = CapacityForecaster::new(10_000, 0.0002, 0.02, 200).unwrap();
        let one = f.project_capacity(1, 1.0, &mut SimRng::new(5)).unwrap();
        let many = f.project_capacity(16, 1.0, &mut SimRng::new(5)).unwrap();
        assert!(many >= one);
    }

    #[test]
    fn invalid_parameters() {
        assert!(CapacityForecaster::new(1, 0.0, -1.0, 10).is_err());
        assert!(CapacityForecaster::new(1, f64::NAN, 0.0, 10).is_err());
        let f = CapacityForecaster::new(1, 0.0, 0.0, 10).unwrap();
        assert!(f.clone().with_time_step(0.0).is_err());
        assert!(matches!(
            f.project_capacity(0, 1.0, &mut SimRng::new(0)),
            Err(AgentError::InvalidInput(_))
        ));
    }

    #[test]
    fn birthrate_capacity_grows_with_rate_and_safety() {
        const NTICKS: usize = 5 * 365;
        let populations = [10_000u64, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000];
        let mut previous: Option<Vec<u64>> = None;
        for cbr in [5.0, 10.0, 20.0, 25.0, 30.0, 40.0, 50.0] {
            let rates = vec![vec![cbr; populations.len()]; NTICKS];
            let estimate = capacity_from_birthrates(&rates, &populations, 1.0).unwrap();
            assert!(estimate.iter().zip(&populations).all(|(e, p)| e > p));
            if let Some(prev) = &previous {
                assert!(estimate.iter().zip(prev).all(|(e, p)| e > p));
            }
            let safer = capacity_from_birthrates(&rates, &populations, 2.0).unwrap();
            assert!(safer.iter().zip(&estimate).all(|(s, e)| s > e));
            previous = Some(estimate);
        }
    }

    #[test]
    fn birthrate_shape_checked() {
        let rates = vec![vec![10.0, 10.0], vec![10.0]];
        assert!(capacity_from_birthrates(&rates, &[100, 100], 1.0).is_err());
    }
}
