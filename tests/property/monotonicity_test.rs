//! Property-based tests for `out_of_date_local`'s monotonicity in engine_view.

use fleetmodeld::core::record::{
    out_of_date_local, EngineView, LocalRecord, Record, RecordKey, ServingRecord, ServingStatus,
};
use proptest::prelude::*;
use std::path::PathBuf;

fn local_record(version: u64) -> LocalRecord {
    let key = RecordKey::new("tensorflow", "A");
    LocalRecord {
        record: Record::new(key, version),
        local_path: PathBuf::from("/models/tensorflow/A").join(version.to_string()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    /// An empty engine_view never marks a local record out of date, and
    /// adding an AVAILABLE version strictly above `local.version` always
    /// does — `out_of_date_local` only ever moves false -> true as the
    /// engine_view grows, never true -> false.
    #[test]
    fn growing_engine_view_only_moves_false_to_true(
        local_version in 1u64..1000,
        bump in 1u64..50,
    ) {
        let local = local_record(local_version);
        let key = local.record.key.clone();

        let empty_view: EngineView = EngineView::new();
        prop_assert!(!out_of_date_local(&local, &empty_view));

        let mut grown_view: EngineView = EngineView::new();
        grown_view.insert(
            key.clone(),
            vec![ServingRecord {
                record: Record::new(key, local_version + bump),
                status: ServingStatus::Available,
            }],
        );
        prop_assert!(out_of_date_local(&local, &grown_view));
    }

    /// Once a local record is out of date against some AVAILABLE max
    /// version, adding a further, even-higher AVAILABLE version never
    /// reverses that — the set of reported versions only ever grows
    /// within one pass.
    #[test]
    fn raising_the_available_max_further_keeps_it_out_of_date(
        local_version in 1u64..1000,
        first_bump in 1u64..50,
        second_bump in 0u64..50,
    ) {
        let local = local_record(local_version);
        let key = local.record.key.clone();

        let mut view: EngineView = EngineView::new();
        view.insert(
            key.clone(),
            vec![ServingRecord {
                record: Record::new(key.clone(), local_version + first_bump),
                status: ServingStatus::Available,
            }],
        );
        prop_assert!(out_of_date_local(&local, &view));

        view.get_mut(&key).unwrap().push(ServingRecord {
            record: Record::new(key.clone(), local_version + first_bump + second_bump),
            status: ServingStatus::Available,
        });
        prop_assert!(out_of_date_local(&local, &view));
    }

    /// A non-AVAILABLE status at a higher version never makes a local
    /// record out of date by itself.
    #[test]
    fn non_available_statuses_never_trigger_out_of_date(
        local_version in 1u64..1000,
        bump in 1u64..50,
    ) {
        let local = local_record(local_version);
        let key = local.record.key.clone();

        let mut view: EngineView = EngineView::new();
        view.insert(
            key,
            vec![ServingRecord {
                record: Record::new(local.record.key.clone(), local_version + bump),
                status: ServingStatus::Loading,
            }],
        );
        prop_assert!(!out_of_date_local(&local, &view));
    }
}
