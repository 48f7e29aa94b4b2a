//! Property tests for cursor monotonicity and optimistic volume

use proptest::prelude::*;
use sonos_web_client::store::{clamp_volume, MergeOutcome, OptimisticEdit, StateStore};
use sonos_web_client::transport::{Snapshot, ZoneSection};
use sonos_web_client::zone_model::Zone;
use sonos_web_client::SyncCursor;

fn snapshot(cursor: Option<u64>, volume: u8) -> Snapshot {
    Snapshot {
        cursor: cursor.map(SyncCursor::new),
        zones: Some(ZoneSection::Full(vec![Zone {
            volume,
            ..Zone::new("Kitchen", "Kitchen")
        }])),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn cursor_never_decreases(
        merges in prop::collection::vec((prop::option::of(0u64..1_000), 0u8..=100), 1..40)
    ) {
        let mut store = StateStore::new();
        let mut highest: Option<u64> = None;

        for (cursor, volume) in merges {
            let before = store.cursor();
            let outcome = store.merge(snapshot(cursor, volume)).unwrap();
            let after = store.cursor();

            prop_assert!(after >= before);
            if let Some(c) = cursor {
                highest = Some(highest.map_or(c, |h| h.max(c)));
            }
            prop_assert_eq!(after.map(SyncCursor::value), highest);

            // A stale snapshot leaves the zone alone
            if let MergeOutcome::Stale { .. } = outcome {
                prop_assert!(cursor.is_some());
            }
        }
    }

    #[test]
    fn optimistic_volume_is_clamped_sum(
        start in 0u8..=100,
        step in 1u8..=20,
        presses in prop::collection::vec(any::<bool>(), 0..60)
    ) {
        let mut store = StateStore::new();
        store.merge(snapshot(Some(1), start)).unwrap();

        let mut net: i32 = 0;
        for up in presses {
            let delta = if up { i16::from(step) } else { -i16::from(step) };
            net += i32::from(delta);
            store.apply_optimistic("Kitchen", OptimisticEdit::VolumeStep(delta), "step");

            let expected = clamp_volume(i32::from(start) + net);
            prop_assert_eq!(store.zone("Kitchen").unwrap().volume, expected);
        }
    }
}
