//! Property tests for round-trips, atomic batches and snapshot isolation.

use kvbridge_core::{ReadOptions, WriteOptions};
use kvbridge_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn put_get_round_trip(key in key_strategy(), value in value_strategy()) {
        with_temp_db(|db| {
            db.put(WriteOptions::default(), &key, &value).unwrap();
            prop_assert_eq!(db.get(ReadOptions::default(), &key).unwrap(), Some(value.clone()));

            db.delete(WriteOptions::default(), &key).unwrap();
            prop_assert_eq!(db.get(ReadOptions::default(), &key).unwrap(), None);
            Ok(())
        })?;
    }

    #[test]
    fn unwritten_keys_are_absent(written in key_strategy(), probe in key_strategy()) {
        prop_assume!(written != probe);
        with_temp_db(|db| {
            db.put(WriteOptions::default(), &written, b"v").unwrap();
            prop_assert_eq!(db.get(ReadOptions::default(), &probe).unwrap(), None);
            Ok(())
        })?;
    }

    #[test]
    fn batch_matches_model(
        setup in op_sequence_strategy(0, 16),
        ops in op_sequence_strategy(1, 32),
    ) {
        with_temp_db(|db| {
            let mut model = BTreeMap::new();
            apply_to_model(&mut model, &setup);
            db.write(WriteOptions::default(), &batch_from(&setup)).unwrap();

            apply_to_model(&mut model, &ops);
            db.write(WriteOptions::default(), &batch_from(&ops)).unwrap();

            let mut iter = db.new_iterator(ReadOptions::default()).unwrap();
            let scanned: BTreeMap<_, _> = iter.entries().map(|e| e.unwrap()).collect();
            prop_assert_eq!(scanned, model);
            Ok(())
        })?;
    }

    #[test]
    fn snapshot_sees_only_earlier_writes(
        before in op_sequence_strategy(0, 16),
        after in op_sequence_strategy(1, 16),
    ) {
        with_temp_db(|db| {
            let mut model = BTreeMap::new();
            apply_to_model(&mut model, &before);
            db.write(WriteOptions::default(), &batch_from(&before)).unwrap();

            let snapshot = db.snapshot().unwrap();
            db.write(WriteOptions::default(), &batch_from(&after)).unwrap();

            for op in before.iter().chain(after.iter()) {
                let key = match op {
                    KvOp::Put { key, .. } | KvOp::Delete { key } => key,
                };
                prop_assert_eq!(
                    db.get(ReadOptions::at(&snapshot), key).unwrap(),
                    model.get(key).cloned()
                );
            }
            db.release_snapshot(snapshot).unwrap();
            Ok(())
        })?;
    }

    #[test]
    fn reverse_scan_is_descending(ops in op_sequence_strategy(0, 24)) {
        with_temp_db(|db| {
            db.write(WriteOptions::default(), &batch_from(&ops)).unwrap();

            let mut iter = db.new_iterator(ReadOptions::default()).unwrap();
            iter.seek_to_last().unwrap();
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key().unwrap().to_vec());
                iter.prev().unwrap();
            }
            let mut expected = BTreeMap::new();
            apply_to_model(&mut expected, &ops);
            let expected: Vec<_> = expected.into_keys().rev().collect();
            prop_assert_eq!(keys, expected);
            Ok(())
        })?;
    }
}
