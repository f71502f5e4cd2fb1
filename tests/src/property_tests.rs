//! Property-Based Tests for the Consent Ledger
//!
//! Randomized checks of the laws the ledger promises:
//! - grant lists only grow, one entry per category per update
//! - a provider without a grant never sees a populated category
//! - composite index keys split back into what built them
//!
//! Uses proptest for randomized property testing with shrinking.

#[cfg(test)]
mod proptest_tests {
    use crate::harness::Harness;
    use chrono::NaiveDate;
    use mycelix_ledger_shared::identity::CallerAttributes;
    use mycelix_ledger_shared::index::{build_composite_key, split_composite_key};
    use mycelix_ledger_shared::store::{Partition, StoreExt};
    use proptest::prelude::*;
    use records_integrity::{CategoryKind, PatientDetails};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn seeded() -> Harness {
        let mut h = Harness::new(start());
        h.register_provider("dr0", "greg", "house");
        h.register_provider("dr1", "lisa", "cuddy");
        h.register_provider("dr2", "james", "wilson");
        h.register_patient("dr0", "p1", "111");
        h
    }

    fn dual_org(h: &Harness) -> Option<PatientDetails> {
        h.ledger
            .store()
            .get_json(Partition::DualOrg, "p1", 256)
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Every accepted update adds exactly one grant to every category
        #[test]
        fn grant_lists_grow_by_one_per_update(
            updates in proptest::collection::vec((0usize..3, 0u64..60, 0u64..60), 1..6)
        ) {
            let mut h = seeded();
            let mut expected = 1;
            for (who, offset, length) in updates {
                let from = h.day(offset);
                let to = h.day(offset + length);
                let response = h.grant("p1", &format!("dr{}", who), from, to);
                prop_assert!(response.is_success());
                expected += 1;

                let details = dual_org(&h).unwrap();
                for kind in CategoryKind::ALL {
                    prop_assert_eq!(details.grant_count(kind), expected);
                }
            }
        }

        /// Rejected updates leave the stored bundle untouched
        #[test]
        fn rejected_updates_do_not_write(offset in 1u64..60) {
            let mut h = seeded();
            let (from, to) = (h.day(0), h.day(10));
            prop_assert!(h.grant("p1", "dr1", from, to).is_success());
            let before = dual_org(&h);

            // end before start
            let (from, to) = (h.day(offset), h.day(0));
            prop_assert!(!h.grant("p1", "dr1", from, to).is_success());
            // unregistered provider
            let (from, to) = (h.day(0), h.day(offset));
            prop_assert!(!h.grant("p1", "dr9", from, to).is_success());

            prop_assert_eq!(dual_org(&h), before);
        }

        /// A provider holding no grant sees zero values on every day
        #[test]
        fn stranger_sees_nothing(day in 0u64..800) {
            let mut h = seeded();
            let (from, to) = (h.day(0), h.day(30));
            prop_assert!(h.grant("p1", "dr1", from, to).is_success());

            h.today = h.day(day);
            let stranger = CallerAttributes::provider("dr2");
            let records = h.read_by_ssn(&stranger, "111");
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(&records[0].record, &PatientDetails::default());
        }

        /// Visibility flips exactly at the window edges
        #[test]
        fn granted_provider_sees_inside_window_only(
            offset in 0u64..100,
            length in 0u64..100,
            day in 0u64..250,
        ) {
            let mut h = seeded();
            let (from, to) = (h.day(offset), h.day(offset + length));
            prop_assert!(h.grant("p1", "dr1", from, to).is_success());

            h.today = h.day(day);
            let dr1 = CallerAttributes::provider("dr1");
            let records = h.read_by_ssn(&dr1, "111");
            let inside = offset <= day && day <= offset + length;
            prop_assert_eq!(records[0].record != PatientDetails::default(), inside);
        }

        /// Index keys split back into their name and fields
        #[test]
        fn composite_keys_round_trip(
            first in "[a-z' -]{1,12}",
            last in "[a-z' -]{1,12}",
            id in "[a-z0-9]{1,8}",
        ) {
            let key = build_composite_key("patient~fname~lname", &[&first, &last, &id]).unwrap();
            let (name, fields) = split_composite_key(&key).unwrap();
            prop_assert_eq!(name, "patient~fname~lname");
            prop_assert_eq!(fields, vec![first, last, id]);
        }
    }
}
