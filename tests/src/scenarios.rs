//! End-to-End Consent Scenarios
//!
//! Register, grant and read through the operation surface, checking what
//! each caller sees on a given day.

#[cfg(test)]
mod tests {
    use crate::harness::{args, expect_error, Harness};
    use chrono::NaiveDate;
    use mycelix_ledger_shared::identity::CallerAttributes;
    use mycelix_ledger_shared::store::{Partition, StoreExt};
    use mycelix_ledger_shared::ErrorKind;
    use records_integrity::{CategoryKind, PatientDetails};
    use serde_json::{json, Value};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    /// p1 registered by dr1 today; dr1's registration grant published to the
    /// dual-org copy alongside a 30-day grant for dr2.
    fn clinic() -> Harness {
        let mut h = Harness::new(start());
        assert!(h.register_provider("dr1", "greg", "house").is_success());
        assert!(h.register_provider("dr2", "lisa", "cuddy").is_success());
        assert!(h.register_patient("dr1", "p1", "111-22-3333").is_success());
        let (from, to) = (h.day(0), h.day(30));
        assert!(h.grant("p1", "dr2", from, to).is_success());
        h
    }

    #[test]
    fn registered_provider_sees_everything_within_a_year() {
        let mut h = clinic();
        h.today = h.day(10);
        let dr1 = CallerAttributes::provider("dr1");
        let records = h.read_by_ssn(&dr1, "111-22-3333");

        assert_eq!(records.len(), 1);
        for kind in CategoryKind::ALL {
            let category = records[0].record.category(kind);
            assert_eq!(category.doc_type, kind.doc_type());
            assert_eq!(category.patient.patient_id.as_str(), "p1");
            assert_eq!(category.provider_consent.len(), 2);
        }
    }

    #[test]
    fn unrelated_provider_sees_zero_values() {
        let mut h = clinic();
        h.register_provider("dr3", "james", "wilson");
        h.today = h.day(10);
        let dr3 = CallerAttributes::provider("dr3");
        let records = h.read_by_ssn(&dr3, "111-22-3333");
        assert_eq!(records[0].key, "p1");
        assert_eq!(records[0].record, PatientDetails::default());
    }

    #[test]
    fn expired_registration_grant_hides_everything() {
        let mut h = clinic();
        h.today = h.day(400);
        let dr1 = CallerAttributes::provider("dr1");
        let records = h.read_by_ssn(&dr1, "111-22-3333");
        assert_eq!(records[0].record, PatientDetails::default());
    }

    #[test]
    fn short_grant_expires_independently() {
        let mut h = clinic();
        let dr2 = CallerAttributes::provider("dr2");

        h.today = h.day(30);
        let visible = h.read_by_ssn(&dr2, "111-22-3333");
        assert_eq!(visible[0].record.grant_count(CategoryKind::Allergies), 2);

        h.today = h.day(1);
        let hidden = h.read_by_ssn(&dr2, "111-22-3333");
        assert_eq!(hidden[0].record, PatientDetails::default());

        // dr1's year-long grant is unaffected
        let dr1 = CallerAttributes::provider("dr1");
        let records = h.read_by_ssn(&dr1, "111-22-3333");
        assert_eq!(records[0].record.grant_count(CategoryKind::FamilyHx), 2);
    }

    #[test]
    fn unknown_ssn_is_an_empty_result() {
        let mut h = clinic();
        let dr1 = CallerAttributes::provider("dr1");
        assert!(h.read_by_ssn(&dr1, "000-00-0000").is_empty());

        let response = h.call(&dr1, "GetPatientBySSN", &args(&["000-00-0000"]));
        assert_eq!(response.payload(), Some(&b"[]"[..]));
    }

    #[test]
    fn patient_reads_own_unfiltered_copy() {
        let mut h = clinic();
        let p1 = CallerAttributes::patient("p1");
        let records = h.read_by_ssn(&p1, "111-22-3333");
        // single-org copy holds only the registration grant
        assert_eq!(records[0].record.grant_count(CategoryKind::Medications), 1);

        let p2 = CallerAttributes::patient("p2");
        let response = h.call(&p2, "GetPatientBySSN", &args(&["111-22-3333"]));
        assert_eq!(expect_error(&response), ErrorKind::Unauthorized);
    }

    #[test]
    fn shared_ssn_does_not_block_or_leak() {
        let mut h = clinic();
        assert!(h.register_patient("dr1", "p2", "111-22-3333").is_success());

        let p1 = CallerAttributes::patient("p1");
        let records = h.read_by_ssn(&p1, "111-22-3333");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "p1");

        // providers still see one projected record per match
        let (from, to) = (h.day(0), h.day(30));
        assert!(h.grant("p2", "dr2", from, to).is_success());
        let dr2 = CallerAttributes::provider("dr2");
        let records = h.read_by_ssn(&dr2, "111-22-3333");
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["p1", "p2"]);
    }

    #[test]
    fn reregistration_overwrites_in_place() {
        let mut h = Harness::new(start());
        h.register_provider("dr1", "greg", "house");
        h.register_patient("dr1", "p1", "111");
        let before = h.ledger.store().len(Partition::Public);
        let details_before: PatientDetails = h
            .ledger
            .store()
            .require_json(Partition::SingleOrg, "p1", 256)
            .unwrap();

        assert!(h.register_patient("dr1", "p1", "111").is_success());
        assert_eq!(h.ledger.store().len(Partition::Public), before);
        let details_after: PatientDetails = h
            .ledger
            .store()
            .require_json(Partition::SingleOrg, "p1", 256)
            .unwrap();
        assert_eq!(details_after, details_before);

        let names = h.query("GetPatientsByName", &["ada", "lovelace"]);
        assert_eq!(names.as_array().unwrap().len(), 1);
    }

    #[test]
    fn grants_only_ever_accumulate() {
        let mut h = clinic();
        for round in 0..3 {
            let (from, to) = (h.day(round), h.day(round + 5));
            assert!(h.grant("p1", "dr1", from, to).is_success());
        }
        let stored: PatientDetails = h
            .ledger
            .store()
            .require_json(Partition::DualOrg, "p1", 256)
            .unwrap();
        for kind in CategoryKind::ALL {
            let grants = &stored.category(kind).provider_consent;
            assert_eq!(grants.len(), 5);
            assert_eq!(grants[1].provider.provider_id.as_str(), "dr2");
        }
    }

    #[test]
    fn provider_registration_is_admin_only() {
        let mut h = Harness::new(start());
        let dr1 = CallerAttributes::provider("dr1");
        let response = h.call(
            &dr1,
            "RegisterProvider",
            &args(&["dr9", "epic", "url", "a", "b", "c"]),
        );
        assert_eq!(expect_error(&response), ErrorKind::Unauthorized);
    }

    #[test]
    fn argument_errors_name_the_problem() {
        let mut h = Harness::new(start());
        let admin = CallerAttributes::admin("admin");
        let response = h.call(&admin, "RegisterProvider", &args(&["dr9"]));
        assert_eq!(expect_error(&response), ErrorKind::Validation);

        let response = h.call(&admin, "GetPatientByInformation", &args(&["ada", "lovelace"]));
        assert_eq!(expect_error(&response), ErrorKind::Validation);
    }

    #[test]
    fn lookups_return_key_record_lists() {
        let mut h = clinic();
        let info = h.query("GetPatientByInformation", &["Ada", "Lovelace", "12-10-1815"]);
        assert_eq!(info[0]["Key"], "p1");
        assert_eq!(info[0]["Record"]["docType"], "Patient");

        let provider = h.query("GetProviderById", &["dr2"]);
        assert_eq!(provider, json!([{
            "Key": "dr2",
            "Record": {
                "docType": "Provider",
                "providerId": "dr2",
                "providerehr": "epic",
                "providerehrurl": "https://ehr.example",
                "firstname": "lisa",
                "lastname": "cuddy",
                "speciality": "internal medicine"
            }
        }]));

        let gregs = h.query("GetProvidersByName", &["greg"]);
        assert_eq!(gregs[0]["Key"], "dr1");
    }

    #[test]
    fn paginated_range_walks_every_record() {
        let mut h = clinic();
        h.register_provider("dr3", "james", "wilson");

        let mut bookmark = String::new();
        let mut keys = Vec::new();
        loop {
            let page = h.query(
                "GetRecordsByRangeWithPagination",
                &["", "", "2", bookmark.as_str()],
            );
            let entries = page.as_array().unwrap();
            let metadata = &entries[0]["ResponseMetadata"];
            assert_eq!(metadata["RecordsCount"], json!(entries.len() - 1));
            keys.extend(entries[1..].iter().map(|e| e["Key"].as_str().unwrap().to_string()));
            bookmark = metadata["Bookmark"].as_str().unwrap().to_string();
            if bookmark.is_empty() {
                break;
            }
        }
        assert_eq!(keys, vec!["dr1", "dr2", "dr3", "p1"]);
    }

    #[test]
    fn history_shows_deletions_as_null() {
        let mut h = clinic();
        let admin = CallerAttributes::admin("admin");
        assert!(h.call(&admin, "DeleteProvider", &args(&["dr2"])).is_success());

        let history = h.query("GetHistoryForRecord", &["dr2"]);
        let entries = history.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["IsDelete"], Value::Bool(true));
        assert_eq!(entries[1]["Value"], Value::Null);
        assert_eq!(entries[0]["Value"]["providerId"], "dr2");

        assert!(h.query("GetProvidersByName", &["lisa"]).as_array().unwrap().is_empty());
    }

    #[test]
    fn ad_hoc_query_with_pagination() {
        let mut h = clinic();
        let page = h.query(
            "QueryRecordsWithPagination",
            &[r#"{"selector":{"docType":"Provider"}}"#, "1", ""],
        );
        assert_eq!(page[0]["ResponseMetadata"]["Bookmark"], "dr1");
        assert_eq!(page[1]["Key"], "dr1");

        let all = h.query("QueryRecords", &[r#"{"selector":{"docType":"Patient"}}"#]);
        assert_eq!(all.as_array().unwrap().len(), 1);
    }
}
