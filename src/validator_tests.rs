// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for DNS invariant validation.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::error::ValidationError;
    use crate::intent::RecordIntent;
    use crate::record::Record;
    use crate::validator::validate;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn intent(record: Record, hostname: &str, created_secs: i64) -> RecordIntent {
        RecordIntent {
            record,
            hostname: hostname.to_string(),
            container_id: "c1".to_string(),
            container_name: "web".to_string(),
            created: ts(created_secs),
            force: false,
        }
    }

    #[test]
    fn a_accepted_against_empty_existing() {
        let candidate = intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostA",
            1000,
        );
        assert!(validate(&candidate, &[]).is_ok());
    }

    #[test]
    fn a_rejected_when_cname_occupies_name() {
        let existing = vec![intent(
            Record::new_cname("api.example.com", "backend.example.com").unwrap(),
            "hostB",
            1000,
        )];
        let candidate = intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostA",
            2000,
        );
        assert_eq!(
            validate(&candidate, &existing),
            Err(ValidationError::ACnameCoexistence {
                name: "api.example.com".to_string(),
                value: "10.0.0.1".to_string(),
            })
        );
    }

    #[test]
    fn cname_rejected_when_a_occupies_name() {
        let existing = vec![intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostA",
            1000,
        )];
        let candidate = intent(
            Record::new_cname("api.example.com", "backend.example.com").unwrap(),
            "hostB",
            2000,
        );
        assert!(matches!(
            validate(&candidate, &existing),
            Err(ValidationError::CnameACoexistence { .. })
        ));
    }

    #[test]
    fn duplicate_cname_rejected() {
        let existing = vec![intent(
            Record::new_cname("api.example.com", "backend.example.com").unwrap(),
            "hostA",
            1000,
        )];
        let candidate = intent(
            Record::new_cname("api.example.com", "other.example.com").unwrap(),
            "hostB",
            2000,
        );
        assert!(matches!(
            validate(&candidate, &existing),
            Err(ValidationError::DuplicateCname { .. })
        ));
    }

    #[test]
    fn duplicate_a_same_value_rejected() {
        let existing = vec![intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostA",
            1000,
        )];
        let candidate = intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostB",
            2000,
        );
        assert!(matches!(
            validate(&candidate, &existing),
            Err(ValidationError::DuplicateA { .. })
        ));
    }

    #[test]
    fn multi_a_distinct_values_permitted() {
        let existing = vec![intent(
            Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            "hostA",
            1000,
        )];
        let candidate = intent(
            Record::new_a("api.example.com", "10.0.0.2").unwrap(),
            "hostB",
            2000,
        );
        assert!(validate(&candidate, &existing).is_ok());
    }

    #[test]
    fn cname_cycle_rejected() {
        let existing = vec![
            intent(Record::new_cname("a.example.com", "b.example.com").unwrap(), "hostA", 1000),
            intent(Record::new_cname("b.example.com", "c.example.com").unwrap(), "hostA", 1000),
        ];
        let candidate = intent(
            Record::new_cname("c.example.com", "a.example.com").unwrap(),
            "hostB",
            2000,
        );
        assert!(matches!(
            validate(&candidate, &existing),
            Err(ValidationError::CnameCycle(_))
        ));
    }

    #[test]
    fn cname_chain_without_cycle_is_accepted() {
        let existing = vec![intent(
            Record::new_cname("a.example.com", "b.example.com").unwrap(),
            "hostA",
            1000,
        )];
        let candidate = intent(
            Record::new_cname("x.example.com", "a.example.com").unwrap(),
            "hostB",
            2000,
        );
        assert!(validate(&candidate, &existing).is_ok());
    }
}
