// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for cross-host reconciliation.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::intent::RecordIntent;
    use crate::reconciler::reconcile;
    use crate::record::Record;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn intent(record: Record, hostname: &str, container_id: &str, created_secs: i64, force: bool) -> RecordIntent {
        RecordIntent {
            record,
            hostname: hostname.to_string(),
            container_id: container_id.to_string(),
            container_name: format!("c-{container_id}"),
            created: ts(created_secs),
            force,
        }
    }

    #[test]
    fn new_a_on_an_empty_store_is_added_with_no_evictions() {
        let d = intent(Record::new_a("api.example.com", "10.0.0.1").unwrap(), "hostA", "c1", 1000, false);
        let outcome = reconcile(vec![d.clone()], vec![], "hostA");
        assert_eq!(outcome.to_add, vec![d]);
        assert!(outcome.to_remove.is_empty());
    }

    #[test]
    fn forced_a_evicts_a_remote_cname() {
        let remote_cname = intent(
            Record::new_cname("api.example.com", "backend.example.com").unwrap(),
            "hostB",
            "c2",
            500,
            false,
        );
        let d = intent(Record::new_a("api.example.com", "10.0.0.1").unwrap(), "hostA", "c1", 2000, true);
        let outcome = reconcile(vec![d.clone()], vec![remote_cname.clone()], "hostA");
        assert_eq!(outcome.to_add, vec![d]);
        assert_eq!(outcome.to_remove, vec![remote_cname]);
    }

    #[test]
    fn non_force_a_yields_to_an_older_remote_cname() {
        let remote_cname = intent(
            Record::new_cname("api.example.com", "backend.example.com").unwrap(),
            "hostB",
            "c2",
            500,
            false,
        );
        let d = intent(Record::new_a("api.example.com", "10.0.0.1").unwrap(), "hostA", "c1", 2000, false);
        let outcome = reconcile(vec![d], vec![remote_cname], "hostA");
        assert!(outcome.to_add.is_empty());
        assert!(outcome.to_remove.is_empty());
    }

    #[test]
    fn cname_creating_a_cycle_at_reconcile_time_is_rejected() {
        let existing_b_to_c = intent(
            Record::new_cname("b.example.com", "c.example.com").unwrap(),
            "hostB",
            "c2",
            500,
            false,
        );
        let existing_a_to_b = intent(
            Record::new_cname("a.example.com", "b.example.com").unwrap(),
            "hostB",
            "c3",
            500,
            false,
        );
        let d = intent(Record::new_cname("c.example.com", "a.example.com").unwrap(), "hostA", "c1", 2000, false);
        let outcome = reconcile(vec![d], vec![existing_a_to_b, existing_b_to_c], "hostA");
        assert!(outcome.to_add.is_empty());
    }

    #[test]
    fn stale_sweep_removes_only_this_hosts_orphaned_records() {
        let mine_stale = intent(Record::new_a("old.example.com", "10.0.0.9").unwrap(), "hostA", "c9", 100, false);
        let theirs_stale = intent(Record::new_a("theirs.example.com", "10.0.0.8").unwrap(), "hostB", "c8", 100, false);
        let outcome = reconcile(vec![], vec![mine_stale.clone(), theirs_stale.clone()], "hostA");
        assert_eq!(outcome.to_remove, vec![mine_stale]);
    }

    #[test]
    fn two_hosts_tie_break_goes_to_the_older_container() {
        let remote = intent(Record::new_a("api.example.com", "10.0.0.2").unwrap(), "hostB", "c2", 500, false);
        let d = intent(Record::new_a("api.example.com", "10.0.0.2").unwrap(), "hostA", "c1", 2000, false);
        let outcome = reconcile(vec![d], vec![remote], "hostA");
        assert!(outcome.to_add.is_empty());
        assert!(outcome.to_remove.is_empty());
    }

    #[test]
    fn both_force_same_value_collision_falls_back_to_age() {
        let remote = intent(Record::new_a("api.example.com", "10.0.0.2").unwrap(), "hostB", "c2", 1000, true);
        let d = intent(Record::new_a("api.example.com", "10.0.0.2").unwrap(), "hostA", "c1", 1500, true);
        let outcome = reconcile(vec![d], vec![remote], "hostA");
        assert!(outcome.to_add.is_empty());
        assert!(outcome.to_remove.is_empty());
    }

    #[test]
    fn reconcile_is_deterministic_under_input_reordering() {
        let a1 = intent(Record::new_a("api.example.com", "10.0.0.1").unwrap(), "hostA", "c1", 500, false);
        let a2 = intent(Record::new_a("other.example.com", "10.0.0.2").unwrap(), "hostA", "c2", 600, false);
        let forward = reconcile(vec![a1.clone(), a2.clone()], vec![], "hostA");
        let backward = reconcile(vec![a2, a1], vec![], "hostA");

        let mut forward_add = forward.to_add;
        let mut backward_add = backward.to_add;
        forward_add.sort_by(|a, b| a.record.name().cmp(b.record.name()));
        backward_add.sort_by(|a, b| a.record.name().cmp(b.record.name()));
        assert_eq!(forward_add, backward_add);
    }
}
