//! Integration tests for anchor task-set generation and the scheduled sweep.

use opsboard::clock::FixedClock;
use opsboard::dates::parse_date;
use opsboard::db::events::EventInput;
use opsboard::db::Database;
use opsboard::error::{EngineError, ErrorCode};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn clock(date: &str) -> FixedClock {
    FixedClock::new(parse_date("date", date).unwrap())
}

fn launch_event(db: &Database, prep: &str, post: &str) -> String {
    db.create_event(EventInput {
        title: "Spring launch".into(),
        prep_start_date: prep.into(),
        start_date: post.into(),
        owner_profile_id: Some("owner-1".into()),
        backup_owner_profile_id: Some("backup-1".into()),
        auto_create_template_tasks: true,
    })
    .expect("Failed to create event")
    .id
}

mod anchor_generation {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn creates_the_seven_task_checklist_with_expected_due_dates() {
        let db = setup_db();
        let event_id = launch_event(&db, "2024-03-01", "2024-03-10");

        let result = db
            .ensure_anchor_tasks(&clock("2024-03-01"), &event_id, Some("actor-1"))
            .unwrap();
        assert_eq!(result.created_count, 7);
        assert!(result.patched_template_applied_at);

        let tasks = db.list_comm_tasks(&event_id).unwrap();
        let due_by_title: HashMap<&str, &str> = tasks
            .iter()
            .map(|t| (t.title.as_str(), t.due_date.as_deref().unwrap()))
            .collect();

        assert_eq!(due_by_title["Brief"], "2024-03-01");
        assert_eq!(due_by_title["Angles"], "2024-03-03");
        assert_eq!(due_by_title["Copy"], "2024-03-03");
        assert_eq!(due_by_title["Visuels"], "2024-03-05");
        assert_eq!(due_by_title["Validation"], "2024-03-08");
        assert_eq!(due_by_title["Programmation"], "2024-03-09");
        assert_eq!(due_by_title["REX"], "2024-03-12");

        for task in &tasks {
            assert_eq!(task.status, "todo");
            assert!(task.checklist.is_empty());
            assert_eq!(task.assignee_id.as_deref(), Some("owner-1"));
            assert_eq!(task.created_by_profile_id.as_deref(), Some("actor-1"));
        }
    }

    #[test]
    fn second_call_creates_nothing_and_does_not_restamp() {
        let db = setup_db();
        let event_id = launch_event(&db, "2024-03-01", "2024-03-10");

        db.ensure_anchor_tasks(&clock("2024-03-01"), &event_id, Some("actor-1"))
            .unwrap();
        let second = db
            .ensure_anchor_tasks(&clock("2024-03-02"), &event_id, Some("actor-1"))
            .unwrap();

        assert_eq!(second.created_count, 0);
        assert!(!second.patched_template_applied_at);

        let event = db.get_event(&event_id).unwrap().unwrap();
        assert_eq!(event.template_applied_at.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn tight_anchors_clamp_early_tasks_to_prep_start() {
        let db = setup_db();
        let event_id = launch_event(&db, "2024-03-01", "2024-03-02");

        db.ensure_anchor_tasks(&clock("2024-03-01"), &event_id, None)
            .unwrap();

        let tasks = db.list_comm_tasks(&event_id).unwrap();
        let copy = tasks.iter().find(|t| t.title == "Copy").unwrap();
        // Raw due date would be post - 7 = 2024-02-24.
        assert_eq!(copy.due_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn assignee_falls_back_to_backup_owner() {
        let db = setup_db();
        let event = db
            .create_event(EventInput {
                title: "Backup-owned".into(),
                prep_start_date: "2024-03-01".into(),
                start_date: "2024-03-10".into(),
                owner_profile_id: None,
                backup_owner_profile_id: Some("backup-1".into()),
                auto_create_template_tasks: false,
            })
            .unwrap();

        db.ensure_anchor_tasks(&clock("2024-03-01"), &event.id, None)
            .unwrap();

        for task in db.list_comm_tasks(&event.id).unwrap() {
            assert_eq!(task.assignee_id.as_deref(), Some("backup-1"));
        }
    }

    #[test]
    fn ownerless_event_fails_without_writing() {
        let db = setup_db();
        let event = db
            .create_event(EventInput {
                title: "Orphan".into(),
                prep_start_date: "2024-03-01".into(),
                start_date: "2024-03-10".into(),
                owner_profile_id: None,
                backup_owner_profile_id: None,
                auto_create_template_tasks: false,
            })
            .unwrap();

        let err = db
            .ensure_anchor_tasks(&clock("2024-03-01"), &event.id, Some("actor-1"))
            .unwrap_err();
        let engine_err: EngineError = err.into();
        assert_eq!(engine_err.code, ErrorCode::NoAssignableOwner);

        assert!(db.list_comm_tasks(&event.id).unwrap().is_empty());
        let event = db.get_event(&event.id).unwrap().unwrap();
        assert!(event.template_applied_at.is_none());
    }

    #[test]
    fn renamed_task_is_recreated_under_its_original_title() {
        let db = setup_db();
        let event_id = launch_event(&db, "2024-03-01", "2024-03-10");

        db.ensure_anchor_tasks(&clock("2024-03-01"), &event_id, None)
            .unwrap();

        let tasks = db.list_comm_tasks(&event_id).unwrap();
        let brief = tasks.iter().find(|t| t.title == "Brief").unwrap();
        db.rename_comm_task(&brief.id, "Kickoff brief").unwrap();

        // Title-only duplicate detection no longer sees "Brief".
        let rerun = db
            .ensure_anchor_tasks(&clock("2024-03-02"), &event_id, None)
            .unwrap();
        assert_eq!(rerun.created_count, 1);
        assert_eq!(db.list_comm_tasks(&event_id).unwrap().len(), 8);
    }

    #[test]
    fn deleted_task_is_recreated_but_stamp_survives() {
        let db = setup_db();
        let event_id = launch_event(&db, "2024-03-01", "2024-03-10");

        db.ensure_anchor_tasks(&clock("2024-03-01"), &event_id, None)
            .unwrap();

        let tasks = db.list_comm_tasks(&event_id).unwrap();
        let rex = tasks.iter().find(|t| t.title == "REX").unwrap();
        db.delete_comm_task(&rex.id).unwrap();

        let rerun = db
            .ensure_anchor_tasks(&clock("2024-04-01"), &event_id, None)
            .unwrap();
        assert_eq!(rerun.created_count, 1);
        assert!(!rerun.patched_template_applied_at);

        let event = db.get_event(&event_id).unwrap().unwrap();
        assert_eq!(
            event.template_applied_at.as_deref(),
            Some("2024-03-01"),
            "stamp is never cleared or re-stamped"
        );
    }
}

mod scheduled_sweep {
    use super::*;

    #[test]
    fn sweeps_only_due_flagged_events_and_counts_them() {
        let db = setup_db();

        // Due and flagged: will generate.
        launch_event(&db, "2024-03-01", "2024-03-10");
        // Due but unflagged: scanned, skipped.
        db.create_event(EventInput {
            title: "Manual-only".into(),
            prep_start_date: "2024-02-01".into(),
            start_date: "2024-02-20".into(),
            owner_profile_id: Some("owner-2".into()),
            backup_owner_profile_id: None,
            auto_create_template_tasks: false,
        })
        .unwrap();
        // Not yet due: not scanned.
        db.create_event(EventInput {
            title: "Future".into(),
            prep_start_date: "2030-01-01".into(),
            start_date: "2030-01-20".into(),
            owner_profile_id: Some("owner-3".into()),
            backup_owner_profile_id: None,
            auto_create_template_tasks: true,
        })
        .unwrap();

        let outcome = db.sweep_due_events(&clock("2024-03-05")).unwrap();
        assert_eq!(outcome.today, "2024-03-05");
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.created, 7);
        assert_eq!(outcome.patched, 1);
    }

    #[test]
    fn rerun_is_idempotent() {
        let db = setup_db();
        launch_event(&db, "2024-03-01", "2024-03-10");

        db.sweep_due_events(&clock("2024-03-05")).unwrap();
        let second = db.sweep_due_events(&clock("2024-03-06")).unwrap();

        assert_eq!(second.scanned, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.patched, 0);
    }

    #[test]
    fn far_past_events_remain_candidates() {
        let db = setup_db();
        launch_event(&db, "2019-01-01", "2019-02-01");

        let outcome = db.sweep_due_events(&clock("2024-03-05")).unwrap();
        assert_eq!(outcome.scanned, 1);
        assert_eq!(outcome.created, 7);
    }

    #[test]
    fn one_failing_event_rolls_back_the_entire_run() {
        let db = setup_db();

        // Healthy candidate, processed first (earlier prep date).
        let healthy_id = launch_event(&db, "2024-03-01", "2024-03-10");
        // Poisoned candidate: flagged but has nobody to assign to.
        db.create_event(EventInput {
            title: "Poisoned".into(),
            prep_start_date: "2024-03-02".into(),
            start_date: "2024-03-15".into(),
            owner_profile_id: None,
            backup_owner_profile_id: None,
            auto_create_template_tasks: true,
        })
        .unwrap();

        let err = db.sweep_due_events(&clock("2024-03-05")).unwrap_err();
        let engine_err: EngineError = err.into();
        assert_eq!(engine_err.code, ErrorCode::NoAssignableOwner);

        // The healthy event's tasks were created earlier in the same run
        // and must have been rolled back with it.
        assert!(db.list_comm_tasks(&healthy_id).unwrap().is_empty());
        let healthy = db.get_event(&healthy_id).unwrap().unwrap();
        assert!(healthy.template_applied_at.is_none());
    }

    #[test]
    fn retry_succeeds_once_the_poisoned_event_is_fixed() {
        let db = setup_db();
        let healthy_id = launch_event(&db, "2024-03-01", "2024-03-10");
        let poisoned = db
            .create_event(EventInput {
                title: "Poisoned".into(),
                prep_start_date: "2024-03-02".into(),
                start_date: "2024-03-15".into(),
                owner_profile_id: None,
                backup_owner_profile_id: None,
                auto_create_template_tasks: true,
            })
            .unwrap();

        assert!(db.sweep_due_events(&clock("2024-03-05")).is_err());

        // Give the poisoned event an owner, as the next tick would find it.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET owner_profile_id = 'owner-9' WHERE id = ?1",
                [&poisoned.id],
            )?;
            Ok(())
        })
        .unwrap();

        let outcome = db.sweep_due_events(&clock("2024-03-05")).unwrap();
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.created, 14);
        assert_eq!(outcome.patched, 2);
        assert_eq!(db.list_comm_tasks(&healthy_id).unwrap().len(), 7);
    }
}
