mod common;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use common::TestApp;
use doc_registry::commands;
use doc_registry::constants::DocumentStatus;
use doc_registry::documents::RelationshipSet;
use doc_registry::models::CreateDocument;

#[test]
fn statistics_roll_up_by_status_type_and_department() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;

    let mut ids = Vec::new();
    for (code, doc_type, department) in [
        ("S-1", "SOP", "Finance"),
        ("S-2", "SOP", "Finance"),
        ("S-3", "Policy", "Quality"),
        ("S-4", "Policy", "Quality"),
        ("S-5", "Form", "IT"),
        ("S-6", "Form", "IT"),
    ] {
        let doc = app.create_document_with(
            CreateDocument::new(code, code, doc_type, department),
            RelationshipSet::default(),
        )?;
        ids.push(doc.document.id);
    }

    commands::set_status(&app.state, &admin, &ids[0], DocumentStatus::UnderReview)?;
    commands::set_status(&app.state, &admin, &ids[1], DocumentStatus::PendingOwnerApproval)?;
    commands::set_status(&app.state, &admin, &ids[2], DocumentStatus::PendingRequesterApproval)?;
    commands::set_status(&app.state, &admin, &ids[3], DocumentStatus::Live)?;
    commands::set_status(&app.state, &admin, &ids[4], DocumentStatus::Live)?;
    commands::set_status(&app.state, &admin, &ids[4], DocumentStatus::UnderReview)?;

    let stats = commands::get_statistics(&app.state, &admin)?;
    assert_eq!(stats.total, 6);
    assert_eq!(stats.by_status.get(&DocumentStatus::Draft), Some(&1));
    assert_eq!(stats.by_status.get(&DocumentStatus::LiveCr), Some(&1));
    assert_eq!(stats.by_type.get("Policy"), Some(&2));
    assert_eq!(stats.by_department.get("IT"), Some(&2));
    assert_eq!(stats.pending_review, 1);
    assert_eq!(stats.pending_approval, 2);
    assert_eq!(stats.live, 2);
    assert_eq!(stats.recently_created, 6);
    assert_eq!(stats.recent_window_days, 30);
    Ok(())
}

#[test]
fn recent_window_is_measured_from_now() -> Result<()> {
    let app = TestApp::new()?;
    app.create_document("R-1", "Ops")?;

    let far_future = Utc::now().naive_utc() + Duration::days(90);
    let stats = app.state.stats.collect(far_future, 30)?;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.recently_created, 0);
    Ok(())
}

#[test]
fn review_sweep_sets_and_clears_flags() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).context("valid date")?;

    let mut late = CreateDocument::new("REV-LATE", "Late review", "SOP", "Ops");
    late.review_deadline = Some(today - Duration::days(1));
    let late = app.create_document_with(late, RelationshipSet::default())?;

    let mut due = CreateDocument::new("REV-DUE", "Due soon", "SOP", "Ops");
    due.next_revision_date = Some(today + Duration::days(10));
    let due = app.create_document_with(due, RelationshipSet::default())?;
    commands::set_status(&app.state, &admin, &due.document.id, DocumentStatus::Live)?;

    let mut overdue = CreateDocument::new("REV-OVER", "Overdue revision", "SOP", "Ops");
    overdue.next_revision_date = Some(today - Duration::days(3));
    overdue.review_deadline = Some(today - Duration::days(3));
    let overdue = app.create_document_with(overdue, RelationshipSet::default())?;
    commands::set_status(&app.state, &admin, &overdue.document.id, DocumentStatus::Live)?;

    let sweep = commands::refresh_review_flags(&app.state, &admin, today)?;
    assert_eq!(sweep.breached, 1);
    assert_eq!(sweep.review_due, 2);
    assert_eq!(sweep.needs_review, 1);

    let flags = |id: &str| -> Result<(bool, bool, bool)> {
        let doc = app.state.documents.get(id)?.context("document should exist")?;
        Ok((doc.is_breached, doc.review_due, doc.needs_review))
    };
    assert_eq!(flags(&late.document.id)?, (true, false, false));
    assert_eq!(flags(&due.document.id)?, (false, true, false));
    // live documents are never breached
    assert_eq!(flags(&overdue.document.id)?, (false, true, true));

    commands::set_status(&app.state, &admin, &late.document.id, DocumentStatus::Approved)?;
    let sweep = app.state.review.refresh(today, 5)?;
    assert_eq!(sweep.breached, 0);
    assert_eq!(sweep.review_due, 1);
    assert_eq!(flags(&late.document.id)?, (false, false, false));
    assert_eq!(flags(&due.document.id)?, (false, false, false));
    Ok(())
}
