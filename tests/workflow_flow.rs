mod common;

use anyhow::{Context, Result};
use common::TestApp;
use doc_registry::commands;
use doc_registry::constants::{ChangeRequestStatus, DocumentStatus, Priority, RequestType};
use doc_registry::documents::RelationshipSet;
use doc_registry::error::ErrorKind;
use doc_registry::models::CreateDocument;
use doc_registry::workflow::TransitionPolicy;

#[test]
fn it_001_goes_live_then_under_change_request() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let doc = app.create_document("IT-001", "IT")?;
    let id = doc.document.id.as_str();
    assert_eq!(doc.document.status, DocumentStatus::Draft);

    commands::set_status(&app.state, &admin, id, DocumentStatus::Live)?;
    let change = commands::set_status(&app.state, &admin, id, DocumentStatus::UnderReview)?;

    assert_eq!(change.requested, DocumentStatus::UnderReview);
    assert_eq!(change.to, DocumentStatus::LiveCr);
    assert_eq!(app.status_of(id)?, DocumentStatus::LiveCr);
    Ok(())
}

#[test]
fn under_review_outside_live_is_stored_as_is() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let doc = app.create_document("IT-002", "IT")?;

    commands::set_status(&app.state, &admin, &doc.document.id, DocumentStatus::UnderReview)?;
    assert_eq!(app.status_of(&doc.document.id)?, DocumentStatus::UnderReview);
    Ok(())
}

#[test]
fn status_change_clears_pending_with_and_bumps_updated_at() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let mut input = CreateDocument::new("IT-003", "Access reviews", "SOP", "IT");
    input.pending_with = Some("document-owner".into());
    let doc = app.create_document_with(input, RelationshipSet::default())?;
    common::pause();

    let change = commands::set_status(
        &app.state,
        &admin,
        &doc.document.id,
        DocumentStatus::PendingOwnerApproval,
    )?;
    assert!(change.changed());
    assert_eq!(change.actor_id, admin.user_id);

    let reloaded = app.state.documents.get(&doc.document.id)?.context("document should exist")?;
    assert_eq!(reloaded.pending_with, None);
    assert!(reloaded.updated_at > doc.document.updated_at);

    let assigned = commands::assign_pending_with(
        &app.state,
        &admin,
        &doc.document.id,
        Some("Olivia Owner"),
    )?;
    assert_eq!(assigned.pending_with.as_deref(), Some("Olivia Owner"));
    assert_eq!(assigned.status, DocumentStatus::PendingOwnerApproval);
    Ok(())
}

#[test]
fn missing_document_transition_is_not_found() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let err = commands::set_status(&app.state, &admin, "nope", DocumentStatus::Live).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn permissive_policy_allows_leaving_archived() -> Result<()> {
    let app = TestApp::new()?;
    assert_eq!(app.state.workflow.policy(), TransitionPolicy::Permissive);
    let admin = app.admin()?;
    let doc = app.create_document("OLD-1", "Ops")?;
    commands::archive_document(&app.state, &admin, &doc.document.id)?;
    commands::set_status(&app.state, &admin, &doc.document.id, DocumentStatus::Draft)?;
    assert_eq!(app.status_of(&doc.document.id)?, DocumentStatus::Draft);
    Ok(())
}

#[test]
fn strict_policy_rejects_unlisted_transitions() -> Result<()> {
    let app = TestApp::with_policy(TransitionPolicy::Strict)?;
    assert_eq!(app.state.workflow.policy(), TransitionPolicy::Strict);
    let admin = app.admin()?;
    let doc = app.create_document("STR-1", "Ops")?;
    let id = doc.document.id.as_str();

    let err = commands::set_status(&app.state, &admin, id, DocumentStatus::Live).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(app.status_of(id)?, DocumentStatus::Draft);

    for step in [
        DocumentStatus::UnderReview,
        DocumentStatus::PendingOwnerApproval,
        DocumentStatus::Approved,
        DocumentStatus::Live,
        DocumentStatus::UnderReview,
    ] {
        commands::set_status(&app.state, &admin, id, step)?;
    }
    assert_eq!(app.status_of(id)?, DocumentStatus::LiveCr);

    commands::archive_document(&app.state, &admin, id)?;
    let err = commands::set_status(&app.state, &admin, id, DocumentStatus::Live).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    // re-asserting the current status is always accepted
    let again = commands::archive_document(&app.state, &admin, id)?;
    assert!(!again.changed());
    Ok(())
}

#[test]
fn change_request_lifecycle_drives_live_cr() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let requester = app.insert_user("Rita Requester", doc_registry::constants::UserRole::Requester)?;
    let requester = app.actor(&requester);
    let doc = app.create_document("CR-1", "Quality")?;
    let id = doc.document.id.as_str();
    commands::set_status(&app.state, &admin, id, DocumentStatus::Live)?;

    let first = commands::submit_change_request(
        &app.state,
        &requester,
        id,
        RequestType::Correction,
        Priority::High,
        "Typo in step 3",
    )?;
    assert_eq!(first.change_request.status, ChangeRequestStatus::Pending);
    assert_eq!(
        first.status_change.as_ref().map(|c| c.to),
        Some(DocumentStatus::LiveCr)
    );

    let second = commands::submit_change_request(
        &app.state,
        &requester,
        id,
        RequestType::Update,
        Priority::Low,
        "Add new supplier",
    )?;
    assert!(second.status_change.is_none());
    assert_eq!(app.state.change_requests.count_open(id)?, 2);

    let resolved = commands::resolve_change_request(
        &app.state,
        &admin,
        &first.change_request.id,
        ChangeRequestStatus::Approved,
    )?;
    assert!(resolved.status_change.is_none());
    assert_eq!(app.status_of(id)?, DocumentStatus::LiveCr);

    let resolved = commands::resolve_change_request(
        &app.state,
        &admin,
        &second.change_request.id,
        ChangeRequestStatus::Rejected,
    )?;
    assert_eq!(
        resolved.status_change.map(|c| c.to),
        Some(DocumentStatus::Live)
    );
    assert_eq!(app.status_of(id)?, DocumentStatus::Live);
    Ok(())
}

#[test]
fn resolving_requires_a_final_status() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    let doc = app.create_document("CR-2", "Quality")?;
    let submitted = commands::submit_change_request(
        &app.state,
        &admin,
        &doc.document.id,
        RequestType::Revision,
        Priority::Medium,
        "Annual revision",
    )?;
    assert!(submitted.status_change.is_none());

    let err = commands::resolve_change_request(
        &app.state,
        &admin,
        &submitted.change_request.id,
        ChangeRequestStatus::UnderReview,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}
