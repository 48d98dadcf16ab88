//! Caller-facing commands. Each takes the acting identity and returns a
//! plain aggregate or a [`StoreError`](crate::error::StoreError).
//!
//! Commands assume the caller already decided the actor may perform the
//! action; the identity is recorded in logs and on authored rows only.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::change_requests::CreateChangeRequest;
use crate::constants::{ChangeRequestStatus, DocumentStatus, Priority, RequestType};
use crate::documents::{DocumentAggregate, FileMetadata, RelationshipSet, StatusChange};
use crate::error::{StoreError, StoreResult};
use crate::identity::Actor;
use crate::models::{
    ChangeRequest, CommentWithAuthor, CreateDocument, Document, DocumentFile, DocumentPatch,
};
use crate::query::{DocumentFilters, DocumentPage, Pagination, Sort};
use crate::review::ReviewSweep;
use crate::state::AppState;
use crate::stats::Statistics;
use crate::utils::json::parse_update;

/// A change-request write together with the document status change it
/// caused, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRequestOutcome {
    pub change_request: ChangeRequest,
    pub status_change: Option<StatusChange>,
}

pub fn create_document(
    state: &AppState,
    actor: &Actor,
    input: CreateDocument,
    relationships: RelationshipSet,
) -> StoreResult<DocumentAggregate> {
    tracing::debug!(actor = %actor.user_id, code = %input.document_code, "create document requested");
    state.documents.create_with_relationships(input, relationships)
}

pub fn get_document(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
) -> StoreResult<Option<DocumentAggregate>> {
    tracing::debug!(actor = %actor.user_id, document_id = %document_id, "get document");
    state.documents.get_with_relationships(document_id)
}

pub fn update_document(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    patch: DocumentPatch,
    relationships: RelationshipSet,
) -> StoreResult<DocumentAggregate> {
    tracing::debug!(actor = %actor.user_id, document_id = %document_id, "update document requested");
    state
        .documents
        .update_with_relationships(document_id, patch, relationships)
}

/// Like [`update_document`], reading fields and relationship kinds from a
/// JSON object where `null` clears a column and an omitted key keeps it.
pub fn update_document_json(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    body: &Value,
) -> StoreResult<DocumentAggregate> {
    let (patch, relationships) = parse_update(body)?;
    update_document(state, actor, document_id, patch, relationships)
}

pub fn set_status(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    status: DocumentStatus,
) -> StoreResult<StatusChange> {
    state
        .documents
        .update_status(document_id, status, &actor.user_id)
}

/// Hands the document to `holder` after a status change cleared it.
pub fn assign_pending_with(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    holder: Option<&str>,
) -> StoreResult<Document> {
    let document = state.documents.assign_pending_with(document_id, holder)?;
    tracing::info!(
        actor = %actor.user_id,
        document_id = %document_id,
        pending_with = ?document.pending_with,
        "pending holder assigned"
    );
    Ok(document)
}

pub fn add_comment(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    text: &str,
) -> StoreResult<CommentWithAuthor> {
    state.documents.add_comment(document_id, &actor.user_id, text)
}

pub fn list_documents(
    state: &AppState,
    actor: &Actor,
    filters: &DocumentFilters,
    pagination: Pagination,
    sort: Sort,
) -> StoreResult<DocumentPage> {
    state.query.list_for_actor(actor, filters, pagination, sort)
}

pub fn get_statistics(state: &AppState, actor: &Actor) -> StoreResult<Statistics> {
    tracing::debug!(actor = %actor.user_id, "statistics requested");
    state
        .stats
        .collect(Utc::now().naive_utc(), state.config.stats_recent_window_days)
}

pub fn is_code_unique(
    state: &AppState,
    _actor: &Actor,
    code: &str,
    exclude_id: Option<&str>,
) -> StoreResult<bool> {
    state.documents.is_code_unique(code, exclude_id)
}

/// Records a file version. The actor becomes the uploader unless the
/// metadata names one.
pub fn attach_file(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    mut file: FileMetadata,
) -> StoreResult<DocumentFile> {
    if file.uploaded_by.is_none() {
        file.uploaded_by = Some(actor.user_id.clone());
    }
    state.documents.attach_file(document_id, file)
}

pub fn delete_document(state: &AppState, actor: &Actor, document_id: &str) -> StoreResult<()> {
    state.documents.delete_document(document_id)?;
    tracing::info!(actor = %actor.user_id, document_id = %document_id, "document removed by actor");
    Ok(())
}

pub fn archive_document(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
) -> StoreResult<StatusChange> {
    state.documents.archive(document_id, &actor.user_id)
}

pub fn soft_delete_document(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
) -> StoreResult<StatusChange> {
    state.documents.soft_delete(document_id, &actor.user_id)
}

/// Opens a change request as the actor. A request against a `live` document
/// moves it to `live-cr` in a separate step.
pub fn submit_change_request(
    state: &AppState,
    actor: &Actor,
    document_id: &str,
    request_type: RequestType,
    priority: Priority,
    description: &str,
) -> StoreResult<ChangeRequestOutcome> {
    let change_request = state.change_requests.create(CreateChangeRequest {
        document_id: document_id.to_string(),
        requester_id: actor.user_id.clone(),
        request_type,
        priority,
        description: description.to_string(),
    })?;

    let status_change = match state.documents.get(document_id)? {
        Some(document) if document.status == DocumentStatus::Live => Some(
            state
                .documents
                .update_status(document_id, DocumentStatus::UnderReview, &actor.user_id)?,
        ),
        _ => None,
    };

    Ok(ChangeRequestOutcome {
        change_request,
        status_change,
    })
}

/// Approves or rejects a change request. Once no request on a `live-cr`
/// document remains open, the document returns to `live`.
pub fn resolve_change_request(
    state: &AppState,
    actor: &Actor,
    change_request_id: &str,
    resolution: ChangeRequestStatus,
) -> StoreResult<ChangeRequestOutcome> {
    if !resolution.is_resolved() {
        return Err(StoreError::validation(format!(
            "'{resolution}' does not resolve a change request"
        )));
    }

    let change_request = state
        .change_requests
        .update_status(change_request_id, resolution)?;
    let document_id = change_request.document_id.as_str();

    let mut status_change = None;
    if state.change_requests.count_open(document_id)? == 0 {
        if let Some(document) = state.documents.get(document_id)? {
            if document.status == DocumentStatus::LiveCr {
                status_change = Some(state.documents.update_status(
                    document_id,
                    DocumentStatus::Live,
                    &actor.user_id,
                )?);
            }
        }
    }

    tracing::info!(
        actor = %actor.user_id,
        change_request_id = %change_request_id,
        resolution = %resolution,
        "change request resolved"
    );
    Ok(ChangeRequestOutcome {
        change_request,
        status_change,
    })
}

pub fn refresh_review_flags(
    state: &AppState,
    actor: &Actor,
    today: NaiveDate,
) -> StoreResult<ReviewSweep> {
    tracing::debug!(actor = %actor.user_id, "review sweep requested");
    state
        .review
        .refresh(today, state.config.review_due_window_days)
}
