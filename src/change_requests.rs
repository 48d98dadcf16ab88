use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::constants::{ChangeRequestStatus, Priority, RequestType};
use crate::crud::{self, Direction, FindOptions, SqlValue};
use crate::db::Database;
use crate::documents::{now, require_document};
use crate::error::{StoreError, StoreResult};
use crate::models::ChangeRequest;
use crate::schema::users;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChangeRequest {
    pub document_id: String,
    pub requester_id: String,
    pub request_type: RequestType,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub description: String,
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// Change requests live beside documents, never inside a document
/// transaction. Deleting a document removes its requests by cascade.
#[derive(Clone)]
pub struct ChangeRequestRepository {
    db: Database,
}

impl ChangeRequestRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, input: CreateChangeRequest) -> StoreResult<ChangeRequest> {
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(StoreError::validation("change request description must not be empty"));
        }

        let request = self.db.transaction(|conn| {
            require_document(conn, &input.document_id)?;
            let requester_exists: i64 = users::table
                .filter(users::id.eq(&input.requester_id))
                .count()
                .get_result(conn)?;
            if requester_exists == 0 {
                return Err(StoreError::constraint(format!(
                    "user {} does not exist",
                    input.requester_id
                )));
            }

            let id = Uuid::new_v4().to_string();
            let stamp = now();
            crud::create::<ChangeRequest>(
                conn,
                vec![
                    ("id", SqlValue::from(id.as_str())),
                    ("document_id", SqlValue::from(input.document_id.as_str())),
                    ("requester_id", SqlValue::from(input.requester_id.as_str())),
                    ("request_type", SqlValue::from(input.request_type.as_str())),
                    ("status", SqlValue::from(ChangeRequestStatus::Pending.as_str())),
                    ("priority", SqlValue::from(input.priority.as_str())),
                    ("description", SqlValue::from(description)),
                    ("created_at", SqlValue::from(stamp)),
                    ("updated_at", SqlValue::from(stamp)),
                ],
            )?;
            crud::find_by_id::<ChangeRequest>(conn, &id)?
                .ok_or_else(|| StoreError::not_found("change request not found"))
        })?;

        tracing::info!(
            change_request_id = %request.id,
            document_id = %request.document_id,
            request_type = %request.request_type,
            "change request created"
        );
        Ok(request)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<ChangeRequest>> {
        self.db.read(|conn| crud::find_by_id::<ChangeRequest>(conn, id))
    }

    /// Newest first.
    pub fn list_for_document(&self, document_id: &str) -> StoreResult<Vec<ChangeRequest>> {
        self.db.read(|conn| {
            crud::find_by::<ChangeRequest>(
                conn,
                &[("document_id", SqlValue::from(document_id))],
                &FindOptions {
                    order_by: Some(("created_at", Direction::Desc)),
                    ..Default::default()
                },
            )
        })
    }

    pub fn update_status(&self, id: &str, status: ChangeRequestStatus) -> StoreResult<ChangeRequest> {
        let request = self.db.transaction(|conn| {
            let touched = crud::update_by_id::<ChangeRequest>(
                conn,
                id,
                vec![("status", SqlValue::from(status.as_str()))],
                now(),
            )?;
            if touched == 0 {
                return Err(StoreError::not_found(format!("change request {id} not found")));
            }
            crud::find_by_id::<ChangeRequest>(conn, id)?
                .ok_or_else(|| StoreError::not_found(format!("change request {id} not found")))
        })?;
        tracing::info!(change_request_id = %id, status = %status, "change request status updated");
        Ok(request)
    }

    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let removed = self
            .db
            .transaction(|conn| crud::delete_by_id::<ChangeRequest>(conn, id))?;
        if removed == 0 {
            return Err(StoreError::not_found(format!("change request {id} not found")));
        }
        tracing::info!(change_request_id = %id, "change request deleted");
        Ok(())
    }

    /// Requests on the document that are still pending or under review.
    pub fn count_open(&self, document_id: &str) -> StoreResult<i64> {
        self.db.read(|conn| {
            let mut open = 0;
            for status in ChangeRequestStatus::OPEN {
                open += crud::count::<ChangeRequest>(
                    conn,
                    &[
                        ("document_id", SqlValue::from(document_id)),
                        ("status", SqlValue::from(status.as_str())),
                    ],
                )?;
            }
            Ok(open)
        })
    }
}
