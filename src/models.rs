use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ChangeRequestStatus, DocumentStatus, Priority, RequestType, StorageBackend, UserRole,
};
use crate::crud::{Entity, HardDelete, SoftDelete, SoftDeletable};
use crate::schema::*;

#[derive(Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Identifiable, Serialize)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(Sqlite))]
pub struct Document {
    pub id: String,
    pub document_code: String,
    pub name: String,
    pub document_number: Option<String>,
    pub document_type: String,
    pub department: String,
    pub country: Option<String>,
    pub description: Option<String>,
    pub version_number: String,
    pub upload_date: Option<NaiveDate>,
    pub last_revision_date: Option<NaiveDate>,
    pub next_revision_date: Option<NaiveDate>,
    pub review_deadline: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub pending_with: Option<String>,
    pub is_breached: bool,
    pub review_due: bool,
    pub needs_review: bool,
    pub file_url: Option<String>,
    pub file_hash: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Document {
    const TABLE: &'static str = "documents";
    type Deletion = HardDelete;
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: String,
    pub document_code: String,
    pub name: String,
    pub document_number: Option<String>,
    pub document_type: String,
    pub department: String,
    pub country: Option<String>,
    pub description: Option<String>,
    pub version_number: String,
    pub upload_date: Option<NaiveDate>,
    pub last_revision_date: Option<NaiveDate>,
    pub next_revision_date: Option<NaiveDate>,
    pub review_deadline: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub pending_with: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub document_code: String,
    pub name: String,
    #[serde(default)]
    pub document_number: Option<String>,
    pub document_type: String,
    pub department: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_version_number")]
    pub version_number: String,
    #[serde(default)]
    pub upload_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_revision_date: Option<NaiveDate>,
    #[serde(default)]
    pub next_revision_date: Option<NaiveDate>,
    #[serde(default)]
    pub review_deadline: Option<NaiveDate>,
    #[serde(default = "default_initial_status")]
    pub status: DocumentStatus,
    #[serde(default)]
    pub pending_with: Option<String>,
}

fn default_version_number() -> String {
    "1.0".to_string()
}

fn default_initial_status() -> DocumentStatus {
    DocumentStatus::Draft
}

impl CreateDocument {
    pub fn new(
        document_code: impl Into<String>,
        name: impl Into<String>,
        document_type: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            document_code: document_code.into(),
            name: name.into(),
            document_number: None,
            document_type: document_type.into(),
            department: department.into(),
            country: None,
            description: None,
            version_number: default_version_number(),
            upload_date: None,
            last_revision_date: None,
            next_revision_date: None,
            review_deadline: None,
            status: default_initial_status(),
            pending_with: None,
        }
    }

    pub(crate) fn into_row(self, id: String, now: NaiveDateTime) -> NewDocument {
        NewDocument {
            id,
            document_code: self.document_code.trim().to_string(),
            name: self.name,
            document_number: self.document_number,
            document_type: self.document_type,
            department: self.department,
            country: self.country,
            description: self.description,
            version_number: self.version_number,
            upload_date: self.upload_date,
            last_revision_date: self.last_revision_date,
            next_revision_date: self.next_revision_date,
            review_deadline: self.review_deadline,
            status: self.status,
            pending_with: self.pending_with,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of descriptive document fields. `None` leaves a column
/// untouched; `Some(None)` clears a nullable column. Status is changed only
/// through the workflow.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = documents)]
pub struct DocumentPatch {
    pub document_code: Option<String>,
    pub name: Option<String>,
    pub document_number: Option<Option<String>>,
    pub document_type: Option<String>,
    pub department: Option<String>,
    pub country: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub version_number: Option<String>,
    pub upload_date: Option<Option<NaiveDate>>,
    pub last_revision_date: Option<Option<NaiveDate>>,
    pub next_revision_date: Option<Option<NaiveDate>>,
    pub review_deadline: Option<Option<NaiveDate>>,
    pub pending_with: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Sqlite))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub country: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    type Deletion = SoftDelete<User>;
}

impl SoftDeletable for User {
    const FLAG_COLUMN: &'static str = "active";
    const RETIRED_VALUE: &'static str = "0";
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub country: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct RelatedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = compliance_names)]
#[diesel(check_for_backend(Sqlite))]
pub struct ComplianceName {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = compliance_names)]
pub struct NewComplianceName {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ComplianceNameInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = document_comments)]
#[diesel(check_for_backend(Sqlite))]
pub struct DocumentComment {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_comments)]
pub struct NewDocumentComment {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: DocumentComment,
    pub author_name: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = document_files)]
#[diesel(check_for_backend(Sqlite))]
pub struct DocumentFile {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_hash: String,
    pub storage_backend: StorageBackend,
    pub uploaded_by: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_files)]
pub struct NewDocumentFile {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_hash: String,
    pub storage_backend: StorageBackend,
    pub uploaded_by: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Identifiable, Serialize)]
#[diesel(table_name = change_requests)]
#[diesel(check_for_backend(Sqlite))]
pub struct ChangeRequest {
    pub id: String,
    pub document_id: String,
    pub requester_id: String,
    pub request_type: RequestType,
    pub status: ChangeRequestStatus,
    pub priority: Priority,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for ChangeRequest {
    const TABLE: &'static str = "change_requests";
    type Deletion = HardDelete;
}
