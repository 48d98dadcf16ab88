mod files;
mod relationships;

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::DocumentStatus;
use crate::crud;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    CommentWithAuthor, ComplianceName, CreateDocument, Document, DocumentComment, DocumentFile,
    DocumentPatch, NewDocumentComment, NewDocumentFile, RelatedUser,
};
use crate::schema::{document_comments, document_files, documents, users};
use crate::workflow::Workflow;

pub use files::FileMetadata;
pub use relationships::{
    ensure_users_exist, replace_relationship, Relationship, RelationshipKind, RelationshipSet,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentAggregate {
    #[serde(flatten)]
    pub document: Document,
    pub owners: Vec<RelatedUser>,
    pub reviewers: Vec<RelatedUser>,
    pub creators: Vec<RelatedUser>,
    pub compliance_contacts: Vec<RelatedUser>,
    pub compliance_names: Vec<ComplianceName>,
    pub comments: Vec<CommentWithAuthor>,
    pub files: Vec<DocumentFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub document_id: String,
    pub actor_id: String,
    pub from: DocumentStatus,
    pub requested: DocumentStatus,
    pub to: DocumentStatus,
    pub changed_at: NaiveDateTime,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Clone)]
pub struct DocumentRepository {
    db: Database,
    workflow: Workflow,
}

impl DocumentRepository {
    pub fn new(db: Database, workflow: Workflow) -> Self {
        Self { db, workflow }
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.db.read(|conn| crud::find_by_id::<Document>(conn, id))
    }

    pub fn get_with_relationships(&self, id: &str) -> StoreResult<Option<DocumentAggregate>> {
        self.db.read(|conn| load_aggregate(conn, id))
    }

    pub fn create_with_relationships(
        &self,
        input: CreateDocument,
        relationships: RelationshipSet,
    ) -> StoreResult<DocumentAggregate> {
        validate_code(&input.document_code)?;
        validate_version(&input.version_number)?;
        if !DocumentStatus::INITIAL.contains(&input.status) {
            return Err(StoreError::validation(format!(
                "documents cannot be created with status '{}'",
                input.status
            )));
        }

        let id = Uuid::new_v4().to_string();
        let aggregate = self.db.transaction(|conn| {
            if code_taken(conn, input.document_code.trim(), None)? {
                return Err(StoreError::duplicate(format!(
                    "document code '{}' already exists",
                    input.document_code.trim()
                )));
            }
            ensure_users_exist(conn, &relationships.user_ids())?;

            let row = input.into_row(id.clone(), now());
            diesel::insert_into(documents::table)
                .values(&row)
                .execute(conn)?;

            for relationship in relationships.into_replacements() {
                replace_relationship(conn, &id, &relationship)?;
            }

            load_aggregate(conn, &id)?
                .ok_or_else(|| StoreError::not_found(format!("document {id} not found")))
        })?;

        tracing::info!(
            document_id = %aggregate.document.id,
            document_code = %aggregate.document.document_code,
            "document created"
        );
        Ok(aggregate)
    }

    /// Applies only the supplied fields and replaces only the supplied
    /// relationship kinds.
    pub fn update_with_relationships(
        &self,
        id: &str,
        patch: DocumentPatch,
        relationships: RelationshipSet,
    ) -> StoreResult<DocumentAggregate> {
        if let Some(code) = patch.document_code.as_deref() {
            validate_code(code)?;
        }
        if let Some(version) = patch.version_number.as_deref() {
            validate_version(version)?;
        }
        let patch = DocumentPatch {
            document_code: patch.document_code.map(|code| code.trim().to_string()),
            ..patch
        };

        let aggregate = self.db.transaction(|conn| {
            let current = require_document(conn, id)?;
            if let Some(code) = patch.document_code.as_deref() {
                if code != current.document_code && code_taken(conn, code, Some(id))? {
                    return Err(StoreError::duplicate(format!(
                        "document code '{code}' already exists"
                    )));
                }
            }
            ensure_users_exist(conn, &relationships.user_ids())?;

            diesel::update(documents::table.find(id))
                .set((&patch, documents::updated_at.eq(bumped(current.updated_at))))
                .execute(conn)?;

            for relationship in relationships.into_replacements() {
                replace_relationship(conn, id, &relationship)?;
            }

            load_aggregate(conn, id)?
                .ok_or_else(|| StoreError::not_found(format!("document {id} not found")))
        })?;

        tracing::info!(document_id = %id, "document updated");
        Ok(aggregate)
    }

    pub fn add_comment(
        &self,
        document_id: &str,
        user_id: &str,
        text: &str,
    ) -> StoreResult<CommentWithAuthor> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::validation("comment must not be empty"));
        }

        let comment = self.db.transaction(|conn| {
            let document = require_document(conn, document_id)?;
            let author_name: String = users::table
                .find(user_id)
                .select(users::name)
                .first(conn)
                .optional()?
                .ok_or_else(|| StoreError::constraint(format!("user {user_id} does not exist")))?;

            let row = NewDocumentComment {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                user_id: user_id.to_string(),
                comment: text.to_string(),
                created_at: stamp_after(document.updated_at),
            };
            diesel::insert_into(document_comments::table)
                .values(&row)
                .execute(conn)?;
            diesel::update(documents::table.find(document_id))
                .set(documents::updated_at.eq(row.created_at))
                .execute(conn)?;

            Ok(CommentWithAuthor {
                comment: DocumentComment {
                    id: row.id,
                    document_id: row.document_id,
                    user_id: row.user_id,
                    comment: row.comment,
                    created_at: row.created_at,
                },
                author_name,
            })
        })?;

        tracing::info!(document_id = %document_id, user_id = %user_id, "comment added");
        Ok(comment)
    }

    /// Moves the document to `requested`, subject to the workflow policy.
    /// Any status write clears `pending_with`.
    pub fn update_status(
        &self,
        document_id: &str,
        requested: DocumentStatus,
        actor_id: &str,
    ) -> StoreResult<StatusChange> {
        let workflow = self.workflow;
        let change = self.db.transaction(|conn| {
            let current = require_document(conn, document_id)?;
            let target = workflow.resolve(current.status, requested)?;
            let changed_at = bumped(current.updated_at);

            diesel::update(documents::table.find(document_id))
                .set((
                    documents::status.eq(target),
                    documents::pending_with.eq(None::<String>),
                    documents::updated_at.eq(changed_at),
                ))
                .execute(conn)?;

            Ok(StatusChange {
                document_id: document_id.to_string(),
                actor_id: actor_id.to_string(),
                from: current.status,
                requested,
                to: target,
                changed_at,
            })
        })?;

        tracing::info!(
            document_id = %document_id,
            actor = %actor_id,
            from = %change.from,
            to = %change.to,
            "document status changed"
        );
        Ok(change)
    }

    pub fn archive(&self, document_id: &str, actor_id: &str) -> StoreResult<StatusChange> {
        self.update_status(document_id, DocumentStatus::Archived, actor_id)
    }

    pub fn soft_delete(&self, document_id: &str, actor_id: &str) -> StoreResult<StatusChange> {
        self.update_status(document_id, DocumentStatus::Deleted, actor_id)
    }

    /// Removes the document and, by cascade, every relationship, comment,
    /// file and change-request row.
    pub fn delete_document(&self, document_id: &str) -> StoreResult<()> {
        self.db.transaction(|conn| {
            if crud::delete_by_id::<Document>(conn, document_id)? == 0 {
                return Err(StoreError::not_found(format!(
                    "document {document_id} not found"
                )));
            }
            Ok(())
        })?;
        tracing::info!(document_id = %document_id, "document deleted");
        Ok(())
    }

    pub fn assign_pending_with(
        &self,
        document_id: &str,
        holder: Option<&str>,
    ) -> StoreResult<Document> {
        let holder = holder.map(str::trim).filter(|value| !value.is_empty());
        self.db.transaction(|conn| {
            let current = require_document(conn, document_id)?;
            diesel::update(documents::table.find(document_id))
                .set((
                    documents::pending_with.eq(holder),
                    documents::updated_at.eq(bumped(current.updated_at)),
                ))
                .execute(conn)?;
            require_document(conn, document_id)
        })
    }

    pub fn is_code_unique(&self, code: &str, exclude_id: Option<&str>) -> StoreResult<bool> {
        let code = code.trim();
        self.db
            .read(|conn| code_taken(conn, code, exclude_id).map(|taken| !taken))
    }

    pub fn find_by_code(&self, code: &str) -> StoreResult<Option<Document>> {
        let code = code.trim();
        self.db.read(|conn| {
            Ok(documents::table
                .filter(documents::document_code.eq(code))
                .filter(documents::status.ne(DocumentStatus::Deleted))
                .select(Document::as_select())
                .first(conn)
                .optional()?)
        })
    }

    pub fn attach_file(&self, document_id: &str, file: FileMetadata) -> StoreResult<DocumentFile> {
        if file.file_size < 0 {
            return Err(StoreError::validation("file size must not be negative"));
        }
        if file.file_hash.trim().is_empty() || file.file_path.trim().is_empty() {
            return Err(StoreError::validation("file hash and path are required"));
        }

        let stored = self.db.transaction(|conn| {
            let document = require_document(conn, document_id)?;
            if let Some(uploader) = file.uploaded_by.as_ref() {
                ensure_users_exist(conn, std::slice::from_ref(uploader))?;
            }

            let created_at = stamp_after(document.updated_at);
            let row = NewDocumentFile {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                file_name: file.file_name,
                original_name: file.original_name,
                file_path: file.file_path,
                file_size: file.file_size,
                mime_type: file.mime_type,
                file_hash: file.file_hash,
                storage_backend: file.storage_backend,
                uploaded_by: file.uploaded_by,
                created_at,
            };
            diesel::insert_into(document_files::table)
                .values(&row)
                .execute(conn)?;

            diesel::update(documents::table.find(document_id))
                .set((
                    documents::file_url.eq(&row.file_path),
                    documents::file_hash.eq(&row.file_hash),
                    documents::file_size.eq(row.file_size),
                    documents::mime_type.eq(&row.mime_type),
                    documents::updated_at.eq(created_at),
                ))
                .execute(conn)?;

            Ok(document_files::table
                .find(&row.id)
                .select(DocumentFile::as_select())
                .first(conn)?)
        })?;

        tracing::info!(
            document_id = %document_id,
            file_id = %stored.id,
            size = stored.file_size,
            "file attached"
        );
        Ok(stored)
    }
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Next `updated_at` value; never earlier than the stored one.
pub(crate) fn bumped(previous: NaiveDateTime) -> NaiveDateTime {
    now().max(previous)
}

// comments and files take their stamp from the document's updated_at, which
// each of them then advances, so newest-first order is insertion order
fn stamp_after(previous: NaiveDateTime) -> NaiveDateTime {
    now().max(previous + Duration::microseconds(1))
}

pub(crate) fn require_document(conn: &mut SqliteConnection, id: &str) -> StoreResult<Document> {
    crud::find_by_id::<Document>(conn, id)?
        .ok_or_else(|| StoreError::not_found(format!("document {id} not found")))
}

fn code_taken(
    conn: &mut SqliteConnection,
    code: &str,
    exclude_id: Option<&str>,
) -> StoreResult<bool> {
    let mut query = documents::table
        .filter(documents::document_code.eq(code))
        .filter(documents::status.ne(DocumentStatus::Deleted))
        .into_boxed();
    if let Some(exclude) = exclude_id {
        query = query.filter(documents::id.ne(exclude));
    }
    let count: i64 = query.count().get_result(conn)?;
    Ok(count > 0)
}

fn validate_code(code: &str) -> StoreResult<()> {
    if code.trim().is_empty() {
        return Err(StoreError::validation("document code must not be empty"));
    }
    Ok(())
}

pub(crate) fn is_valid_version(version: &str) -> bool {
    let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    version
        .split_once('.')
        .is_some_and(|(major, minor)| is_number(major) && is_number(minor))
}

fn validate_version(version: &str) -> StoreResult<()> {
    if !is_valid_version(version) {
        return Err(StoreError::validation(format!(
            "version number '{version}' must look like major.minor"
        )));
    }
    Ok(())
}

fn load_aggregate(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<DocumentAggregate>> {
    let Some(document) = crud::find_by_id::<Document>(conn, id)? else {
        return Ok(None);
    };

    let comments = document_comments::table
        .inner_join(users::table)
        .filter(document_comments::document_id.eq(id))
        .order((
            document_comments::created_at.desc(),
            document_comments::id.desc(),
        ))
        .select((DocumentComment::as_select(), users::name))
        .load::<(DocumentComment, String)>(conn)?
        .into_iter()
        .map(|(comment, author_name)| CommentWithAuthor {
            comment,
            author_name,
        })
        .collect();

    let files = document_files::table
        .filter(document_files::document_id.eq(id))
        .order((document_files::created_at.desc(), document_files::id.desc()))
        .select(DocumentFile::as_select())
        .load(conn)?;

    Ok(Some(DocumentAggregate {
        owners: relationships::load_users(conn, id, RelationshipKind::Owners)?,
        reviewers: relationships::load_users(conn, id, RelationshipKind::Reviewers)?,
        creators: relationships::load_users(conn, id, RelationshipKind::Creators)?,
        compliance_contacts: relationships::load_users(
            conn,
            id,
            RelationshipKind::ComplianceContacts,
        )?,
        compliance_names: relationships::load_compliance_names(conn, id)?,
        comments,
        files,
        document,
    }))
}
