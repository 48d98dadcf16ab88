use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use serde::{Deserialize, Serialize};

use crate::constants::{DocumentStatus, UserRole};
use crate::crud::Direction;
use crate::db::{fold_case, Database};
use crate::error::StoreResult;
use crate::identity::Actor;
use crate::models::Document;
use crate::schema::{document_creators, document_owners, document_reviewers, documents};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentFilters {
    pub status: Option<DocumentStatus>,
    pub department: Option<String>,
    pub country: Option<String>,
    pub document_type: Option<String>,
    /// Case-insensitive substring over name, code and description. Both
    /// sides are lowercased with Unicode rules before matching.
    pub search: Option<String>,
    pub created_by_user_id: Option<String>,
    pub owned_by_user_id: Option<String>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: i64,
    limit: i64,
}

impl Pagination {
    /// Clamps `page` to at least 1 and `limit` into `1..=100`.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    DocumentCode,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: Direction,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(pagination: Pagination, total: i64) -> Self {
        let limit = pagination.limit();
        let page = pagination.page();
        let total_pages = (total.max(0) + limit - 1) / limit;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub pagination: PageInfo,
}

/// Base set a listing starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Owned(String),
    Created(String),
    Reviewing(String),
}

impl Scope {
    /// Owners, creators and reviewers see only documents they are linked to;
    /// every other role sees the full set. This narrows results and is not an
    /// authorization check.
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            UserRole::DocumentOwner => Scope::Owned(actor.user_id.clone()),
            UserRole::DocumentCreator => Scope::Created(actor.user_id.clone()),
            UserRole::Reviewer => Scope::Reviewing(actor.user_id.clone()),
            _ => Scope::All,
        }
    }
}

#[derive(Clone)]
pub struct DocumentQuery {
    db: Database,
}

impl DocumentQuery {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn list(
        &self,
        scope: &Scope,
        filters: &DocumentFilters,
        pagination: Pagination,
        sort: Sort,
    ) -> StoreResult<DocumentPage> {
        self.db
            .read(|conn| list_documents(conn, scope, filters, pagination, sort))
    }

    pub fn list_for_actor(
        &self,
        actor: &Actor,
        filters: &DocumentFilters,
        pagination: Pagination,
        sort: Sort,
    ) -> StoreResult<DocumentPage> {
        self.list(&Scope::for_actor(actor), filters, pagination, sort)
    }
}

pub fn list_documents(
    conn: &mut SqliteConnection,
    scope: &Scope,
    filters: &DocumentFilters,
    pagination: Pagination,
    sort: Sort,
) -> StoreResult<DocumentPage> {
    let total: i64 = filtered(scope, filters).count().get_result(conn)?;

    let documents = sorted(filtered(scope, filters), sort)
        .limit(pagination.limit())
        .offset(pagination.offset())
        .select(Document::as_select())
        .load(conn)?;

    tracing::debug!(
        total,
        page = pagination.page(),
        returned = documents.len(),
        "listed documents"
    );

    Ok(DocumentPage {
        documents,
        pagination: PageInfo::new(pagination, total),
    })
}

fn filtered<'a>(scope: &'a Scope, filters: &'a DocumentFilters) -> documents::BoxedQuery<'a, Sqlite> {
    let mut query = documents::table.into_boxed();

    query = match scope {
        Scope::All => query,
        Scope::Owned(user_id) => query.filter(
            documents::id.eq_any(
                document_owners::table
                    .filter(document_owners::user_id.eq(user_id))
                    .select(document_owners::document_id),
            ),
        ),
        Scope::Created(user_id) => query.filter(
            documents::id.eq_any(
                document_creators::table
                    .filter(document_creators::user_id.eq(user_id))
                    .select(document_creators::document_id),
            ),
        ),
        Scope::Reviewing(user_id) => query.filter(
            documents::id.eq_any(
                document_reviewers::table
                    .filter(document_reviewers::user_id.eq(user_id))
                    .select(document_reviewers::document_id),
            ),
        ),
    };

    match filters.status {
        Some(status) => query = query.filter(documents::status.eq(status)),
        None if !filters.include_deleted => {
            query = query.filter(documents::status.ne(DocumentStatus::Deleted))
        }
        None => {}
    }
    if let Some(department) = non_empty(&filters.department) {
        query = query.filter(documents::department.eq(department));
    }
    if let Some(country) = non_empty(&filters.country) {
        query = query.filter(documents::country.eq(country));
    }
    if let Some(document_type) = non_empty(&filters.document_type) {
        query = query.filter(documents::document_type.eq(document_type));
    }
    if let Some(search) = non_empty(&filters.search) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        query = query.filter(
            fold_case(documents::name.nullable())
                .like(pattern.clone())
                .escape('\\')
                .or(fold_case(documents::document_code.nullable())
                    .like(pattern.clone())
                    .escape('\\'))
                .or(fold_case(documents::description)
                    .like(pattern)
                    .escape('\\')),
        );
    }
    if let Some(user_id) = non_empty(&filters.created_by_user_id) {
        query = query.filter(
            documents::id.eq_any(
                document_creators::table
                    .filter(document_creators::user_id.eq(user_id))
                    .select(document_creators::document_id),
            ),
        );
    }
    if let Some(user_id) = non_empty(&filters.owned_by_user_id) {
        query = query.filter(
            documents::id.eq_any(
                document_owners::table
                    .filter(document_owners::user_id.eq(user_id))
                    .select(document_owners::document_id),
            ),
        );
    }

    query
}

fn sorted<'a>(
    query: documents::BoxedQuery<'a, Sqlite>,
    sort: Sort,
) -> documents::BoxedQuery<'a, Sqlite> {
    let query = match (sort.field, sort.direction) {
        (SortField::CreatedAt, Direction::Asc) => query.order_by(documents::created_at.asc()),
        (SortField::CreatedAt, Direction::Desc) => query.order_by(documents::created_at.desc()),
        (SortField::UpdatedAt, Direction::Asc) => query.order_by(documents::updated_at.asc()),
        (SortField::UpdatedAt, Direction::Desc) => query.order_by(documents::updated_at.desc()),
        (SortField::Name, Direction::Asc) => query.order_by(documents::name.asc()),
        (SortField::Name, Direction::Desc) => query.order_by(documents::name.desc()),
        (SortField::DocumentCode, Direction::Asc) => query.order_by(documents::document_code.asc()),
        (SortField::DocumentCode, Direction::Desc) => {
            query.order_by(documents::document_code.desc())
        }
        (SortField::Status, Direction::Asc) => query.order_by(documents::status.asc()),
        (SortField::Status, Direction::Desc) => query.order_by(documents::status.desc()),
    };
    query.then_order_by(documents::id.asc())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination::new(0, 500);
        assert_eq!((p.page(), p.limit()), (1, 100));
        let p = Pagination::new(-3, 0);
        assert_eq!((p.page(), p.limit()), (1, 1));
        assert_eq!(Pagination::new(3, 10).offset(), 20);
    }

    #[test]
    fn page_info_follows_ceiling_division() {
        let info = PageInfo::new(Pagination::new(1, 2), 5);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
        assert!(!info.has_prev);

        let last = PageInfo::new(Pagination::new(3, 2), 5);
        assert!(!last.has_next);
        assert!(last.has_prev);

        let empty = PageInfo::new(Pagination::new(1, 10), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn page_info_serializes_camel_case() {
        let json = serde_json::to_value(PageInfo::new(Pagination::new(2, 10), 25)).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasPrev"], true);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn scope_follows_role() {
        let owner = Actor::new("u1", UserRole::DocumentOwner);
        assert_eq!(Scope::for_actor(&owner), Scope::Owned("u1".into()));
        let reviewer = Actor::new("u2", UserRole::Reviewer);
        assert_eq!(Scope::for_actor(&reviewer), Scope::Reviewing("u2".into()));
        let admin = Actor::new("u3", UserRole::Admin);
        assert_eq!(Scope::for_actor(&admin), Scope::All);
    }
}
