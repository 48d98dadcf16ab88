use std::collections::HashSet;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{ComplianceName, ComplianceNameInput, NewComplianceName, RelatedUser};
use crate::schema::{
    compliance_contacts, compliance_names, document_creators, document_owners,
    document_reviewers, users,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    Owners,
    Reviewers,
    Creators,
    ComplianceContacts,
    ComplianceNames,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Owners => "owners",
            RelationshipKind::Reviewers => "reviewers",
            RelationshipKind::Creators => "creators",
            RelationshipKind::ComplianceContacts => "compliance_contacts",
            RelationshipKind::ComplianceNames => "compliance_names",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Relationship {
    Owners(Vec<String>),
    Reviewers(Vec<String>),
    Creators(Vec<String>),
    ComplianceContacts(Vec<String>),
    ComplianceNames(Vec<ComplianceNameInput>),
}

impl Relationship {
    pub fn kind(&self) -> RelationshipKind {
        match self {
            Relationship::Owners(_) => RelationshipKind::Owners,
            Relationship::Reviewers(_) => RelationshipKind::Reviewers,
            Relationship::Creators(_) => RelationshipKind::Creators,
            Relationship::ComplianceContacts(_) => RelationshipKind::ComplianceContacts,
            Relationship::ComplianceNames(_) => RelationshipKind::ComplianceNames,
        }
    }
}

/// Relationship input for create and update. A kind left as `None` is not
/// touched; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelationshipSet {
    pub owners: Option<Vec<String>>,
    pub reviewers: Option<Vec<String>>,
    pub creators: Option<Vec<String>>,
    pub compliance_contacts: Option<Vec<String>>,
    pub compliance_names: Option<Vec<ComplianceNameInput>>,
}

impl RelationshipSet {
    pub fn is_empty(&self) -> bool {
        self.owners.is_none()
            && self.reviewers.is_none()
            && self.creators.is_none()
            && self.compliance_contacts.is_none()
            && self.compliance_names.is_none()
    }

    pub fn user_ids(&self) -> Vec<String> {
        let lists = [
            &self.owners,
            &self.reviewers,
            &self.creators,
            &self.compliance_contacts,
        ];
        dedup(
            lists
                .into_iter()
                .flatten()
                .flatten()
                .map(|id| id.trim().to_string()),
        )
    }

    pub fn into_replacements(self) -> Vec<Relationship> {
        let mut out = Vec::new();
        if let Some(ids) = self.owners {
            out.push(Relationship::Owners(ids));
        }
        if let Some(ids) = self.reviewers {
            out.push(Relationship::Reviewers(ids));
        }
        if let Some(ids) = self.creators {
            out.push(Relationship::Creators(ids));
        }
        if let Some(ids) = self.compliance_contacts {
            out.push(Relationship::ComplianceContacts(ids));
        }
        if let Some(names) = self.compliance_names {
            out.push(Relationship::ComplianceNames(names));
        }
        out
    }
}

fn dedup<T, I>(items: I) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

macro_rules! replace_join_rows {
    ($conn:expr, $table:ident, $document_id:expr, $user_ids:expr) => {{
        diesel::delete($table::table.filter($table::document_id.eq($document_id)))
            .execute($conn)?;
        let mut inserted = 0;
        for user_id in dedup($user_ids.iter().map(|id| id.trim().to_string())) {
            inserted += diesel::insert_into($table::table)
                .values((
                    $table::document_id.eq($document_id),
                    $table::user_id.eq(user_id),
                ))
                .execute($conn)?;
        }
        inserted
    }};
}

/// Replaces every row of one relationship kind for `document_id` with the
/// supplied set: all existing rows of that kind are deleted, then each
/// distinct entry is inserted. Returns the number of rows written.
pub fn replace_relationship(
    conn: &mut SqliteConnection,
    document_id: &str,
    relationship: &Relationship,
) -> StoreResult<usize> {
    let written = match relationship {
        Relationship::Owners(ids) => replace_join_rows!(conn, document_owners, document_id, ids),
        Relationship::Reviewers(ids) => {
            replace_join_rows!(conn, document_reviewers, document_id, ids)
        }
        Relationship::Creators(ids) => {
            replace_join_rows!(conn, document_creators, document_id, ids)
        }
        Relationship::ComplianceContacts(ids) => {
            replace_join_rows!(conn, compliance_contacts, document_id, ids)
        }
        Relationship::ComplianceNames(names) => {
            diesel::delete(
                compliance_names::table.filter(compliance_names::document_id.eq(document_id)),
            )
            .execute(conn)?;
            let mut inserted = 0;
            for entry in dedup(names.iter().cloned()) {
                let name = entry.name.trim();
                if name.is_empty() {
                    return Err(StoreError::validation("compliance name must not be empty"));
                }
                inserted += diesel::insert_into(compliance_names::table)
                    .values(NewComplianceName {
                        id: Uuid::new_v4().to_string(),
                        document_id: document_id.to_string(),
                        name: name.to_string(),
                        email: entry.email.filter(|email| !email.trim().is_empty()),
                    })
                    .execute(conn)?;
            }
            inserted
        }
    };
    tracing::debug!(
        document_id = %document_id,
        kind = relationship.kind().as_str(),
        rows = written,
        "replaced document relationship"
    );
    Ok(written)
}

/// Fails with a constraint error unless every id names an existing user.
pub fn ensure_users_exist(conn: &mut SqliteConnection, ids: &[String]) -> StoreResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: i64 = users::table
        .filter(users::id.eq_any(ids))
        .count()
        .get_result(conn)?;
    if found as usize != ids.len() {
        return Err(StoreError::constraint("one or more users do not exist"));
    }
    Ok(())
}

macro_rules! load_related_users {
    ($conn:expr, $table:ident, $document_id:expr) => {
        $table::table
            .inner_join(users::table)
            .filter($table::document_id.eq($document_id))
            .filter(users::active.eq(true))
            .select((users::id, users::name, users::email, users::role))
            .order(users::name.asc())
            .load::<RelatedUser>($conn)?
    };
}

pub fn load_users(
    conn: &mut SqliteConnection,
    document_id: &str,
    kind: RelationshipKind,
) -> StoreResult<Vec<RelatedUser>> {
    let rows = match kind {
        RelationshipKind::Owners => load_related_users!(conn, document_owners, document_id),
        RelationshipKind::Reviewers => load_related_users!(conn, document_reviewers, document_id),
        RelationshipKind::Creators => load_related_users!(conn, document_creators, document_id),
        RelationshipKind::ComplianceContacts => {
            load_related_users!(conn, compliance_contacts, document_id)
        }
        RelationshipKind::ComplianceNames => Vec::new(),
    };
    Ok(rows)
}

pub fn load_compliance_names(
    conn: &mut SqliteConnection,
    document_id: &str,
) -> StoreResult<Vec<ComplianceName>> {
    Ok(compliance_names::table
        .filter(compliance_names::document_id.eq(document_id))
        .order(compliance_names::name.asc())
        .select(ComplianceName::as_select())
        .load(conn)?)
}
