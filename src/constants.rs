use std::fmt;
use std::str::FromStr;

use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = diesel::sql_types::Text)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.as_str());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
                Ok(raw.parse()?)
            }
        }
    };
}

text_enum! {
    DocumentStatus ("document status") {
        Draft => "draft",
        UnderReview => "under-review",
        PendingCreatorApproval => "pending-creator-approval",
        PendingRequesterApproval => "pending-requester-approval",
        UnderRevision => "under-revision",
        PendingOwnerApproval => "pending-owner-approval",
        Approved => "approved",
        Rejected => "rejected",
        Live => "live",
        LiveCr => "live-cr",
        Archived => "archived",
        Deleted => "deleted",
        Queried => "queried",
        Reviewed => "reviewed",
        PendingWithRequester => "pending-with-requester",
    }
}

impl DocumentStatus {
    /// Statuses a document may be created with.
    pub const INITIAL: &'static [DocumentStatus] =
        &[DocumentStatus::Draft, DocumentStatus::UnderReview];

    /// Statuses counted as "waiting for an approval signature".
    pub const PENDING_APPROVAL: &'static [DocumentStatus] = &[
        DocumentStatus::PendingOwnerApproval,
        DocumentStatus::PendingCreatorApproval,
        DocumentStatus::PendingRequesterApproval,
    ];

    pub const PUBLISHED: &'static [DocumentStatus] = &[DocumentStatus::Live, DocumentStatus::LiveCr];

    /// Statuses in which a review deadline no longer applies.
    pub const SETTLED: &'static [DocumentStatus] = &[
        DocumentStatus::Live,
        DocumentStatus::LiveCr,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::Archived,
        DocumentStatus::Deleted,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Archived | DocumentStatus::Deleted)
    }

    pub fn is_published(&self) -> bool {
        Self::PUBLISHED.contains(self)
    }
}

text_enum! {
    UserRole ("user role") {
        Admin => "admin",
        DocumentController => "document-controller",
        DocumentCreator => "document-creator",
        DocumentOwner => "document-owner",
        Reviewer => "reviewer",
        Requester => "requester",
        DocumentRequester => "document-requester",
    }
}

text_enum! {
    RequestType ("change request type") {
        Revision => "revision",
        Correction => "correction",
        Update => "update",
        Deletion => "deletion",
    }
}

text_enum! {
    ChangeRequestStatus ("change request status") {
        Pending => "pending",
        UnderReview => "under-review",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl ChangeRequestStatus {
    pub const OPEN: &'static [ChangeRequestStatus] =
        &[ChangeRequestStatus::Pending, ChangeRequestStatus::UnderReview];

    pub fn is_resolved(&self) -> bool {
        !Self::OPEN.contains(self)
    }
}

text_enum! {
    Priority ("priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

text_enum! {
    StorageBackend ("storage backend") {
        Local => "local",
        ObjectStore => "object-store",
    }
}
