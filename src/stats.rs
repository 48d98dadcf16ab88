use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::constants::DocumentStatus;
use crate::db::Database;
use crate::error::StoreResult;
use crate::schema::documents;

/// Dashboard rollups over every stored document, soft-deleted ones included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: i64,
    pub by_status: BTreeMap<DocumentStatus, i64>,
    pub by_type: BTreeMap<String, i64>,
    pub by_department: BTreeMap<String, i64>,
    pub recently_created: i64,
    pub recent_window_days: i64,
    pub pending_review: i64,
    pub pending_approval: i64,
    pub live: i64,
}

impl Statistics {
    fn count_of(&self, statuses: &[DocumentStatus]) -> i64 {
        statuses
            .iter()
            .filter_map(|status| self.by_status.get(status))
            .sum()
    }
}

#[derive(Clone)]
pub struct StatisticsAggregator {
    db: Database,
}

impl StatisticsAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn collect(&self, now: NaiveDateTime, window_days: i64) -> StoreResult<Statistics> {
        self.db.read(|conn| collect(conn, now, window_days))
    }
}

pub fn collect(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
    window_days: i64,
) -> StoreResult<Statistics> {
    let total: i64 = documents::table.count().get_result(conn)?;

    let by_status: BTreeMap<DocumentStatus, i64> = documents::table
        .group_by(documents::status)
        .select((documents::status, count_star()))
        .load::<(DocumentStatus, i64)>(conn)?
        .into_iter()
        .collect();

    let by_type: BTreeMap<String, i64> = documents::table
        .group_by(documents::document_type)
        .select((documents::document_type, count_star()))
        .load::<(String, i64)>(conn)?
        .into_iter()
        .collect();

    let by_department: BTreeMap<String, i64> = documents::table
        .group_by(documents::department)
        .select((documents::department, count_star()))
        .load::<(String, i64)>(conn)?
        .into_iter()
        .collect();

    let window_days = window_days.max(0);
    let since = now - Duration::days(window_days);
    let recently_created: i64 = documents::table
        .filter(documents::created_at.ge(since))
        .count()
        .get_result(conn)?;

    let mut stats = Statistics {
        total,
        by_status,
        by_type,
        by_department,
        recently_created,
        recent_window_days: window_days,
        ..Default::default()
    };
    stats.pending_review = stats.count_of(&[DocumentStatus::UnderReview]);
    stats.pending_approval = stats.count_of(DocumentStatus::PENDING_APPROVAL);
    stats.live = stats.count_of(DocumentStatus::PUBLISHED);

    tracing::debug!(total, "collected document statistics");
    Ok(stats)
}
