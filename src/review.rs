use chrono::{Duration, NaiveDate};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::constants::DocumentStatus;
use crate::db::Database;
use crate::error::StoreResult;
use crate::schema::documents;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSweep {
    pub breached: usize,
    pub review_due: usize,
    pub needs_review: usize,
}

#[derive(Clone)]
pub struct ReviewScheduler {
    db: Database,
}

impl ReviewScheduler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn refresh(&self, today: NaiveDate, window_days: i64) -> StoreResult<ReviewSweep> {
        let sweep = self
            .db
            .transaction(|conn| refresh_review_flags(conn, today, window_days))?;
        tracing::info!(
            breached = sweep.breached,
            review_due = sweep.review_due,
            needs_review = sweep.needs_review,
            %today,
            "review flags refreshed"
        );
        Ok(sweep)
    }
}

/// Sets each flag where its condition holds and clears it elsewhere, without
/// touching `updated_at`. Returns the number of documents left flagged.
pub fn refresh_review_flags(
    conn: &mut SqliteConnection,
    today: NaiveDate,
    window_days: i64,
) -> StoreResult<ReviewSweep> {
    let horizon = today + Duration::days(window_days.max(0));

    diesel::update(documents::table.filter(documents::is_breached.eq(true)))
        .set(documents::is_breached.eq(false))
        .execute(conn)?;
    let breached = diesel::update(
        documents::table
            .filter(documents::review_deadline.lt(today))
            .filter(documents::status.ne_all(DocumentStatus::SETTLED)),
    )
    .set(documents::is_breached.eq(true))
    .execute(conn)?;

    diesel::update(documents::table.filter(documents::review_due.eq(true)))
        .set(documents::review_due.eq(false))
        .execute(conn)?;
    let review_due = diesel::update(
        documents::table
            .filter(documents::next_revision_date.le(horizon))
            .filter(documents::status.eq_any(DocumentStatus::PUBLISHED)),
    )
    .set(documents::review_due.eq(true))
    .execute(conn)?;

    diesel::update(documents::table.filter(documents::needs_review.eq(true)))
        .set(documents::needs_review.eq(false))
        .execute(conn)?;
    let needs_review = diesel::update(
        documents::table
            .filter(documents::next_revision_date.le(today))
            .filter(documents::status.eq_any(DocumentStatus::PUBLISHED)),
    )
    .set(documents::needs_review.eq(true))
    .execute(conn)?;

    Ok(ReviewSweep {
        breached,
        review_due,
        needs_review,
    })
}
