use std::sync::Arc;

use crate::{
    change_requests::ChangeRequestRepository,
    config::AppConfig,
    db::Database,
    documents::DocumentRepository,
    error::StoreResult,
    query::DocumentQuery,
    review::ReviewScheduler,
    stats::StatisticsAggregator,
    users::UserDirectory,
    workflow::Workflow,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub workflow: Workflow,
    pub documents: DocumentRepository,
    pub query: DocumentQuery,
    pub stats: StatisticsAggregator,
    pub change_requests: ChangeRequestRepository,
    pub users: UserDirectory,
    pub review: ReviewScheduler,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let workflow = Workflow::new(config.transition_policy);
        Self {
            documents: DocumentRepository::new(db.clone(), workflow),
            query: DocumentQuery::new(db.clone()),
            stats: StatisticsAggregator::new(db.clone()),
            change_requests: ChangeRequestRepository::new(db.clone()),
            users: UserDirectory::new(db.clone()),
            review: ReviewScheduler::new(db.clone()),
            workflow,
            config: Arc::new(config),
            db,
        }
    }

    pub fn connect(config: AppConfig) -> StoreResult<Self> {
        let db = Database::connect(&config.database())?;
        Ok(Self::new(db, config))
    }
}
