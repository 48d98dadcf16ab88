use anyhow::{Context, Result};
use tempfile::TempDir;

use doc_registry::config::AppConfig;
use doc_registry::constants::{DocumentStatus, UserRole};
use doc_registry::documents::{DocumentAggregate, RelationshipSet};
use doc_registry::identity::Actor;
use doc_registry::models::{CreateDocument, User};
use doc_registry::state::AppState;
use doc_registry::users::CreateUser;
use doc_registry::workflow::TransitionPolicy;

/// An isolated registry on a fresh database file, removed on drop.
pub struct TestApp {
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_policy(TransitionPolicy::Permissive)
    }

    pub fn with_policy(policy: TransitionPolicy) -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let path = dir.path().join("registry.db");
        let mut config = AppConfig::for_database(path.to_string_lossy());
        config.transition_policy = policy;
        let state = AppState::connect(config).context("failed to open test database")?;
        Ok(Self { state, _dir: dir })
    }

    pub fn insert_user(&self, name: &str, role: UserRole) -> Result<User> {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        self.state
            .users
            .create(CreateUser {
                name: name.to_string(),
                email,
                role,
                department: None,
                country: None,
            })
            .context("failed to insert user")
    }

    pub fn actor(&self, user: &User) -> Actor {
        Actor::new(user.id.clone(), user.role)
    }

    pub fn admin(&self) -> Result<Actor> {
        let user = self.insert_user("Registry Admin", UserRole::Admin)?;
        Ok(self.actor(&user))
    }

    pub fn create_document(&self, code: &str, department: &str) -> Result<DocumentAggregate> {
        self.create_document_with(
            CreateDocument::new(code, format!("{code} procedure"), "SOP", department),
            RelationshipSet::default(),
        )
    }

    pub fn create_document_with(
        &self,
        input: CreateDocument,
        relationships: RelationshipSet,
    ) -> Result<DocumentAggregate> {
        self.state
            .documents
            .create_with_relationships(input, relationships)
            .context("failed to create document")
    }

    pub fn status_of(&self, document_id: &str) -> Result<DocumentStatus> {
        Ok(self
            .state
            .documents
            .get(document_id)?
            .context("document missing")?
            .status)
    }
}

#[allow(dead_code)]
pub fn pause() {
    std::thread::sleep(std::time::Duration::from_millis(5));
}
