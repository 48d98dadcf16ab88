use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::constants::UserRole;
use crate::crud::{self, Direction, FindOptions, SqlValue};
use crate::db::Database;
use crate::documents::now;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewUser, User};
use crate::schema::users;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Clone)]
pub struct UserDirectory {
    db: Database,
}

impl UserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, input: CreateUser) -> StoreResult<User> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() || !email.contains('@') {
            return Err(StoreError::validation("a user needs a name and a valid email"));
        }

        let user = self.db.transaction(|conn| {
            let taken: i64 = users::table
                .filter(users::email.eq(&email))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return Err(StoreError::duplicate(format!("email {email} is already registered")));
            }

            let stamp = now();
            let row = NewUser {
                id: Uuid::new_v4().to_string(),
                name,
                email,
                role: input.role,
                department: input.department,
                country: input.country,
                active: true,
                created_at: stamp,
                updated_at: stamp,
            };
            diesel::insert_into(users::table).values(&row).execute(conn)?;
            Ok(users::table
                .find(&row.id)
                .select(User::as_select())
                .first(conn)?)
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<User>> {
        self.db.read(|conn| crud::find_by_id::<User>(conn, id))
    }

    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        self.db.read(|conn| {
            Ok(crud::find_by::<User>(
                conn,
                &[("email", SqlValue::from(email))],
                &FindOptions {
                    limit: Some(1),
                    ..Default::default()
                },
            )?
            .pop())
        })
    }

    pub fn list_active(&self) -> StoreResult<Vec<User>> {
        self.db.read(|conn| {
            crud::find_by::<User>(
                conn,
                &[("active", SqlValue::Bool(true))],
                &FindOptions {
                    order_by: Some(("name", Direction::Asc)),
                    ..Default::default()
                },
            )
        })
    }

    /// Marks the user inactive. Relationship rows stay in place but the
    /// user no longer appears on loaded documents.
    pub fn deactivate(&self, id: &str) -> StoreResult<()> {
        self.db.transaction(|conn| {
            if crud::delete_by_id::<User>(conn, id)? == 0 {
                return Err(StoreError::not_found(format!("user {id} not found")));
            }
            crud::update_by_id::<User>(conn, id, Vec::new(), now())?;
            Ok(())
        })?;
        tracing::info!(user_id = %id, "user deactivated");
        Ok(())
    }

    pub fn count_active(&self) -> StoreResult<i64> {
        self.db
            .read(|conn| crud::count::<User>(conn, &[("active", SqlValue::Bool(true))]))
    }

    pub fn exists(&self, id: &str) -> StoreResult<bool> {
        self.db.read(|conn| crud::exists::<User>(conn, id))
    }
}
