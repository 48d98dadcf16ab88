//! Caller identity handed to every command.
//!
//! The registry trusts the caller: whoever builds an [`Actor`] has already
//! authenticated the user and decided they may perform the action. Nothing in
//! this crate checks credentials or role permissions. The role only narrows
//! which documents a listing returns.

use serde::{Deserialize, Serialize};

use crate::constants::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
