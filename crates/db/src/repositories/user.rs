//! Account user repository for database operations.

use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entities::account_users;

/// Account user repository.
#[derive(Debug, Clone)]
pub struct AccountUserRepository {
    db: DatabaseConnection,
}

impl AccountUserRepository {
    /// Creates a new account user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an account user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<account_users::Model>, DbErr> {
        account_users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Creates a new account user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, name: &str) -> Result<account_users::Model, DbErr> {
        let now = chrono::Utc::now();
        let user = account_users::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        user.insert(&self.db).await
    }
}
