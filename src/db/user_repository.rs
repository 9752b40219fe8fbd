use sea_orm::{ ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set };
use uuid::Uuid;

use crate::db::entity::user;
use crate::error::{ AppError, Result };

#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, email: String, password_hash: String) -> Result<user::Model> {
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            is_staff: Set(false),
            date_joined: Set(chrono::Utc::now()),
        };

        let user = user.insert(&self.db).await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<user::Model> {
        user::Entity
            ::find_by_id(id)
            .one(&self.db).await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        let user = user::Entity::find().filter(user::Column::Email.eq(email)).one(&self.db).await?;

        Ok(user)
    }

    pub async fn update_email(&self, user: user::Model, email: String) -> Result<user::Model> {
        let mut active: user::ActiveModel = user.into();
        active.email = Set(email);

        let user = active.update(&self.db).await?;
        Ok(user)
    }
}
