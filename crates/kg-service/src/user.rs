use std::sync::Arc;

use kg_store::UserStore;
use kg_types::{is_valid_email, NewUser, RegisterUser, UpdateUser, UserId, UserProfile};

use crate::conflict;
use crate::effects::Effects;
use crate::error::{ServiceError, ServiceResult};
use crate::password::hash_password;

/// Registration and profile management.
///
/// User writes publish no events.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    effects: Effects,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, effects: Effects) -> Self {
        Self { users, effects }
    }

    /// Create an account. The password is stored as an argon2id hash.
    pub async fn register(&self, req: RegisterUser) -> ServiceResult<UserId> {
        const OP: &str = "service.user.register";
        let username = required("username", &req.username)?;
        let email = required("email", &req.email)?;
        if req.password.is_empty() {
            return Err(ServiceError::InvalidInput("password is required".into()));
        }
        if !is_valid_email(email) {
            return Err(ServiceError::InvalidEmail);
        }

        let password_hash = hash_password(&req.password)
            .map_err(|e| ServiceError::unexpected(OP, format!("hash password: {e}")))?;
        let row = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        };
        let id = self
            .effects
            .store(OP, self.users.insert_user(&row))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::user))?;

        tracing::info!(user = %id, username = %row.username, "user registered");
        Ok(id)
    }

    pub async fn get(&self, id: UserId) -> ServiceResult<UserProfile> {
        const OP: &str = "service.user.get";
        match self.effects.store(OP, self.users.get_user(id)).await? {
            Ok(Some(user)) => Ok(user.profile()),
            Ok(None) => Err(ServiceError::UserNotFound),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }

    /// Apply the present fields of `update`.
    pub async fn update(&self, mut update: UpdateUser) -> ServiceResult<()> {
        const OP: &str = "service.user.update";
        if let Some(username) = update.username.take() {
            update.username = Some(required("username", &username)?.to_string());
        }
        if let Some(email) = update.email.take() {
            let email = required("email", &email)?;
            if !is_valid_email(email) {
                return Err(ServiceError::InvalidEmail);
            }
            update.email = Some(email.to_string());
        }

        match self.effects.store(OP, self.users.update_user(&update)).await? {
            Ok(0) => Err(ServiceError::UserNotFound),
            Ok(_) => {
                tracing::info!(user = %update.id, "user updated");
                Ok(())
            }
            Err(e) => Err(conflict::translate(OP, e, conflict::user)),
        }
    }

    /// Delete a user together with their posts, likes and follow edges.
    pub async fn delete(&self, id: UserId) -> ServiceResult<()> {
        const OP: &str = "service.user.delete";
        match self.effects.store(OP, self.users.delete_user(id)).await? {
            Ok(0) => Err(ServiceError::UserNotFound),
            Ok(_) => {
                tracing::info!(user = %id, "user deleted");
                Ok(())
            }
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }

    /// Point the profile picture at an already stored photo url.
    pub async fn set_profile_pic(&self, id: UserId, url: &str) -> ServiceResult<()> {
        const OP: &str = "service.user.set_profile_pic";
        match self.effects.store(OP, self.users.set_profile_pic(id, url)).await? {
            Ok(0) => Err(ServiceError::UserNotFound),
            Ok(_) => Ok(()),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> ServiceResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}
