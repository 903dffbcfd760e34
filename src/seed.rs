use tracing::info;

use crate::error::AppResult;
use crate::users::dto::CreateUserRequest;
use crate::users::repo_types::Role;
use crate::users::services::UserService;

struct DefaultUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
}

const DEFAULT_USERS: [DefaultUser; 2] = [
    DefaultUser {
        name: "Administrador",
        email: "admin@conectar.com",
        password: "admin123",
        role: Role::Admin,
    },
    DefaultUser {
        name: "Usuário Teste",
        email: "user@conectar.com",
        password: "user123",
        role: Role::User,
    },
];

/// Creates the default admin and user accounts when they are missing.
/// Returns how many accounts were created.
pub async fn seed_default_users(users: &UserService) -> AppResult<usize> {
    let mut created = 0;
    for d in DEFAULT_USERS {
        if users.exists_by_email(d.email).await? {
            info!(email = d.email, "default user already present");
            continue;
        }
        users
            .create_user(CreateUserRequest {
                name: d.name.into(),
                email: d.email.into(),
                password: d.password.into(),
                role: Some(d.role),
            })
            .await?;
        info!(email = d.email, role = %d.role, "default user created");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let state = AppState::fake();
        assert_eq!(seed_default_users(&state.users).await.unwrap(), 2);
        assert_eq!(seed_default_users(&state.users).await.unwrap(), 0);

        let (admin, _) = state
            .auth
            .authenticate("admin@conectar.com", "admin123")
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        let (user, _) = state
            .auth
            .authenticate("user@conectar.com", "user123")
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
    }
}
