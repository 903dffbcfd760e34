use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::users::dto::PublicUser;
use crate::validation::{self, Validate};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        validation::name(&mut self.name)?;
        validation::email(&mut self.email)?;
        validation::password(&self.password)
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        validation::email(&mut self.email)?;
        validation::non_empty("password", &self.password)
    }
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_is_normalized() {
        let mut req: RegisterRequest = serde_json::from_str(
            r#"{"name":" Maria ","email":" maria@example.com ","password":"senha123"}"#,
        )
        .unwrap();
        req.validate().unwrap();
        assert_eq!(req.name, "Maria");
        assert_eq!(req.email, "maria@example.com");
    }

    #[test]
    fn register_request_cannot_pick_a_role() {
        let res = serde_json::from_str::<RegisterRequest>(
            r#"{"name":"M","email":"m@example.com","password":"senha123","role":"admin"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn login_requires_password() {
        let mut req = LoginRequest {
            email: "a@example.com".into(),
            password: String::new(),
        };
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));
    }
}
