use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::users::repo::{SortBy, SortOrder, UserFilter};
use crate::users::repo_types::{Role, User};
use crate::validation::{self, Validate};

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            last_login: u.last_login_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Admin-initiated creation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Validate for CreateUserRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        validation::name(&mut self.name)?;
        validation::email(&mut self.email)?;
        validation::password(&self.password)
    }
}

/// Self-service change-set. Email can only change through the elevated edit.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    /// Proof of the current secret; checked, never stored.
    pub current_password: Option<String>,
    pub role: Option<Role>,
}

impl Validate for UpdateUserRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = self.name.as_mut() {
            validation::name(name)?;
        }
        if let Some(password) = self.password.as_deref() {
            validation::password(password)?;
        }
        Ok(())
    }
}

/// Elevated edit change-set; every field optional and independent.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminEditRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl Validate for AdminEditRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = self.name.as_mut() {
            validation::name(name)?;
        }
        if let Some(email) = self.email.as_mut() {
            validation::email(email)?;
        }
        if let Some(password) = self.password.as_deref() {
            validation::password(password)?;
        }
        Ok(())
    }
}

/// Raw listing query; converted with [`UserQuery::into_filter`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub role: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl UserQuery {
    pub fn into_filter(self) -> Result<UserFilter, AppError> {
        let role = match self.role.as_deref() {
            None | Some("") => None,
            Some(r) => Some(r.parse::<Role>().map_err(AppError::BadRequest)?),
        };
        let sort_by = match self.sort_by.as_deref() {
            None | Some("") | Some("name") => SortBy::Name,
            Some("createdAt") => SortBy::CreatedAt,
            Some(other) => {
                return Err(AppError::bad_request(format!("cannot sort by {}", other)));
            }
        };
        let order = match self.order.as_deref() {
            None | Some("") | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(AppError::bad_request(format!("unknown order {}", other)));
            }
        };
        Ok(UserFilter {
            role,
            sort_by,
            order,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EditedBy {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Elevated edit result, annotated with who made the change and when.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEditResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub edited_by: EditedBy,
    #[serde(with = "time::serde::rfc3339")]
    pub edited_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_carries_the_hash() {
        let user = User::new(
            "Ana".into(),
            "ana@example.com".into(),
            "$argon2id$secret".into(),
            Role::User,
        );
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["role"], "user");
        assert!(json["lastLogin"].is_null());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn update_request_rejects_email_field() {
        let res = serde_json::from_str::<UpdateUserRequest>(r#"{"email":"x@example.com"}"#);
        assert!(res.is_err());
        let ok: UpdateUserRequest =
            serde_json::from_str(r#"{"password":"new123456","currentPassword":"old"}"#).unwrap();
        assert_eq!(ok.current_password.as_deref(), Some("old"));
    }

    #[test]
    fn update_request_validates_present_fields_only() {
        let mut empty = UpdateUserRequest::default();
        assert!(empty.validate().is_ok());

        let mut short = UpdateUserRequest {
            password: Some("123".into()),
            ..Default::default()
        };
        assert!(matches!(short.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn query_defaults_and_rejections() {
        let f = UserQuery::default().into_filter().unwrap();
        assert_eq!(f, UserFilter::default());

        let f = UserQuery {
            role: Some("admin".into()),
            sort_by: Some("createdAt".into()),
            order: Some("desc".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(f.role, Some(Role::Admin));
        assert_eq!(f.sort_by, SortBy::CreatedAt);
        assert_eq!(f.order, SortOrder::Desc);

        let bad = UserQuery {
            sort_by: Some("email".into()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }

    #[test]
    fn admin_edit_response_flattens_user() {
        let admin = User::new("Root".into(), "root@example.com".into(), "h".into(), Role::Admin);
        let target = User::new("Ana".into(), "ana@example.com".into(), "h".into(), Role::User);
        let resp = AdminEditResponse {
            user: target.clone().into(),
            edited_by: EditedBy {
                id: admin.id,
                name: admin.name,
                email: admin.email,
            },
            edited_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["id"], target.id.to_string());
        assert_eq!(json["editedBy"]["email"], "root@example.com");
        assert!(json.get("editedAt").is_some());
    }
}
