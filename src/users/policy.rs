//! Who may change which user record.
//!
//! Every authorization rule of the users service lives here as a named
//! predicate so the rules can be read, and tested, in one place.

use uuid::Uuid;

use crate::users::repo_types::{Role, User};

/// The authenticated caller, reduced to what the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

impl Requester {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Requester {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            role: u.role,
        }
    }
}

pub fn is_self(requester: &Requester, target_id: Uuid) -> bool {
    requester.id == target_id
}

pub fn can_view(requester: &Requester, target_id: Uuid) -> bool {
    requester.is_admin() || is_self(requester, target_id)
}

pub fn can_modify(requester: &Requester, target_id: Uuid) -> bool {
    requester.is_admin() || is_self(requester, target_id)
}

/// Only a non-admin editing their own record must prove the current password.
///
/// An admin editing their own record through the self-service path is not
/// asked for it. Whether that should change is an open decision; the
/// behaviour is pinned by `admin_self_password_change_needs_no_proof`.
pub fn requires_current_password(requester: &Requester, target_id: Uuid) -> bool {
    !requester.is_admin() && is_self(requester, target_id)
}

pub fn can_change_role(requester: &Requester) -> bool {
    requester.is_admin()
}

/// Email only changes through the elevated edit path, which is admin-only.
pub fn can_change_email(requester: &Requester) -> bool {
    requester.is_admin()
}

pub fn can_remove_users(requester: &Requester) -> bool {
    requester.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Requester {
        Requester {
            id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn standard() -> Requester {
        Requester {
            id: Uuid::new_v4(),
            role: Role::User,
        }
    }

    #[test]
    fn modify_and_view_are_admin_or_self() {
        let (a, u) = (admin(), standard());
        let other = Uuid::new_v4();
        assert!(can_modify(&a, other));
        assert!(can_modify(&u, u.id));
        assert!(!can_modify(&u, other));
        assert!(can_view(&a, u.id));
        assert!(can_view(&u, u.id));
        assert!(!can_view(&u, a.id));
    }

    #[test]
    fn current_password_only_for_standard_self_edit() {
        let (a, u) = (admin(), standard());
        assert!(requires_current_password(&u, u.id));
        assert!(!requires_current_password(&a, u.id));
        // the asymmetry: admins skip the proof on their own record too
        assert!(!requires_current_password(&a, a.id));
    }

    #[test]
    fn elevated_capabilities_are_admin_only() {
        let (a, u) = (admin(), standard());
        assert!(can_change_role(&a));
        assert!(!can_change_role(&u));
        assert!(can_change_email(&a));
        assert!(!can_change_email(&u));
        assert!(can_remove_users(&a));
        assert!(!can_remove_users(&u));
    }
}
