//! Authorization policy.
//!
//! [`authorize`] is the single place that decides who may do what. It is pure: the
//! caller loads whatever ownership facts the decision needs (the registration's
//! student and DPL, whether the actor belongs to a posto) and passes them in.

use crate::{
    core::registration::RegistrationScope,
    errors::{Error, Result},
    models::Role,
};
use std::fmt;

/// The user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id
    pub user_id: i64,
    /// Role held by the user
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// What an operation touches, with the ownership facts needed to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Regions, fiscal years, waves and locations
    Registry,
    /// A student's registration and everything hanging off it (documents, grade,
    /// certificate)
    Registration {
        /// Registering student
        student_id: i64,
        /// Supervising lecturer, if assigned
        dpl_id: Option<i64>,
    },
    /// A posto
    Posto {
        /// Supervising lecturer, if assigned
        dpl_id: Option<i64>,
        /// Whether the actor is an active member of it
        is_member: bool,
    },
}

/// What the actor wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read
    View,
    /// Submit a new registration
    Submit,
    /// Review a registration
    Review,
    /// Create, change or delete
    Manage,
    /// Record a grade
    Grade,
    /// Post on a message board
    Post,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::View => "view",
            Self::Submit => "submit",
            Self::Review => "review",
            Self::Manage => "manage",
            Self::Grade => "grade",
            Self::Post => "post to",
        };
        f.write_str(name)
    }
}

fn allowed(actor: &Actor, resource: &Resource, action: Action) -> bool {
    if actor.role.is_administrative() {
        return action != Action::Submit;
    }

    let supervises = |dpl_id: &Option<i64>| {
        actor.role == Role::Lecturer && *dpl_id == Some(actor.user_id)
    };

    match (resource, action) {
        (Resource::Registry, Action::View) => true,
        (Resource::Registration { student_id, .. }, Action::Submit) => {
            actor.role == Role::Student && *student_id == actor.user_id
        }
        (Resource::Registration { student_id, dpl_id }, Action::View) => {
            (actor.role == Role::Student && *student_id == actor.user_id) || supervises(dpl_id)
        }
        (Resource::Registration { dpl_id, .. }, Action::Grade) => supervises(dpl_id),
        (Resource::Posto { dpl_id, is_member }, Action::View | Action::Post) => {
            (actor.role == Role::Student && *is_member) || supervises(dpl_id)
        }
        _ => false,
    }
}

/// Checks that `actor` may perform `action` on `resource`.
///
/// Admin and staff may do everything except submit registrations of their own.
/// Lecturers may view, grade and post for what they supervise. Students may submit
/// and view their own registration and view or post in postos they belong to.
/// Everything else fails with `Forbidden`.
pub fn authorize(actor: &Actor, resource: &Resource, action: Action) -> Result<()> {
    if allowed(actor, resource, action) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "{} {} may not {action} this {}",
            actor.role,
            actor.user_id,
            match resource {
                Resource::Registry => "registry data",
                Resource::Registration { .. } => "registration",
                Resource::Posto { .. } => "posto",
            }
        )))
    }
}

/// The registrations an actor may list.
#[must_use]
pub const fn registration_scope(actor: &Actor) -> RegistrationScope {
    match actor.role {
        Role::Student => RegistrationScope::Own(actor.user_id),
        Role::Lecturer => RegistrationScope::Supervised(actor.user_id),
        Role::Admin | Role::Staff => RegistrationScope::All,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    const STUDENT: Actor = Actor::new(10, Role::Student);
    const LECTURER: Actor = Actor::new(20, Role::Lecturer);
    const ADMIN: Actor = Actor::new(30, Role::Admin);
    const STAFF: Actor = Actor::new(40, Role::Staff);

    #[test]
    fn test_registry_is_managed_by_administrators() {
        for actor in [ADMIN, STAFF] {
            assert!(authorize(&actor, &Resource::Registry, Action::Manage).is_ok());
        }
        for actor in [STUDENT, LECTURER] {
            assert!(authorize(&actor, &Resource::Registry, Action::View).is_ok());
            let err = authorize(&actor, &Resource::Registry, Action::Manage).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
    }

    #[test]
    fn test_students_only_touch_their_own_registration() {
        let own = Resource::Registration {
            student_id: STUDENT.user_id,
            dpl_id: Some(LECTURER.user_id),
        };
        let other = Resource::Registration {
            student_id: 11,
            dpl_id: None,
        };

        assert!(authorize(&STUDENT, &own, Action::Submit).is_ok());
        assert!(authorize(&STUDENT, &own, Action::View).is_ok());
        assert!(authorize(&STUDENT, &other, Action::Submit).is_err());
        assert!(authorize(&STUDENT, &other, Action::View).is_err());
        assert!(authorize(&STUDENT, &own, Action::Review).is_err());
        assert!(authorize(&STUDENT, &own, Action::Grade).is_err());

        assert!(authorize(&ADMIN, &own, Action::Submit).is_err());
        assert!(authorize(&ADMIN, &own, Action::Review).is_ok());
    }

    #[test]
    fn test_lecturers_act_on_what_they_supervise() {
        let supervised = Resource::Registration {
            student_id: STUDENT.user_id,
            dpl_id: Some(LECTURER.user_id),
        };
        let unsupervised = Resource::Registration {
            student_id: STUDENT.user_id,
            dpl_id: Some(21),
        };

        assert!(authorize(&LECTURER, &supervised, Action::View).is_ok());
        assert!(authorize(&LECTURER, &supervised, Action::Grade).is_ok());
        assert!(authorize(&LECTURER, &supervised, Action::Review).is_err());
        assert!(authorize(&LECTURER, &unsupervised, Action::Grade).is_err());

        let posto = Resource::Posto {
            dpl_id: Some(LECTURER.user_id),
            is_member: false,
        };
        assert!(authorize(&LECTURER, &posto, Action::Post).is_ok());
        assert!(authorize(&LECTURER, &posto, Action::Manage).is_err());
    }

    #[test]
    fn test_posto_board_is_for_members() {
        let member_of = Resource::Posto {
            dpl_id: None,
            is_member: true,
        };
        let outsider = Resource::Posto {
            dpl_id: None,
            is_member: false,
        };

        assert!(authorize(&STUDENT, &member_of, Action::Post).is_ok());
        assert!(authorize(&STUDENT, &member_of, Action::View).is_ok());
        assert!(authorize(&STUDENT, &member_of, Action::Manage).is_err());
        assert!(authorize(&STUDENT, &outsider, Action::Post).is_err());
        assert!(authorize(&STAFF, &outsider, Action::Manage).is_ok());
    }

    #[test]
    fn test_registration_scope() {
        assert_eq!(registration_scope(&STUDENT), RegistrationScope::Own(10));
        assert_eq!(registration_scope(&LECTURER), RegistrationScope::Supervised(20));
        assert_eq!(registration_scope(&ADMIN), RegistrationScope::All);
        assert_eq!(registration_scope(&STAFF), RegistrationScope::All);
    }

    #[test]
    fn test_forbidden_message_names_the_action() {
        let err = authorize(&STUDENT, &Resource::Registry, Action::Manage).unwrap_err();
        assert!(err.to_string().contains("manage"));
    }
}
