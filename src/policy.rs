//! Visibility policy for moderated content.
//!
//! Every handler that returns or mutates a post or comment goes through
//! [`decide`] (directly or via [`authorize`] / [`filter_visible`]), so the
//! rule is written once:
//!
//! - missing entity: `DenyNotFound`
//! - hidden entity: `Allow` for an admin, otherwise `DenyNotFound`, including
//!   for the entity's own author
//! - visible entity, read: `Allow`
//! - visible entity, modify: `Allow` for the author or an admin, otherwise
//!   `DenyForbidden`
//!
//! `DenyNotFound` is rendered exactly like a missing row, so hidden content
//! never confirms its own existence. 403 only ever means "you can see this,
//! but it is not yours".

use uuid::Uuid;

use crate::{
    auth::Principal,
    error::ApiError,
    models::{Comment, Post},
};

/// Content that carries an author and a moderation flag.
pub trait Moderatable {
    fn entity_id(&self) -> Uuid;
    fn author_id(&self) -> Uuid;
    fn is_hidden(&self) -> bool;
}

impl Moderatable for Post {
    fn entity_id(&self) -> Uuid {
        self.id
    }
    fn author_id(&self) -> Uuid {
        self.author_id
    }
    fn is_hidden(&self) -> bool {
        self.hidden
    }
}

impl Moderatable for Comment {
    fn entity_id(&self) -> Uuid {
        self.id
    }
    fn author_id(&self) -> Uuid {
        self.author_id
    }
    fn is_hidden(&self) -> bool {
        self.hidden
    }
}

/// What the caller wants to do with the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Edit, delete, hide or unhide. Ownership-gated.
    Modify,
}

/// Outcome of a policy check. Computed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    DenyNotFound,
    DenyForbidden,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::DenyNotFound => Err(ApiError::NotFound),
            Decision::DenyForbidden => Err(ApiError::Forbidden),
        }
    }
}

/// The single decision function.
pub fn decide<E>(entity: Option<&E>, principal: Option<&Principal>, access: Access) -> Decision
where
    E: Moderatable + ?Sized,
{
    let Some(entity) = entity else {
        return Decision::DenyNotFound;
    };
    let is_admin = principal.is_some_and(Principal::is_admin);

    if entity.is_hidden() && !is_admin {
        return Decision::DenyNotFound;
    }

    match access {
        Access::Read => Decision::Allow,
        Access::Modify => match principal {
            Some(p) if p.is_admin() || p.id == entity.author_id() => Decision::Allow,
            _ => Decision::DenyForbidden,
        },
    }
}

/// Decision for an entity that lives under a parent (a comment under a post).
///
/// The parent must be readable first; if it is not, the child is reported as
/// not found regardless of the child's own state.
pub fn decide_nested<P, C>(
    parent: Option<&P>,
    child: Option<&C>,
    principal: Option<&Principal>,
    access: Access,
) -> Decision
where
    P: Moderatable + ?Sized,
    C: Moderatable + ?Sized,
{
    match decide(parent, principal, Access::Read) {
        Decision::Allow => decide(child, principal, access),
        _ => Decision::DenyNotFound,
    }
}

/// Runs [`decide`] and hands the entity back on `Allow`.
pub fn authorize<E: Moderatable>(
    entity: Option<E>,
    principal: Option<&Principal>,
    access: Access,
) -> Result<E, ApiError> {
    let decision = decide(entity.as_ref(), principal, access);
    log_denial(entity.as_ref(), principal, access, decision);
    decision.into_result()?;
    entity.ok_or(ApiError::NotFound)
}

/// Drops every item the principal may not read. List endpoints use this so an
/// item missing from a list and a 404 on the same id come from one decision.
pub fn filter_visible<E: Moderatable>(items: Vec<E>, principal: Option<&Principal>) -> Vec<E> {
    items
        .into_iter()
        .filter(|item| decide(Some(item), principal, Access::Read).is_allowed())
        .collect()
}

/// The two moderation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn of<E: Moderatable + ?Sized>(entity: &E) -> Self {
        if entity.is_hidden() {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn is_hidden(self) -> bool {
        self == Visibility::Hidden
    }
}

/// What a permitted hide/unhide request needs from the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the target state; succeed without writing.
    Unchanged,
    /// Persist the new hidden flag.
    Apply { hidden: bool },
}

/// Gates a `hide()` / `unhide()` request with the same ownership-or-admin rule
/// as any other modification. Both transitions are idempotent.
pub fn plan_transition<E: Moderatable + ?Sized>(
    entity: Option<&E>,
    principal: Option<&Principal>,
    target: Visibility,
) -> Result<Transition, ApiError> {
    let decision = decide(entity, principal, Access::Modify);
    log_denial(entity, principal, Access::Modify, decision);
    decision.into_result()?;
    let entity = entity.ok_or(ApiError::NotFound)?;

    if Visibility::of(entity) == target {
        Ok(Transition::Unchanged)
    } else {
        Ok(Transition::Apply {
            hidden: target.is_hidden(),
        })
    }
}

fn log_denial<E: Moderatable + ?Sized>(
    entity: Option<&E>,
    principal: Option<&Principal>,
    access: Access,
    decision: Decision,
) {
    if decision.is_allowed() {
        return;
    }
    tracing::debug!(
        entity = ?entity.map(|e| e.entity_id()),
        principal = ?principal.map(|p| p.id),
        access = ?access,
        decision = ?decision,
        "Visibility policy denied access"
    );
}
