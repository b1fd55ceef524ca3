//! Who may see and touch a document.
//!
//! These are evaluated on every listing and every request. Privacy lists are
//! mutable so results must never be cached.

use crate::{
    auth::models::User,
    document::{
        models::{Identifier, Principal},
        Document,
    },
};

/// Whether `actor` may view `document`.
///
/// Owners always can. Documents with all three privacy lists empty are
/// public, even to an unknown actor. Otherwise the actor's id, team or role
/// must appear in the corresponding list.
pub fn can_view(document: &Document, actor: Option<&User>) -> bool {
    if actor.is_some_and(|actor| is_owner(document, actor)) {
        return true;
    }

    if document.privacy.is_public() {
        return true;
    }

    actor.is_some_and(|actor| is_listed(document, actor))
}

/// Whether `actor` may trigger lifecycle transitions on `document`.
///
/// Like [can_view], except that a restricted document does not extend its
/// public fallback to modification.
pub fn can_act(document: &Document, actor: &User) -> bool {
    if is_owner(document, actor) {
        return true;
    }

    if document.permission_overrides.restricted {
        return is_listed(document, actor);
    }

    can_view(document, Some(actor))
}

/// Whether `actor` may make ordinary field edits to `document`.
///
/// Read-only documents and quality documents checked in for review are
/// locked for everyone.
pub fn can_edit(document: &Document, actor: &User) -> bool {
    if document.permission_overrides.read_only || document.is_locked() {
        return false;
    }

    can_act(document, actor)
}

fn is_owner(document: &Document, actor: &User) -> bool {
    document.owner_id() == Some(&actor.id)
}

fn is_listed(document: &Document, actor: &User) -> bool {
    let privacy = &document.privacy;

    contains(&privacy.users, Some(&actor.id))
        || contains(&privacy.teams, actor.team.as_ref())
        || contains(&privacy.roles, actor.user_type.as_ref())
}

fn contains(list: &[Principal], id: Option<&Identifier>) -> bool {
    let Some(id) = id else {
        return false;
    };
    list.iter().any(|principal| principal.id() == id)
}
