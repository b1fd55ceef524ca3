//! Permission lookups against a user's resolved permission tree.
//!
//! A tree maps module names to CRUD quads with an optional nested
//! `permission` map of sub-modules:
//!
//! ```json
//! { "settings": { "c": 1, "r": 1, "u": 0, "d": 0,
//!                 "permission": { "roles": { "c": 1, "r": 1, "u": 1, "d": 0 } } } }
//! ```
//!
//! Paths such as `settings.roles.c` or `settings[roles].c` are parsed once
//! into a [PermissionPath]. Anything that cannot be resolved is a deny.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use tracing::warn;

use crate::auth::models::User;

/// Key of the nested sub-module map.
const PERMISSION_KEY: &str = "permission";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty permission path")]
    Empty,

    #[error("{0}: unbalanced brackets")]
    Unbalanced(String),

    #[error("{0}: empty path segment")]
    EmptySegment(String),

    #[error("cannot resolve '{segment}': parent is not an object")]
    NotAnObject { segment: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crud {
    Create,
    Read,
    Update,
    Delete,
}

impl Crud {
    pub fn key(&self) -> &'static str {
        match self {
            Crud::Create => "c",
            Crud::Read => "r",
            Crud::Update => "u",
            Crud::Delete => "d",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "c" => Some(Crud::Create),
            "r" => Some(Crud::Read),
            "u" => Some(Crud::Update),
            "d" => Some(Crud::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Module(String),
    Crud(Crud),
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Module(name) => f.write_str(name),
            Segment::Crud(crud) => f.write_str(crud.key()),
        }
    }
}

/// A parsed permission path. The first segment is always a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPath {
    segments: Vec<Segment>,
}

impl PermissionPath {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for PermissionPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // a[b].c -> a.b.c
        let mut normalized = String::with_capacity(trimmed.len());
        let mut in_bracket = false;
        for ch in trimmed.chars() {
            match ch {
                '[' if !in_bracket => {
                    in_bracket = true;
                    normalized.push('.');
                }
                ']' if in_bracket => in_bracket = false,
                '[' | ']' => return Err(PathError::Unbalanced(s.to_string())),
                '\'' | '"' if in_bracket => {}
                ch => normalized.push(ch),
            }
        }
        if in_bracket {
            return Err(PathError::Unbalanced(s.to_string()));
        }

        let normalized = normalized.strip_prefix('.').unwrap_or(&normalized);
        if normalized.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = vec![];
        for (i, part) in normalized.split('.').enumerate() {
            if part.is_empty() {
                return Err(PathError::EmptySegment(s.to_string()));
            }
            let segment = match Crud::from_key(part) {
                Some(crud) if i > 0 => Segment::Crud(crud),
                _ => Segment::Module(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }
}

impl Display for PermissionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A user's resolved permission tree, already flattened across roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTree(Map<String, Value>);

impl PermissionTree {
    /// Walk the tree along `path`.
    ///
    /// Module segments after the first are looked up through the `permission`
    /// sub-map, falling back to a direct key for trees that nest modules
    /// without it. `Ok(None)` means the final key is absent.
    pub fn resolve(&self, path: &PermissionPath) -> Result<Option<&Value>, PathError> {
        let mut segments = path.segments.iter();

        let mut current = match segments.next() {
            Some(Segment::Module(name)) => self.0.get(name),
            _ => return Err(PathError::Empty),
        };

        for segment in segments {
            let Some(object) = current.and_then(Value::as_object) else {
                return Err(PathError::NotAnObject {
                    segment: segment.to_string(),
                });
            };

            current = match segment {
                Segment::Crud(crud) => object.get(crud.key()),
                Segment::Module(name) => object
                    .get(PERMISSION_KEY)
                    .and_then(Value::as_object)
                    .and_then(|sub| sub.get(name))
                    .or_else(|| object.get(name)),
            };
        }

        Ok(current)
    }

    /// `1` if the leaf at `path` is exactly `1`, `0` otherwise.
    pub fn value(&self, path: &PermissionPath) -> u8 {
        match self.resolve(path) {
            Ok(Some(leaf)) if leaf.as_i64() == Some(1) => 1,
            Ok(_) => 0,
            Err(e) => {
                warn!("Permission path {path} denied: {e}");
                0
            }
        }
    }

    pub fn grants(&self, path: &PermissionPath) -> bool {
        self.value(path) == 1
    }
}

/// Evaluate a raw path string against a tree. Empty, missing and malformed
/// paths evaluate to `0`.
pub fn permission_value(tree: &PermissionTree, path: Option<&str>) -> u8 {
    let Some(path) = path else {
        return 0;
    };

    match path.parse::<PermissionPath>() {
        Ok(path) => tree.value(&path),
        Err(PathError::Empty) => 0,
        Err(e) => {
            warn!("Permission path denied: {e}");
            0
        }
    }
}

/// Whether `user` holds the permission at `path`. No user means no grant.
pub fn has_permission(user: Option<&User>, path: &PermissionPath) -> bool {
    user.is_some_and(|user| user.permissions.grants(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> PermissionTree {
        serde_json::from_value(value).unwrap()
    }

    fn path(s: &str) -> PermissionPath {
        s.parse().unwrap()
    }

    fn nested_tree() -> PermissionTree {
        tree(json!({
            "audit": {"c": 1, "r": 1, "u": 0, "d": 0},
            "settings": {
                "c": 0, "r": 1, "u": 0, "d": 0,
                "permission": {
                    "roles": {
                        "c": 1, "r": 1, "u": 0, "d": 0,
                        "permission": {"assign": {"c": 0, "r": 1, "u": 1, "d": 0}}
                    }
                }
            }
        }))
    }

    #[test]
    fn parses_segments() {
        assert_eq!(
            path("settings.roles.c").segments(),
            &[
                Segment::Module("settings".to_string()),
                Segment::Module("roles".to_string()),
                Segment::Crud(Crud::Create),
            ]
        );
    }

    #[test]
    fn normalizes_brackets_and_leading_dot() {
        assert_eq!(path("settings[roles].c"), path("settings.roles.c"));
        assert_eq!(path("settings['roles'].c"), path("settings.roles.c"));
        assert_eq!(path(".settings.roles.c"), path("settings.roles.c"));
        assert_eq!(path("settings.roles.c").to_string(), "settings.roles.c");
    }

    #[test]
    fn first_segment_is_always_a_module() {
        assert_eq!(
            path("c.r").segments(),
            &[Segment::Module("c".to_string()), Segment::Crud(Crud::Read)]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!("".parse::<PermissionPath>(), Err(PathError::Empty));
        assert_eq!(".".parse::<PermissionPath>(), Err(PathError::Empty));
        assert!(matches!(
            "a..c".parse::<PermissionPath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            "a[b.c".parse::<PermissionPath>(),
            Err(PathError::Unbalanced(_))
        ));
        assert!(matches!(
            "a]b".parse::<PermissionPath>(),
            Err(PathError::Unbalanced(_))
        ));
    }

    #[test]
    fn resolves_direct_nesting() {
        let tree = tree(json!({"settings": {"roles": {"c": 1}}}));
        assert_eq!(permission_value(&tree, Some("settings.roles.c")), 1);
        assert_eq!(tree.resolve(&path("settings.roles.x")), Ok(None));
        assert_eq!(permission_value(&tree, Some("settings.roles.x")), 0);
    }

    #[test]
    fn resolves_through_permission_maps() {
        let tree = nested_tree();
        assert!(tree.grants(&path("audit.c")));
        assert!(!tree.grants(&path("audit.u")));
        assert!(tree.grants(&path("settings.r")));
        assert!(tree.grants(&path("settings.roles.c")));
        assert!(!tree.grants(&path("settings.roles.u")));
        assert!(tree.grants(&path("settings.roles.assign.u")));
        assert!(tree.grants(&path("settings[roles][assign].u")));
    }

    #[test]
    fn empty_and_missing_paths_deny() {
        let tree = nested_tree();
        assert_eq!(permission_value(&tree, None), 0);
        assert_eq!(permission_value(&tree, Some("")), 0);
        assert_eq!(permission_value(&tree, Some("a..b")), 0);
        assert_eq!(permission_value(&tree, Some("unknown.c")), 0);
    }

    #[test]
    fn indexing_into_non_objects_denies() {
        let tree = nested_tree();
        assert!(matches!(
            tree.resolve(&path("audit.c.r")),
            Err(PathError::NotAnObject { .. })
        ));
        assert!(matches!(
            tree.resolve(&path("missing.roles.c")),
            Err(PathError::NotAnObject { .. })
        ));
        assert_eq!(tree.value(&path("audit.c.r")), 0);
    }

    #[test]
    fn only_exact_one_grants() {
        let tree = tree(json!({"a": {"c": true, "r": "1", "u": 2, "d": 1}}));
        assert!(!tree.grants(&path("a.c")));
        assert!(!tree.grants(&path("a.r")));
        assert!(!tree.grants(&path("a.u")));
        assert!(tree.grants(&path("a.d")));
    }

    #[test]
    fn missing_user_is_denied() {
        assert!(!has_permission(None, &path("audit.c")));

        let user = User {
            permissions: nested_tree(),
            ..User::new("u1")
        };
        assert!(has_permission(Some(&user), &path("audit.c")));
    }
}
