//! Subject model: how domain objects describe themselves to the action log.
//!
//! Any type that should appear as the subject of a log entry implements
//! [`Model`]. The log only needs three things from it: a stable type
//! descriptor ([`ModelMeta`]), a primary key ([`PkValue`]) and a
//! human-readable representation (`Display`). Types that carry auxiliary
//! information worth snapshotting additionally implement [`HasExtraInfo`]
//! and expose it through [`Model::as_extra_info`].

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum number of related-object hops followed while resolving a
/// primary key.
pub const MAX_PK_DEPTH: usize = 16;

/// Stable descriptor of a domain type, the key for content type lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelMeta {
    pub app_label: &'static str,
    pub model: &'static str,
}

impl ModelMeta {
    pub const fn new(app_label: &'static str, model: &'static str) -> Self {
        Self { app_label, model }
    }
}

impl fmt::Display for ModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// Raw primary key value as reported by a [`Model`].
pub enum PkValue<'a> {
    Int(i64),
    Text(Cow<'a, str>),
    /// The key is itself another object (one-to-one parent link); its key
    /// is resolved in turn.
    Related(&'a dyn Model),
}

/// Optional capability: auxiliary structured info captured at log time.
pub trait HasExtraInfo {
    fn extra_info(&self) -> serde_json::Value;
}

/// A domain object that can be the subject of a log entry.
pub trait Model: fmt::Display + Send + Sync {
    fn model_meta(&self) -> ModelMeta;

    /// `None` when the object has no key yet (e.g. unsaved).
    fn pk(&self) -> Option<PkValue<'_>>;

    /// Returns the extra-info capability if this type provides one.
    fn as_extra_info(&self) -> Option<&dyn HasExtraInfo> {
        None
    }
}

/// Resolved, terminal primary key of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKey {
    Numeric(i64),
    Text(String),
}

impl SubjectKey {
    pub fn numeric(&self) -> Option<i64> {
        match self {
            SubjectKey::Numeric(v) => Some(*v),
            SubjectKey::Text(_) => None,
        }
    }

    /// String form stored in `object_pk`; always available.
    pub fn as_pk_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Numeric(v) => write!(f, "{v}"),
            SubjectKey::Text(s) => f.write_str(s),
        }
    }
}

/// Resolve the terminal primary key of `model`, following related-object
/// keys. Returns `None` if any object in the chain has no key or the chain
/// is deeper than [`MAX_PK_DEPTH`].
pub fn resolve_pk(model: &dyn Model) -> Option<SubjectKey> {
    let mut current = model;
    for _ in 0..MAX_PK_DEPTH {
        match current.pk()? {
            PkValue::Int(v) => return Some(SubjectKey::Numeric(v)),
            PkValue::Text(s) => return Some(SubjectKey::Text(s.into_owned())),
            PkValue::Related(next) => current = next,
        }
    }

    warn!(
        model = %model.model_meta(),
        max_depth = MAX_PK_DEPTH,
        "Primary key chain too deep, leaving subject key unset"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Place {
        id: i64,
    }

    impl fmt::Display for Place {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Place {}", self.id)
        }
    }

    impl Model for Place {
        fn model_meta(&self) -> ModelMeta {
            ModelMeta::new("places", "place")
        }

        fn pk(&self) -> Option<PkValue<'_>> {
            Some(PkValue::Int(self.id))
        }
    }

    /// One-to-one child whose primary key is its parent.
    struct Restaurant {
        place: Place,
    }

    impl fmt::Display for Restaurant {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Restaurant at {}", self.place)
        }
    }

    impl Model for Restaurant {
        fn model_meta(&self) -> ModelMeta {
            ModelMeta::new("places", "restaurant")
        }

        fn pk(&self) -> Option<PkValue<'_>> {
            Some(PkValue::Related(&self.place))
        }
    }

    struct Slugged(&'static str);

    impl fmt::Display for Slugged {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Model for Slugged {
        fn model_meta(&self) -> ModelMeta {
            ModelMeta::new("cms", "page")
        }

        fn pk(&self) -> Option<PkValue<'_>> {
            Some(PkValue::Text(Cow::Borrowed(self.0)))
        }
    }

    /// Points at itself, so resolution never terminates on its own.
    struct Loop;

    impl fmt::Display for Loop {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("loop")
        }
    }

    impl Model for Loop {
        fn model_meta(&self) -> ModelMeta {
            ModelMeta::new("test", "loop")
        }

        fn pk(&self) -> Option<PkValue<'_>> {
            Some(PkValue::Related(self))
        }
    }

    struct Unsaved;

    impl fmt::Display for Unsaved {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("unsaved")
        }
    }

    impl Model for Unsaved {
        fn model_meta(&self) -> ModelMeta {
            ModelMeta::new("test", "unsaved")
        }

        fn pk(&self) -> Option<PkValue<'_>> {
            None
        }
    }

    #[test]
    fn resolves_numeric_key() {
        assert_eq!(resolve_pk(&Place { id: 7 }), Some(SubjectKey::Numeric(7)));
    }

    #[test]
    fn resolves_text_key() {
        assert_eq!(
            resolve_pk(&Slugged("about-us")),
            Some(SubjectKey::Text("about-us".into()))
        );
    }

    #[test]
    fn follows_related_key_to_scalar() {
        let restaurant = Restaurant {
            place: Place { id: 42 },
        };
        assert_eq!(resolve_pk(&restaurant), Some(SubjectKey::Numeric(42)));
    }

    #[test]
    fn missing_key_resolves_to_none() {
        assert_eq!(resolve_pk(&Unsaved), None);
    }

    #[test]
    fn cyclic_key_chain_is_cut_off() {
        assert_eq!(resolve_pk(&Loop), None);
    }

    #[test]
    fn extra_info_capability_defaults_to_absent() {
        assert!(Place { id: 1 }.as_extra_info().is_none());
    }

    #[test]
    fn subject_key_string_forms() {
        assert_eq!(SubjectKey::Numeric(42).as_pk_string(), "42");
        assert_eq!(SubjectKey::Text("abc".into()).as_pk_string(), "abc");
        assert_eq!(SubjectKey::Numeric(42).numeric(), Some(42));
        assert_eq!(SubjectKey::Text("42".into()).numeric(), None);
    }

    #[test]
    fn model_meta_display() {
        assert_eq!(ModelMeta::new("shop", "widget").to_string(), "shop.widget");
    }
}
