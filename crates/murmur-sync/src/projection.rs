//! Record projection.
//!
//! Records arrive with relations expanded under `expand`; what a client
//! shows is a flat payload (author name, like count, whether the actor liked
//! it). A [`Projection`] declares that shaping once per item kind, together
//! with the expansions it needs.

use serde_json::Value;

use murmur_core::{Expand, Fields, Record, RecordId};

use crate::config::Collections;

/// A dotted path into a record, e.g. `content` or `expand.user_id.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    /// Resolve the path against a record.
    ///
    /// A leading `expand` segment walks into expanded relations; otherwise
    /// the first segment is a system or caller field.
    pub fn resolve(&self, record: &Record) -> Option<Value> {
        let (first, rest) = self.0.split_first()?;

        let (start, rest) = match (first.as_str(), rest.split_first()) {
            ("expand", Some((key, rest))) => (record.expanded(key).cloned()?, rest),
            _ => (record.lookup(first)?, rest),
        };

        rest.iter()
            .try_fold(start, |value, segment| value.get(segment).cloned())
    }
}

/// A payload field computed from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    /// The first source holding a non-null, non-empty value, else `default`.
    FirstPresent {
        target: String,
        sources: Vec<FieldPath>,
        default: Value,
    },

    /// Length of the array at `source`; 0 when absent.
    Count { target: String, source: FieldPath },

    /// Whether any object in the array at `source` has `field` equal to the
    /// actor's id.
    ContainsActor {
        target: String,
        source: FieldPath,
        field: String,
    },
}

impl Derived {
    fn target(&self) -> &str {
        match self {
            Derived::FirstPresent { target, .. }
            | Derived::Count { target, .. }
            | Derived::ContainsActor { target, .. } => target,
        }
    }

    fn evaluate(&self, record: &Record, actor: &RecordId) -> Value {
        match self {
            Derived::FirstPresent {
                sources, default, ..
            } => sources
                .iter()
                .filter_map(|path| path.resolve(record))
                .find(is_present)
                .unwrap_or_else(|| default.clone()),

            Derived::Count { source, .. } => {
                let count = source
                    .resolve(record)
                    .as_ref()
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Value::from(count)
            }

            Derived::ContainsActor { source, field, .. } => {
                let contains = source
                    .resolve(record)
                    .as_ref()
                    .and_then(Value::as_array)
                    .is_some_and(|entries| {
                        entries
                            .iter()
                            .any(|entry| entry.get(field).and_then(Value::as_str) == Some(actor.as_str()))
                    });
                Value::Bool(contains)
            }
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Expansions plus derived fields for one kind of item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    expand: Vec<Expand>,
    derived: Vec<Derived>,
}

impl Projection {
    /// Pass records through unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }

    pub fn derive(mut self, derived: Derived) -> Self {
        self.derived.push(derived);
        self
    }

    /// Display name from an expanded profile: `name`, then `username`.
    pub fn display_name(self, target: &str, relation: &str, default: &str) -> Self {
        self.derive(Derived::FirstPresent {
            target: target.to_string(),
            sources: vec![
                FieldPath::new(&format!("expand.{}.name", relation)),
                FieldPath::new(&format!("expand.{}.username", relation)),
            ],
            default: Value::from(default),
        })
    }

    /// Expansions the store should resolve for this projection.
    pub fn expansions(&self) -> &[Expand] {
        &self.expand
    }

    /// Post cards: author, like count, comment count, liked by the actor.
    pub fn post_card(collections: &Collections) -> Self {
        let likes = Expand::back_relation(collections.likes.clone(), "post_id");
        let comments = Expand::back_relation(collections.comments.clone(), "post_id");
        let likes_path = FieldPath::new(&format!("expand.{}", likes.key()));
        let comments_path = FieldPath::new(&format!("expand.{}", comments.key()));

        Self::identity()
            .expand(Expand::relation("user_id", collections.profiles.clone()))
            .expand(likes)
            .expand(comments)
            .display_name("author_name", "user_id", "User")
            .derive(Derived::Count {
                target: "like_count".to_string(),
                source: likes_path.clone(),
            })
            .derive(Derived::Count {
                target: "comment_count".to_string(),
                source: comments_path,
            })
            .derive(Derived::ContainsActor {
                target: "liked_by_actor".to_string(),
                source: likes_path,
                field: "user_id".to_string(),
            })
    }

    /// Comments: author name.
    pub fn comment(collections: &Collections) -> Self {
        Self::identity()
            .expand(Expand::relation("user_id", collections.profiles.clone()))
            .display_name("author_name", "user_id", "User")
    }

    /// Notifications: sender name.
    pub fn notification(collections: &Collections) -> Self {
        Self::identity()
            .expand(Expand::relation("from_user_id", collections.profiles.clone()))
            .display_name("from_name", "from_user_id", "Someone")
    }

    /// The record's fields with every derived field added.
    pub fn apply(&self, record: &Record, actor: &RecordId) -> Fields {
        let mut payload = record.fields.clone();
        for derived in &self.derived {
            payload.insert(derived.target().to_string(), derived.evaluate(record, actor));
        }
        payload
    }
}
