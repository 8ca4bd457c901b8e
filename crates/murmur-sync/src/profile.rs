//! User profiles.
//!
//! A profile record shares its id with the user it belongs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument};

use murmur_core::error::InvalidInputError;
use murmur_core::{Collection, Fields, Filter, Record, RecordId, RemoteStore, Result};

use crate::config::SyncConfig;
use crate::optimistic::OptimisticEngine;
use crate::relation::{RelationKey, RelationSpec, RelationToggle, RelationView, count_matching};

/// Length of the username given to a profile created on first sign-in.
const DEFAULT_USERNAME_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: RecordId,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub created: DateTime<Utc>,
}

impl Profile {
    pub fn from_record(record: &Record) -> Self {
        let text = |field: &str| {
            record
                .get_str(field)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: record.id.clone(),
            username: text("username").unwrap_or_default(),
            name: text("name"),
            bio: text("bio"),
            created: record.created,
        }
    }

    /// Name if set, else username, else "User".
    pub fn display_name(&self) -> &str {
        match (&self.name, self.username.as_str()) {
            (Some(name), _) => name.as_str(),
            (None, "") => "User",
            (None, username) => username,
        }
    }
}

/// Fetch a user's profile, or `None` if they have none yet.
pub async fn fetch_profile<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
    user: &RecordId,
) -> Result<Option<Profile>> {
    match store.get_one(collection, user, &[]).await {
        Ok(record) => Ok(Some(Profile::from_record(&record))),
        Err(error) if error.is_not_found() => Ok(None),
        Err(error) => Err(error),
    }
}

/// Fetch the actor's profile, creating a default one if it does not exist.
#[instrument(skip(store), fields(actor = %store.actor()))]
pub async fn ensure_profile<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
) -> Result<Profile> {
    let actor = store.actor();
    match store.get_one(collection, actor, &[]).await {
        Ok(record) => Ok(Profile::from_record(&record)),
        Err(error) if error.is_not_found() => {
            let username: String = actor.as_str().chars().take(DEFAULT_USERNAME_LEN).collect();
            let mut fields = Fields::new();
            fields.insert("id".into(), Value::from(actor.as_str()));
            fields.insert("username".into(), Value::from(username));

            let record = store.create(collection, &fields).await?;
            info!("Created default profile");
            Ok(Profile::from_record(&record))
        }
        Err(error) => Err(error),
    }
}

/// Change fields of the actor's profile and return the stored result.
///
/// String values are trimmed; an empty string clears the field. A profile
/// that does not exist yet is created with the default username first.
#[instrument(skip(store, fields), fields(actor = %store.actor()))]
pub async fn update_profile<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
    fields: &Fields,
) -> Result<Profile> {
    if fields.is_empty() {
        return Err(InvalidInputError::Other {
            message: "no profile fields to update".to_string(),
        }
        .into());
    }
    if fields.contains_key("id") {
        return Err(InvalidInputError::Field {
            value: "id".to_string(),
            reason: "profile id cannot change".to_string(),
        }
        .into());
    }

    let fields: Fields = fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key.clone(), Value::from(s.trim())),
            other => (key.clone(), other.clone()),
        })
        .collect();

    let actor = store.actor();
    let record = match store.update(collection, actor, &fields).await {
        Ok(record) => record,
        Err(error) if error.is_not_found() => {
            ensure_profile(store, collection).await?;
            store.update(collection, actor, &fields).await?
        }
        Err(error) => return Err(error),
    };
    info!("Updated profile");
    Ok(Profile::from_record(&record))
}

/// A profile page: the profile, the follow toggle and follow counts.
pub struct ProfileView<S> {
    pub profile: Profile,
    pub follow: RelationToggle<S>,
    pub following_count: u64,
}

impl<S: RemoteStore> ProfileView<S> {
    #[instrument(skip(store, config, engine))]
    pub async fn load(
        store: Arc<S>,
        config: &SyncConfig,
        user: &RecordId,
        engine: Arc<OptimisticEngine<RelationKey>>,
    ) -> Result<Self> {
        let record = store.get_one(&config.collections.profiles, user, &[]).await?;
        let profile = Profile::from_record(&record);

        let spec = RelationSpec::follows(config);
        let following_count = count_matching(
            store.as_ref(),
            &spec.collection,
            Filter::new().eq(&spec.actor_field, user.as_str()),
        )
        .await?;

        let follow = RelationToggle::load(store, spec, user.clone(), engine)
            .await?
            .notify_on_create(user.clone());
        debug!(following_count, "Loaded profile");

        Ok(Self {
            profile,
            follow,
            following_count,
        })
    }

    pub fn is_own(&self) -> bool {
        self.follow.key().actor == self.profile.id
    }

    pub fn followers(&self) -> RelationView {
        self.follow.view()
    }
}
