//! Binary relation toggles (like, follow) backed by a join collection.
//!
//! An edge is a record holding the actor's id and the target's id. Toggling
//! on creates one; toggling off looks the edge up and deletes it. Both go
//! through the [`OptimisticEngine`], keyed by `(actor, target)`, so the
//! boolean and its counter move at once and roll back together.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument};

use murmur_core::{Collection, Fields, Filter, ListOptions, RecordId, RemoteStore, Result};

use crate::config::SyncConfig;
use crate::inbox::{self, NewNotification, NotificationKind};
use crate::optimistic::{MutationOutcome, OptimisticEngine, Resolution, toggle_delta};

/// Describes one kind of relation and how it shows up in item payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    /// Join collection holding the edges.
    pub collection: Collection,
    /// Edge field holding the actor's id.
    pub actor_field: String,
    /// Edge field holding the target's id.
    pub target_field: String,
    /// Payload key of the boolean, e.g. `liked_by_actor`.
    pub related_key: String,
    /// Payload key of the counter, e.g. `like_count`.
    pub count_key: String,
    /// Notification sent to the target's owner after an edge is created.
    pub notification: Option<NotificationKind>,
    /// Where notifications go.
    pub notifications: Collection,
    pub relate_label: String,
    pub unrelate_label: String,
}

impl RelationSpec {
    /// An actor liking a post.
    pub fn likes(config: &SyncConfig) -> Self {
        Self {
            collection: config.collections.likes.clone(),
            actor_field: "user_id".to_string(),
            target_field: "post_id".to_string(),
            related_key: "liked_by_actor".to_string(),
            count_key: "like_count".to_string(),
            notification: Some(NotificationKind::Like),
            notifications: config.collections.notifications.clone(),
            relate_label: "Could not like post".to_string(),
            unrelate_label: "Could not unlike post".to_string(),
        }
    }

    /// An actor following a user.
    pub fn follows(config: &SyncConfig) -> Self {
        Self {
            collection: config.collections.follows.clone(),
            actor_field: "follower_id".to_string(),
            target_field: "following_id".to_string(),
            related_key: "is_following".to_string(),
            count_key: "followers_count".to_string(),
            notification: Some(NotificationKind::Follow),
            notifications: config.collections.notifications.clone(),
            relate_label: "Could not follow user".to_string(),
            unrelate_label: "Could not unfollow user".to_string(),
        }
    }

    fn edge_filter(&self, key: &RelationKey) -> Filter {
        Filter::new()
            .eq(&self.actor_field, key.actor.as_str())
            .eq(&self.target_field, key.target.as_str())
    }

    fn target_filter(&self, target: &RecordId) -> Filter {
        Filter::new().eq(&self.target_field, target.as_str())
    }
}

/// Identifies a directed relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub actor: RecordId,
    pub target: RecordId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationPhase {
    Unrelated,
    RelatedPendingCreate,
    Related,
    UnrelatedPendingDelete,
}

impl RelationPhase {
    fn settle(related: bool, resolution: Resolution) -> Self {
        match (related, resolution) {
            (true, Resolution::Pending) => RelationPhase::RelatedPendingCreate,
            (false, Resolution::Pending) => RelationPhase::UnrelatedPendingDelete,
            (true, _) => RelationPhase::Related,
            (false, _) => RelationPhase::Unrelated,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RelationPhase::RelatedPendingCreate | RelationPhase::UnrelatedPendingDelete
        )
    }
}

/// What the client shows for a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationView {
    pub related: bool,
    pub count: i64,
    pub phase: RelationPhase,
}

impl RelationView {
    pub fn new(related: bool, count: i64) -> Self {
        Self {
            related,
            count,
            phase: RelationPhase::settle(related, Resolution::Committed),
        }
    }

    /// Payload fields reflecting this view, for [`FeedSynchronizer::patch_item`](crate::FeedSynchronizer::patch_item).
    pub fn to_patch(&self, spec: &RelationSpec) -> Fields {
        let mut patch = Fields::new();
        patch.insert(spec.related_key.clone(), Value::Bool(self.related));
        patch.insert(spec.count_key.clone(), Value::from(self.count));
        patch
    }
}

#[derive(Debug)]
pub enum ToggleOutcome {
    Committed(RelationView),
    RolledBack {
        view: RelationView,
        error: murmur_core::Error,
    },
    /// A newer toggle took over; its own outcome is authoritative.
    Superseded,
}

impl ToggleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ToggleOutcome::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, ToggleOutcome::RolledBack { .. })
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, ToggleOutcome::Superseded)
    }
}

/// Toggles one `(actor, target)` relation optimistically.
pub struct RelationToggle<S> {
    store: Arc<S>,
    spec: RelationSpec,
    key: RelationKey,
    engine: Arc<OptimisticEngine<RelationKey>>,
    view: watch::Sender<RelationView>,
    recipient: Option<RecordId>,
}

impl<S: RemoteStore> RelationToggle<S> {
    /// A toggle starting from a known view, e.g. one projected into a feed item.
    pub fn new(
        store: Arc<S>,
        spec: RelationSpec,
        target: RecordId,
        initial: RelationView,
        engine: Arc<OptimisticEngine<RelationKey>>,
    ) -> Self {
        let key = RelationKey {
            actor: store.actor().clone(),
            target,
        };
        let (view, _rx) = watch::channel(initial);
        Self {
            store,
            spec,
            key,
            engine,
            view,
            recipient: None,
        }
    }

    /// Read the current state from the store: whether the edge exists and
    /// how many edges point at the target.
    #[instrument(skip(store, spec, engine), fields(collection = %spec.collection))]
    pub async fn load(
        store: Arc<S>,
        spec: RelationSpec,
        target: RecordId,
        engine: Arc<OptimisticEngine<RelationKey>>,
    ) -> Result<Self> {
        let key = RelationKey {
            actor: store.actor().clone(),
            target: target.clone(),
        };

        let related = match store
            .list(&spec.collection, 1, 1, &ListOptions::new().filter(spec.edge_filter(&key)))
            .await
        {
            Ok(page) => !page.items.is_empty(),
            Err(error) if error.is_not_found() => false,
            Err(error) => return Err(error),
        };

        let count = count_matching(store.as_ref(), &spec.collection, spec.target_filter(&target)).await?;
        debug!(related, count, "Loaded relation");

        Ok(Self::new(store, spec, target, RelationView::new(related, count as i64), engine))
    }

    /// Notify `recipient` after each successful toggle-on.
    ///
    /// Nothing is sent when the recipient is the actor.
    pub fn notify_on_create(mut self, recipient: RecordId) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn key(&self) -> &RelationKey {
        &self.key
    }

    pub fn spec(&self) -> &RelationSpec {
        &self.spec
    }

    pub fn view(&self) -> RelationView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RelationView> {
        self.view.subscribe()
    }

    /// Flip the relation.
    ///
    /// The view changes before the remote call starts. On failure the
    /// boolean and counter return to where they were and an error notice is
    /// published; nothing is retried.
    #[instrument(skip(self), fields(actor = %self.key.actor, target = %self.key.target))]
    pub async fn toggle(&self) -> ToggleOutcome {
        let label = if self.view.borrow().related {
            &self.spec.unrelate_label
        } else {
            &self.spec.relate_label
        };

        let outcome = self
            .engine
            .mutate(
                self.key.clone(),
                label,
                || {
                    let related = self.view.borrow().related;
                    (related, !related)
                },
                |related: &bool, resolution| {
                    self.view.send_modify(|view| {
                        view.count += toggle_delta(view.related, *related);
                        view.related = *related;
                        view.phase = RelationPhase::settle(*related, resolution);
                    });
                },
                |related: &bool| {
                    let related = *related;
                    async move {
                        if related {
                            self.relate().await.map(|()| true)
                        } else {
                            self.unrelate().await.map(|()| false)
                        }
                    }
                },
            )
            .await;

        match outcome {
            MutationOutcome::Committed(related) => {
                if related {
                    self.notify().await;
                }
                ToggleOutcome::Committed(self.view())
            }
            MutationOutcome::RolledBack(error) => ToggleOutcome::RolledBack {
                view: self.view(),
                error,
            },
            MutationOutcome::Superseded => ToggleOutcome::Superseded,
        }
    }

    async fn relate(&self) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert(self.spec.actor_field.clone(), Value::from(self.key.actor.as_str()));
        fields.insert(self.spec.target_field.clone(), Value::from(self.key.target.as_str()));

        let edge = self.store.create(&self.spec.collection, &fields).await?;
        debug!(edge = %edge.id, "Created edge");
        Ok(())
    }

    /// Delete every edge for the key. No edge at all counts as success.
    async fn unrelate(&self) -> Result<()> {
        let options = ListOptions::new().filter(self.spec.edge_filter(&self.key));
        let edges = match self.store.full_list(&self.spec.collection, &options).await {
            Ok(edges) => edges,
            Err(error) if error.is_not_found() => {
                debug!("Edge lookup found nothing");
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        if edges.is_empty() {
            debug!("No edge to delete");
        }
        for edge in edges {
            self.store.delete(&self.spec.collection, &edge.id).await?;
            debug!(edge = %edge.id, "Deleted edge");
        }
        Ok(())
    }

    async fn notify(&self) {
        let (Some(kind), Some(recipient)) = (&self.spec.notification, &self.recipient) else {
            return;
        };
        if recipient == &self.key.actor {
            return;
        }

        let post = (*kind == NotificationKind::Like).then(|| self.key.target.clone());
        let notification = NewNotification {
            recipient: recipient.clone(),
            kind: kind.clone(),
            post,
            message: None,
        };
        inbox::deliver_best_effort(self.store.as_ref(), &self.spec.notifications, &notification).await;
    }
}

/// Number of records matching `filter`, from the list total when the store
/// reports one.
pub(crate) async fn count_matching<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
    filter: Filter,
) -> Result<u64> {
    let options = ListOptions::new().filter(filter);
    let page = store.list(collection, 1, 1, &options).await?;
    match page.total_items {
        Some(total) => Ok(total),
        None => Ok(store.full_list(collection, &options).await?.len() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use crate::notice::{NoticeLevel, Notices};
    use crate::testing::{Behavior, Call, MockStore, id};

    fn engine(notices: &Notices) -> Arc<OptimisticEngine<RelationKey>> {
        Arc::new(OptimisticEngine::new(notices.clone()))
    }

    fn likes() -> RelationSpec {
        RelationSpec::likes(&SyncConfig::default())
    }

    async fn like_toggle(store: &Arc<MockStore>, notices: &Notices) -> RelationToggle<MockStore> {
        RelationToggle::load(store.clone(), likes(), id("p1"), engine(notices))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn load_reads_edge_and_count() {
        let store = Arc::new(MockStore::new("me"));
        store.seed("likes", json!({"user_id": "me", "post_id": "p1"}));
        store.seed("likes", json!({"user_id": "u2", "post_id": "p1"}));
        store.seed("likes", json!({"user_id": "u2", "post_id": "p2"}));

        let toggle = like_toggle(&store, &Notices::new()).await;
        assert_eq!(toggle.view(), RelationView::new(true, 2));
    }

    #[tokio::test]
    async fn toggling_twice_returns_to_the_start() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new()).await;
        assert_eq!(toggle.view(), RelationView::new(false, 0));

        assert!(toggle.toggle().await.is_committed());
        assert_eq!(toggle.view(), RelationView::new(true, 1));
        assert_eq!(store.records("likes").len(), 1);

        assert!(toggle.toggle().await.is_committed());
        assert_eq!(toggle.view(), RelationView::new(false, 0));
        assert!(store.records("likes").is_empty());
    }

    #[tokio::test]
    async fn failed_create_rolls_back_boolean_and_counter() {
        let store = Arc::new(MockStore::new("me"));
        store.seed("likes", json!({"user_id": "u2", "post_id": "p1"}));
        let notices = Notices::new();
        let mut rx = notices.subscribe();
        let toggle = like_toggle(&store, &notices).await;

        store.script(Call::Create, [Behavior::fail()]);
        let outcome = toggle.toggle().await;

        let ToggleOutcome::RolledBack { view, .. } = outcome else {
            panic!("expected rollback, got {:?}", outcome);
        };
        assert_eq!(view, RelationView::new(false, 1));
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.starts_with("Could not like post"));
    }

    #[tokio::test]
    async fn failed_delete_restores_related_state() {
        let store = Arc::new(MockStore::new("me"));
        store.seed("likes", json!({"user_id": "me", "post_id": "p1"}));
        let toggle = like_toggle(&store, &Notices::new()).await;

        store.script(Call::Delete, [Behavior::fail()]);
        assert!(toggle.toggle().await.is_rolled_back());
        assert_eq!(toggle.view(), RelationView::new(true, 1));
        assert_eq!(store.records("likes").len(), 1);
    }

    #[tokio::test]
    async fn toggle_off_without_edges_succeeds_quietly() {
        let store = Arc::new(MockStore::new("me"));
        let notices = Notices::new();
        let mut rx = notices.subscribe();
        let toggle = RelationToggle::new(
            store.clone(),
            likes(),
            id("p1"),
            RelationView::new(true, 3),
            engine(&notices),
        );

        assert!(toggle.toggle().await.is_committed());
        assert_eq!(toggle.view(), RelationView::new(false, 2));
        assert_eq!(store.calls(Call::Delete), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn not_found_on_lookup_counts_as_unrelated() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = RelationToggle::new(
            store.clone(),
            likes(),
            id("p1"),
            RelationView::new(true, 1),
            engine(&Notices::new()),
        );

        store.script(Call::List, [Behavior::not_found()]);
        assert!(toggle.toggle().await.is_committed());
        assert!(!toggle.view().related);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_toggle_wins_over_slow_older_one() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new()).await;

        // A (like) is slow and fails; B (unlike) is issued meanwhile and succeeds.
        store.script(Call::Create, [Behavior::fail().after(100)]);
        let a = toggle.toggle();
        let b = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            toggle.toggle().await
        };
        let (a, b) = tokio::join!(a, b);

        assert!(a.is_superseded());
        assert!(b.is_committed());
        assert_eq!(toggle.view(), RelationView::new(false, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_toggles_that_both_fail_restore_the_start() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new()).await;

        store.script(Call::Create, [Behavior::fail().after(100)]);
        store.script(Call::List, [Behavior::fail()]);
        let a = toggle.toggle();
        let b = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            toggle.toggle().await
        };
        let (a, b) = tokio::join!(a, b);

        assert!(a.is_superseded());
        assert!(b.is_rolled_back());
        assert_eq!(toggle.view(), RelationView::new(false, 0));
        assert!(store.records("likes").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_toggle_rolls_back_onto_an_older_commit() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new()).await;

        // A (like) commits while B (unlike) is in flight; B then fails.
        store.script(Call::Create, [Behavior::delay(20)]);
        store.script(Call::List, [Behavior::fail().after(100)]);
        let a = toggle.toggle();
        let b = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            toggle.toggle().await
        };
        let (a, b) = tokio::join!(a, b);

        assert!(a.is_superseded());
        assert!(b.is_rolled_back());
        assert_eq!(toggle.view(), RelationView::new(true, 1));
        assert_eq!(store.records("likes").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_phase_is_visible_during_the_call() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new()).await;

        store.script(Call::Create, [Behavior::delay(50)]);
        let observe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            toggle.view()
        };
        let (outcome, during) = tokio::join!(toggle.toggle(), observe);

        assert_eq!(during.phase, RelationPhase::RelatedPendingCreate);
        assert_eq!(during.count, 1);
        assert!(outcome.is_committed());
        assert_eq!(toggle.view().phase, RelationPhase::Related);
    }

    #[tokio::test]
    async fn committed_like_notifies_the_owner() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new())
            .await
            .notify_on_create(id("owner"));

        toggle.toggle().await;

        let sent = store.records("notifications");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get_str("user_id"), Some("owner"));
        assert_eq!(sent[0].get_str("from_user_id"), Some("me"));
        assert_eq!(sent[0].get_str("type"), Some("like"));
        assert_eq!(sent[0].get_str("post_id"), Some("p1"));
    }

    #[tokio::test]
    async fn notification_failure_does_not_roll_back() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new())
            .await
            .notify_on_create(id("owner"));

        store.script(Call::Create, [Behavior::default(), Behavior::fail()]);
        assert!(toggle.toggle().await.is_committed());
        assert!(toggle.view().related);
        assert!(store.records("notifications").is_empty());
    }

    #[tokio::test]
    async fn no_self_notification() {
        let store = Arc::new(MockStore::new("me"));
        let toggle = like_toggle(&store, &Notices::new())
            .await
            .notify_on_create(id("me"));

        toggle.toggle().await;
        assert!(store.records("notifications").is_empty());
    }
}
