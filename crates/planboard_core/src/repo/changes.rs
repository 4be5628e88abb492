//! Per-table change notifications.
//!
//! Replaces "refetch everything on any change" with explicit subscriptions:
//! callers subscribe to the entity kinds they render and receive one event
//! per committed write.
//!
//! # Invariants
//! - Events are published only after the write (or its transaction) commits.
//! - Listeners run on the publishing thread, outside the registry lock, so a
//!   listener may subscribe or unsubscribe without deadlocking.

use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// One stored table that emits change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Teams,
    Roles,
    TeamMembers,
    TeamMemberships,
    TeamIdealSizes,
    Products,
    Projects,
    ProjectAssignees,
    Profiles,
}

impl EntityKind {
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Roles => "roles",
            Self::TeamMembers => "team_members",
            Self::TeamMemberships => "team_memberships",
            Self::TeamIdealSizes => "team_ideal_sizes",
            Self::Products => "products",
            Self::Projects => "projects",
            Self::ProjectAssignees => "project_assignees",
            Self::Profiles => "profiles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Notification for one committed row change.
///
/// `id` is the row id; for `team_ideal_sizes` it is the owning team id and
/// for set replacements of `project_assignees` it is the project id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub entity: EntityKind,
    pub kind: ChangeKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Subscription registry keyed by entity kind.
#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<EntityKind, Vec<(SubscriptionId, Listener)>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for changes of `entity`.
    pub fn subscribe(
        &self,
        entity: EntityKind,
        listener: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity)
            .or_default()
            .push((id, listener));
        debug!(
            "event=change_subscribe module=repo status=ok table={}",
            entity.table_name()
        );
        id
    }

    /// Removes one subscription. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
        }
        removed
    }

    pub fn listener_count(&self, entity: EntityKind) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to every listener of its entity kind.
    pub fn publish(&self, event: ChangeEvent) {
        let targets: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.entity)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        debug!(
            "event=change_publish module=repo status=ok table={} kind={} listeners={}",
            event.entity.table_name(),
            event.kind.as_str(),
            targets.len()
        );
        for listener in targets {
            listener(&event);
        }
    }
}

/// Optional feed handle carried by SQLite repositories.
#[derive(Clone, Copy, Default)]
pub(crate) struct Notifier<'feed>(Option<&'feed ChangeFeed>);

impl<'feed> Notifier<'feed> {
    pub(crate) fn new(feed: Option<&'feed ChangeFeed>) -> Self {
        Self(feed)
    }

    pub(crate) fn emit(&self, entity: EntityKind, kind: ChangeKind, id: Uuid) {
        if let Some(feed) = self.0 {
            feed.publish(ChangeEvent { entity, kind, id });
        }
    }
}
