use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::domain::{ClassKey, ClassSnapshot, LoginRecord};

/// Callback receiving the full class snapshot after every change.
pub type SnapshotListener = Arc<dyn Fn(Option<ClassSnapshot>) + Send + Sync>;

/// Storage abstraction for class documents and the global login index.
///
/// `save` replaces the whole document for the class. Implementations reconcile the login index
/// in the same call but do not promise atomicity between the two.
pub trait ClassGateway: Send + Sync {
    fn load(&self, class: &ClassKey) -> Result<Option<ClassSnapshot>, GatewayError>;
    fn save(&self, class: &ClassKey, snapshot: &ClassSnapshot) -> Result<(), GatewayError>;
    fn subscribe(&self, class: &ClassKey, listener: SnapshotListener) -> Subscription;
    fn lookup_login(&self, username: &str) -> Result<Option<LoginRecord>, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored document is invalid: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Rewrite the login index for a class roster change.
///
/// Usernames that disappeared from the roster are dropped when their entry still points at this
/// class; every current student is upserted.
pub(crate) fn reconcile_login_index(
    index: &mut HashMap<String, LoginRecord>,
    class: &ClassKey,
    previous: Option<&ClassSnapshot>,
    next: &ClassSnapshot,
) {
    if let Some(previous) = previous {
        for old in &previous.students {
            let still_present = next
                .students
                .iter()
                .any(|student| student.username == old.username);
            let owned_here = index
                .get(&old.username)
                .is_some_and(|record| record.class_key().storage_key() == class.storage_key());
            if !still_present && owned_here {
                index.remove(&old.username);
            }
        }
    }

    for student in &next.students {
        index.insert(
            student.username.clone(),
            LoginRecord {
                school: class.school.clone(),
                grade: class.grade.clone(),
                password: student.password.clone(),
            },
        );
    }
}

/// Per-class listener registry shared by the gateway implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    listeners: HashMap<String, Vec<(u64, SnapshotListener)>>,
}

static SUBSCRIPTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl ListenerRegistry {
    pub fn register(&self, class: &ClassKey, listener: SnapshotListener) -> Subscription {
        let id = SUBSCRIPTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.lock().expect("listener mutex poisoned");
        let key = class.storage_key();
        guard
            .listeners
            .entry(key.clone())
            .or_default()
            .push((id, listener));

        Subscription {
            registry: Arc::downgrade(&self.inner),
            key,
            id,
        }
    }

    /// Deliver a snapshot to every listener of the class. The registry lock is released first.
    pub fn notify(&self, class: &ClassKey, snapshot: Option<&ClassSnapshot>) {
        let listeners: Vec<SnapshotListener> = {
            let guard = self.inner.lock().expect("listener mutex poisoned");
            guard
                .listeners
                .get(&class.storage_key())
                .map(|entries| entries.iter().map(|(_, listener)| listener.clone()).collect())
                .unwrap_or_default()
        };

        for listener in listeners {
            listener(snapshot.cloned());
        }
    }

    pub fn listener_count(&self, class: &ClassKey) -> usize {
        let guard = self.inner.lock().expect("listener mutex poisoned");
        guard
            .listeners
            .get(&class.storage_key())
            .map_or(0, Vec::len)
    }
}

/// Handle detaching a listener when cancelled or dropped.
#[must_use = "dropping a subscription detaches its listener"]
pub struct Subscription {
    registry: Weak<Mutex<RegistryInner>>,
    key: String,
    id: u64,
}

impl Subscription {
    pub fn cancel(self) {}

    fn detach(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut guard) = registry.lock() else {
            return;
        };
        if let Some(entries) = guard.listeners.get_mut(&self.key) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                guard.listeners.remove(&self.key);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
