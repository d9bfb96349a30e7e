//! Gateway implementations: process-local maps and a single JSON document on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::{ClassKey, ClassSnapshot, LoginRecord};
use super::gateway::{
    reconcile_login_index, ClassGateway, GatewayError, ListenerRegistry, SnapshotListener,
    Subscription,
};

/// Layout shared by both stores: class documents by storage key plus the login index.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CentreDocument {
    #[serde(default)]
    class_data: HashMap<String, ClassSnapshot>,
    #[serde(default)]
    student_index: HashMap<String, LoginRecord>,
}

impl CentreDocument {
    fn replace_class(&mut self, class: &ClassKey, snapshot: &ClassSnapshot) {
        let key = class.storage_key();
        let previous = self.class_data.get(&key).cloned();
        reconcile_login_index(&mut self.student_index, class, previous.as_ref(), snapshot);
        self.class_data.insert(key, snapshot.clone());
    }
}

#[derive(Default)]
pub struct InMemoryClassGateway {
    document: Mutex<CentreDocument>,
    listeners: ListenerRegistry,
}

impl InMemoryClassGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, class: &ClassKey) -> usize {
        self.listeners.listener_count(class)
    }
}

impl ClassGateway for InMemoryClassGateway {
    fn load(&self, class: &ClassKey) -> Result<Option<ClassSnapshot>, GatewayError> {
        let guard = self.document.lock().expect("gateway mutex poisoned");
        Ok(guard.class_data.get(&class.storage_key()).cloned())
    }

    fn save(&self, class: &ClassKey, snapshot: &ClassSnapshot) -> Result<(), GatewayError> {
        {
            let mut guard = self.document.lock().expect("gateway mutex poisoned");
            guard.replace_class(class, snapshot);
        }
        self.listeners.notify(class, Some(snapshot));
        Ok(())
    }

    fn subscribe(&self, class: &ClassKey, listener: SnapshotListener) -> Subscription {
        self.listeners.register(class, listener)
    }

    fn lookup_login(&self, username: &str) -> Result<Option<LoginRecord>, GatewayError> {
        let guard = self.document.lock().expect("gateway mutex poisoned");
        Ok(guard.student_index.get(username).cloned())
    }
}

/// Stores every class in one JSON file, rewritten in full on each save.
pub struct JsonFileClassGateway {
    path: PathBuf,
    document: Mutex<CentreDocument>,
    listeners: ListenerRegistry,
}

impl JsonFileClassGateway {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let path = path.into();
        let document = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                CentreDocument::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            CentreDocument::default()
        };

        tracing::debug!(path = %path.display(), classes = document.class_data.len(), "opened class store");

        Ok(Self {
            path,
            document: Mutex::new(document),
            listeners: ListenerRegistry::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, document: &CentreDocument) -> Result<(), GatewayError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(document)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl ClassGateway for JsonFileClassGateway {
    fn load(&self, class: &ClassKey) -> Result<Option<ClassSnapshot>, GatewayError> {
        let guard = self
            .document
            .lock()
            .map_err(|_| GatewayError::Unavailable("store lock poisoned".to_string()))?;
        Ok(guard.class_data.get(&class.storage_key()).cloned())
    }

    fn save(&self, class: &ClassKey, snapshot: &ClassSnapshot) -> Result<(), GatewayError> {
        {
            let mut guard = self
                .document
                .lock()
                .map_err(|_| GatewayError::Unavailable("store lock poisoned".to_string()))?;
            let mut next = guard.clone();
            next.replace_class(class, snapshot);
            self.persist(&next)?;
            *guard = next;
        }
        self.listeners.notify(class, Some(snapshot));
        Ok(())
    }

    fn subscribe(&self, class: &ClassKey, listener: SnapshotListener) -> Subscription {
        self.listeners.register(class, listener)
    }

    fn lookup_login(&self, username: &str) -> Result<Option<LoginRecord>, GatewayError> {
        let guard = self
            .document
            .lock()
            .map_err(|_| GatewayError::Unavailable("store lock poisoned".to_string()))?;
        Ok(guard.student_index.get(username).cloned())
    }
}
