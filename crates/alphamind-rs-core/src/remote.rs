//! Local record collections mirrored from a backend route.

use crate::state::StateCell;
use crate::transport::{Endpoint, decode};
use alphamind_rs_config::merge_json_values;
use alphamind_rs_protocol::{Agent, DataFile, Dataset, KnowledgeBase, TransportError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

/// A record addressable by a stable string id.
pub trait Record: Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            fn record_id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_record!(Agent, DataFile, Dataset, KnowledgeBase);

/// Ordered local copy of a backend collection plus the route it lives at.
///
/// Ids are unique within the collection: [`push`](Self::push) and
/// [`upsert`](Self::upsert) replace an existing record with the same id.
pub struct RemoteBackedCollection<T> {
    endpoint: Endpoint,
    items: StateCell<Vec<T>>,
}

impl<T> Clone for RemoteBackedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T: Record> RemoteBackedCollection<T> {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_items(endpoint, Vec::new())
    }

    pub fn with_items(endpoint: Endpoint, items: Vec<T>) -> Self {
        Self {
            endpoint,
            items: StateCell::new(dedup(items)),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn items(&self) -> Vec<T> {
        self.items.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.items
            .read(|items| items.iter().find(|item| item.record_id() == id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items
            .read(|items| items.iter().any(|item| item.record_id() == id))
    }

    pub fn len(&self) -> usize {
        self.items.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.items.read(|items| f(items))
    }

    /// Replace the whole collection.
    pub fn set_all(&self, items: Vec<T>) {
        self.items.replace(dedup(items));
    }

    /// Append `item`, replacing any record with the same id in place.
    pub fn push(&self, item: T) {
        self.upsert(item);
    }

    /// Replace the record with the same id, or append when absent.
    pub fn upsert(&self, item: T) {
        self.items.update(|items| {
            match items
                .iter_mut()
                .find(|existing| existing.record_id() == item.record_id())
            {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        });
    }

    /// Replace the record with the same id. Returns false when absent.
    pub fn replace(&self, item: T) -> bool {
        self.items.update_if(|items| {
            match items
                .iter_mut()
                .find(|existing| existing.record_id() == item.record_id())
            {
                Some(existing) => {
                    *existing = item;
                    true
                }
                None => false,
            }
        })
    }

    /// Mutate the record with `id`, returning the updated copy.
    pub fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut updated = None;
        self.items.update_if(|items| {
            let Some(item) = items.iter_mut().find(|item| item.record_id() == id) else {
                return false;
            };
            f(item);
            updated = Some(item.clone());
            true
        });
        updated
    }

    /// Mutate every record, notifying observers only if `f` reports a change.
    pub fn modify_all(&self, mut f: impl FnMut(&mut T) -> bool) -> bool {
        self.items.update_if(|items| {
            let mut changed = false;
            for item in items.iter_mut() {
                changed |= f(item);
            }
            changed
        })
    }

    /// Remove the record with `id`. Removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> Option<T> {
        let mut removed = None;
        self.items.update_if(|items| {
            let Some(index) = items.iter().position(|item| item.record_id() == id) else {
                return false;
            };
            removed = Some(items.remove(index));
            true
        });
        removed
    }
}

fn dedup<T: Record>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match unique
            .iter_mut()
            .find(|existing| existing.record_id() == item.record_id())
        {
            Some(existing) => *existing = item,
            None => unique.push(item),
        }
    }
    unique
}

/// Overlay a backend response on the local copy of a record.
///
/// Fields present in `remote` win; everything else is kept from `local`.
/// Without a local copy `remote` must decode as a complete record.
pub(crate) fn merge_remote<T>(local: Option<&T>, remote: Value) -> Result<T, TransportError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(local) = local else {
        return decode(remote);
    };
    if !remote.is_object() {
        return Err(TransportError::Decode(format!(
            "expected an object, got {remote}"
        )));
    }
    let mut merged =
        serde_json::to_value(local).map_err(|err| TransportError::Decode(err.to_string()))?;
    merge_json_values(&mut merged, &remote);
    decode(merged)
}
