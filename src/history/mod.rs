use log::{ debug, info };
use std::sync::Arc;

use crate::models::chat::Conversation;
use crate::storage::{ KeyValueStore, StorageError, CONVERSATIONS_KEY };

/// The conversation list, mirrored to a single snapshot in a key/value store.
///
/// Ordering: a conversation saved for the first time goes to the front;
/// saving a known id replaces that entry where it stands. Every mutation
/// rewrites the whole snapshot. Concurrent writers are not coordinated,
/// the last write wins.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    conversations: Vec<Conversation>,
}

impl ConversationStore {
    /// Reads the snapshot once. No snapshot means an empty list.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let conversations = match storage.get(CONVERSATIONS_KEY)? {
            Some(raw) => serde_json::from_str::<Vec<Conversation>>(&raw)?,
            None => Vec::new(),
        };
        info!("Loaded {} stored conversation(s)", conversations.len());
        Ok(Self { storage, conversations })
    }

    pub fn save(&mut self, conversation: &Conversation) -> Result<(), StorageError> {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
            }
            None => {
                self.conversations.insert(0, conversation.clone());
            }
        }
        self.persist()
    }

    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Returns whether an entry was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.conversations.clear();
        self.storage.remove(CONVERSATIONS_KEY)
    }

    fn persist(&self) -> Result<(), StorageError> {
        let snapshot = serde_json::to_string(&self.conversations)?;
        self.storage.set(CONVERSATIONS_KEY, &snapshot)?;
        debug!("Persisted {} conversation(s)", self.conversations.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Message;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, ConversationStore) {
        let backing = Arc::new(MemoryStore::new());
        let store = ConversationStore::load(backing.clone()).unwrap();
        (backing, store)
    }

    #[test]
    fn absent_snapshot_loads_empty() {
        let (_, store) = store();
        assert!(store.is_empty());
    }

    #[test]
    fn new_ids_are_inserted_at_front() {
        let (_, mut store) = store();
        let a = Conversation::new();
        let b = Conversation::new();
        store.save(&a).unwrap();
        store.save(&b).unwrap();
        let ids: Vec<_> = store.list().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);
    }

    #[test]
    fn known_id_is_overwritten_in_place() {
        let (_, mut store) = store();
        let mut a = Conversation::new();
        let b = Conversation::new();
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        a.push(Message::user("again"));
        store.save(&a).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[1].id, a.id);
        assert_eq!(store.list()[1].messages.len(), 1);
    }

    #[test]
    fn snapshot_survives_reload() {
        let (backing, mut store) = store();
        let mut a = Conversation::new();
        a.push(Message::user("hello"));
        store.save(&a).unwrap();

        let reloaded = ConversationStore::load(backing).unwrap();
        assert_eq!(reloaded.list(), store.list());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(CONVERSATIONS_KEY, "{not json").unwrap();
        assert!(matches!(
            ConversationStore::load(backing),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn delete_and_clear() {
        let (backing, mut store) = store();
        let a = Conversation::new();
        store.save(&a).unwrap();
        assert!(!store.delete("missing").unwrap());
        assert!(store.delete(&a.id).unwrap());
        assert!(store.is_empty());

        store.save(&a).unwrap();
        store.clear().unwrap();
        assert!(backing.get(CONVERSATIONS_KEY).unwrap().is_none());
    }
}
