use std::{collections::HashMap, sync::Mutex};

use crate::error::AfficheResult;

/// Swappable artifact sink: store bytes, get back an addressable location.
/// The concrete backend (object storage, local filesystem) lives outside
/// this crate.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> AfficheResult<String>;
}

/// Path convention for render artifacts.
pub fn artifact_path(campaign_id: &str, render_id: &str, artifact_name: &str) -> String {
    format!("renders/{campaign_id}/{render_id}/{artifact_name}")
}

/// In-memory store for tests and the CLI's dry runs.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("memory store poisoned").get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("memory store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&self, path: &str, bytes: &[u8]) -> AfficheResult<String> {
        self.objects
            .lock()
            .expect("memory store poisoned")
            .insert(path.to_string(), bytes.to_vec());
        Ok(format!("mem://{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_follows_convention() {
        assert_eq!(
            artifact_path("c1", "r1", "bg_square.png"),
            "renders/c1/r1/bg_square.png"
        );
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        let url = store.put("renders/c/r/a.png", b"abc").unwrap();
        assert_eq!(url, "mem://renders/c/r/a.png");
        assert_eq!(store.get("renders/c/r/a.png").unwrap(), b"abc");
        assert_eq!(store.len(), 1);
    }
}
