//! Registry of rooms the bot has joined.

use parking_lot::RwLock;

use crate::foundation::message::names_match;

/// The set of rooms the bot is in.
///
/// Names compare case-insensitively and the first spelling seen is kept.
/// Enumeration follows insertion order, which is the order `shut_down`
/// leaves rooms in. The registry survives reconnects and is only cleared
/// on shutdown.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<Vec<String>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a room unless it is already present under any casing.
    ///
    /// Returns `true` if the room was added.
    pub fn insert(&self, room: &str) -> bool {
        let mut rooms = self.rooms.write();
        if rooms.iter().any(|r| names_match(r, room)) {
            return false;
        }
        rooms.push(room.to_string());
        true
    }

    /// Adds every room in `rooms`, returning how many were new.
    pub fn extend<I, S>(&self, rooms: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rooms
            .into_iter()
            .filter(|room| self.insert(room.as_ref()))
            .count()
    }

    /// Returns `true` if the room is registered under any casing.
    pub fn contains(&self, room: &str) -> bool {
        self.rooms.read().iter().any(|r| names_match(r, room))
    }

    /// Copies out the registered rooms in enumeration order.
    pub fn snapshot(&self) -> Vec<String> {
        self.rooms.read().clone()
    }

    /// Number of registered rooms.
    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    /// Returns `true` if no room is registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }

    /// Forgets every room.
    pub fn clear(&self) {
        self.rooms.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_differing_in_case_are_one_entry() {
        let registry = RoomRegistry::new();
        assert!(registry.insert("Lobby"));
        assert!(!registry.insert("lobby"));
        assert!(!registry.insert("LOBBY"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(), vec!["Lobby".to_string()]);
        assert!(registry.contains("lObBy"));
    }

    #[test]
    fn enumeration_follows_insertion() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.extend(["dev", "random", "DEV", "ops"]), 3);
        assert_eq!(registry.snapshot(), vec!["dev", "random", "ops"]);
    }

    #[test]
    fn clear_empties_registry() {
        let registry = RoomRegistry::new();
        registry.extend(["a", "b"]);
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("a"));
    }
}
