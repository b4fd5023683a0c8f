//! The global user directory and stable handles into it.
//!
//! Everyone the lobby server knows about lives in one [`UserDirectory`],
//! owned by the transport layer. A battle never stores a `User` itself: it
//! stores a [`UserHandle`], which is an index plus a generation counter.
//!
//! When a user disconnects their slot is freed and its generation bumped.
//! Any handle still pointing at the old generation resolves to `None`
//! instead of to whoever reuses the slot.

/// A lobby user as the server describes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    /// Two-letter country code.
    pub country: String,
    pub rank: u32,
}

impl User {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            country: String::new(),
            rank: 0,
        }
    }
}

/// A generation-checked reference into a [`UserDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    user: Option<User>,
}

/// Arena of connected users.
#[derive(Debug, Default)]
pub struct UserDirectory {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `user` and returns a handle to it, reusing a freed slot when
    /// one is available.
    pub fn insert(&mut self, user: User) -> UserHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.user = Some(user);
            return UserHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            user: Some(user),
        });
        UserHandle {
            index,
            generation: 0,
        }
    }

    /// Resolves `handle`, or `None` if the user has since been removed.
    pub fn get(&self, handle: UserHandle) -> Option<&User> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.user.as_ref())
    }

    pub fn get_mut(&mut self, handle: UserHandle) -> Option<&mut User> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.user.as_mut())
    }

    /// Removes the user behind `handle`, invalidating every copy of it.
    pub fn remove(&mut self, handle: UserHandle) -> Option<User> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let user = slot.user.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(user)
    }

    /// Finds a live user by nickname.
    pub fn find_by_nick(&self, nick: &str) -> Option<UserHandle> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.user
                .as_ref()
                .filter(|user| user.nick == nick)
                .map(|_| UserHandle {
                    index: index as u32,
                    generation: slot.generation,
                })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_returns_user() {
        let mut dir = UserDirectory::new();
        let alice = dir.insert(User::new("alice"));
        assert_eq!(dir.get(alice).map(|u| u.nick.as_str()), Some("alice"));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_remove_invalidates_stale_handle_after_reuse() {
        let mut dir = UserDirectory::new();
        let alice = dir.insert(User::new("alice"));
        assert!(dir.remove(alice).is_some());

        // Same slot, new generation.
        let bob = dir.insert(User::new("bob"));
        assert_ne!(alice, bob);
        assert!(dir.get(alice).is_none());
        assert_eq!(dir.get(bob).map(|u| u.nick.as_str()), Some("bob"));
        assert!(dir.remove(alice).is_none());
    }

    #[test]
    fn test_find_by_nick_skips_removed_users() {
        let mut dir = UserDirectory::new();
        let alice = dir.insert(User::new("alice"));
        dir.insert(User::new("bob"));
        assert_eq!(dir.find_by_nick("alice"), Some(alice));

        dir.remove(alice);
        assert_eq!(dir.find_by_nick("alice"), None);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_get_mut_updates_rank() {
        let mut dir = UserDirectory::new();
        let handle = dir.insert(User::new("carol"));
        if let Some(user) = dir.get_mut(handle) {
            user.rank = 4;
        }
        assert_eq!(dir.get(handle).map(|u| u.rank), Some(4));
    }
}
