use crate::error::SpawnError;
use crate::local::reference::ActorRef;
use kestrel_api::supervisor::RestartStatistics;
use std::collections::HashMap;

/// State of one child slot.
///
/// A name is reserved while the child is being created and becomes living
/// once the cell is attached. The slot is released only after the child's
/// termination is confirmed, so a name can never address two incarnations
/// at once.
#[derive(Debug)]
pub enum ChildEntry {
    Reserved,
    Living {
        actor: ActorRef,
        stats: RestartStatistics,
    },
}

/// Child bookkeeping owned by a single cell.
///
/// Only ever touched from the owning cell's execution turn.
#[derive(Debug, Default)]
pub struct ChildrenContainer {
    entries: HashMap<String, ChildEntry>,
    terminating: bool,
}

impl ChildrenContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a name for a child under construction.
    pub fn reserve(&mut self, name: &str) -> Result<(), SpawnError> {
        if self.terminating {
            return Err(SpawnError::ParentStopping(name.to_string()));
        }
        if self.entries.contains_key(name) {
            return Err(SpawnError::NameAlreadyInUse(name.to_string()));
        }
        self.entries.insert(name.to_string(), ChildEntry::Reserved);
        Ok(())
    }

    /// Resolves a reservation into a living child.
    pub fn commit(&mut self, name: &str, actor: ActorRef) {
        self.entries.insert(
            name.to_string(),
            ChildEntry::Living {
                actor,
                stats: RestartStatistics::new(),
            },
        );
    }

    /// Releases a reservation whose creation failed.
    pub fn cancel_reservation(&mut self, name: &str) {
        if matches!(self.entries.get(name), Some(ChildEntry::Reserved)) {
            self.entries.remove(name);
        }
    }

    pub fn name_of(&self, actor: &ActorRef) -> Option<&str> {
        self.entries.iter().find_map(|(name, entry)| match entry {
            ChildEntry::Living { actor: child, .. } if child == actor => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn entry_of(&self, actor: &ActorRef) -> Option<&ChildEntry> {
        let name = self.name_of(actor)?;
        self.entries.get(name)
    }

    pub fn stats_of(&mut self, actor: &ActorRef) -> Option<&mut RestartStatistics> {
        let name = self.name_of(actor)?.to_string();
        match self.entries.get_mut(&name) {
            Some(ChildEntry::Living { stats, .. }) => Some(stats),
            _ => None,
        }
    }

    /// Removes the slot of a terminated child, releasing its name.
    pub fn remove(&mut self, actor: &ActorRef) -> Option<String> {
        let name = self.name_of(actor)?.to_string();
        self.entries.remove(&name);
        Some(name)
    }

    /// References of all living children.
    pub fn refs(&self) -> Vec<ActorRef> {
        self.entries
            .values()
            .filter_map(|entry| match entry {
                ChildEntry::Living { actor, .. } => Some(actor.clone()),
                ChildEntry::Reserved => None,
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ChildEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Marks the container terminating; further reservations are rejected.
    pub fn set_terminating(&mut self) {
        self.terminating = true;
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::path::ActorPath;

    fn child_ref(name: &str) -> ActorRef {
        ActorRef::empty(ActorPath::root("test").child(name))
    }

    #[test]
    fn reservation_blocks_duplicates() {
        let mut children = ChildrenContainer::new();
        children.reserve("a").unwrap();
        assert!(matches!(
            children.reserve("a"),
            Err(SpawnError::NameAlreadyInUse(_))
        ));

        children.commit("a", child_ref("a"));
        assert!(matches!(
            children.reserve("a"),
            Err(SpawnError::NameAlreadyInUse(_))
        ));
    }

    #[test]
    fn name_is_released_after_removal() {
        let mut children = ChildrenContainer::new();
        let a = child_ref("a");
        children.reserve("a").unwrap();
        children.commit("a", a.clone());

        assert_eq!(children.remove(&a).as_deref(), Some("a"));
        assert!(children.reserve("a").is_ok());
    }

    #[test]
    fn cancel_only_removes_reservations() {
        let mut children = ChildrenContainer::new();
        let a = child_ref("a");
        children.reserve("a").unwrap();
        children.commit("a", a);

        children.cancel_reservation("a");
        assert!(!children.is_empty());
    }

    #[test]
    fn terminating_container_rejects_new_children() {
        let mut children = ChildrenContainer::new();
        children.set_terminating();
        assert!(matches!(
            children.reserve("a"),
            Err(SpawnError::ParentStopping(_))
        ));
    }
}
