//! The table of live units.

use std::collections::{BTreeSet, HashMap};
use warden_core::{Facet, Identity, UnitId};

/// One live executing unit as the mediator sees it.
///
/// The effective identity is private: only the credential validator changes it.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct Unit {
    /// Process-unique handle
    id: UnitId,
    /// Instance path, e.g. `/obj/player#12`
    path: String,
    /// Compiled program, e.g. `obj/player.c`
    program: String,
    /// Owner attributed at creation; never changes
    creator: Identity,
    #[getter(skip)]
    euid: Option<Identity>,
    /// Behaviour the unit carries
    facets: BTreeSet<Facet>,
    /// Container the unit is in
    environment: Option<UnitId>,
    /// Units contained in this one
    inventory: Vec<UnitId>,
    /// Whether the periodic task is currently enabled
    heartbeat: bool,
    /// Memory attributed to the unit by the host
    footprint: u64,
}

impl Unit {
    /// Current effective identity; `None` when dropped.
    pub fn euid(&self) -> Option<&Identity> {
        self.euid.as_ref()
    }

    /// True when the unit carries `facet`.
    pub fn has(&self, facet: Facet) -> bool {
        self.facets.contains(&facet)
    }
}

/// Live units indexed by handle and by path.
#[derive(Debug, Default)]
pub(crate) struct UnitTable {
    units: HashMap<UnitId, Unit>,
    by_path: HashMap<String, UnitId>,
    next_id: u64,
    next_clone: u64,
}

impl UnitTable {
    pub(crate) fn insert(
        &mut self,
        path: String,
        program: String,
        creator: Identity,
        facets: BTreeSet<Facet>,
    ) -> UnitId {
        self.next_id += 1;
        let id = UnitId::from(self.next_id);
        let heartbeat = facets.contains(&Facet::Heartbeat);
        self.by_path.insert(path.clone(), id);
        self.units.insert(
            id,
            Unit {
                id,
                path,
                program,
                euid: Some(creator.clone()),
                creator,
                facets,
                environment: None,
                inventory: Vec::new(),
                heartbeat,
                footprint: 0,
            },
        );
        id
    }

    pub(crate) fn next_clone_number(&mut self) -> u64 {
        self.next_clone += 1;
        self.next_clone
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    pub(crate) fn find(&self, path: &str) -> Option<UnitId> {
        self.by_path.get(path).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub(crate) fn set_euid(&mut self, id: UnitId, euid: Option<Identity>) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.euid = euid;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_heartbeat(&mut self, id: UnitId, enabled: bool) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.heartbeat = enabled;
        }
    }

    pub(crate) fn set_footprint(&mut self, id: UnitId, bytes: u64) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.footprint = bytes;
        }
    }

    /// Move `id` into `container`, detaching it from its previous environment.
    pub(crate) fn relocate(&mut self, id: UnitId, container: Option<UnitId>) {
        let previous = match self.units.get_mut(&id) {
            Some(unit) => std::mem::replace(&mut unit.environment, container),
            None => return,
        };
        if let Some(old) = previous.and_then(|old| self.units.get_mut(&old)) {
            old.inventory.retain(|item| *item != id);
        }
        if let Some(new) = container.and_then(|new| self.units.get_mut(&new)) {
            new.inventory.push(id);
        }
    }

    /// True when `ancestor` contains `id`, directly or transitively.
    pub(crate) fn is_within(&self, id: UnitId, ancestor: UnitId) -> bool {
        let mut current = self.get(id).and_then(|unit| unit.environment);
        let mut hops = 0usize;
        while let Some(env) = current {
            if env == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.units.len() {
                return false;
            }
            current = self.get(env).and_then(|unit| unit.environment);
        }
        false
    }

    /// Drop a unit from the table, detaching it from its environment and
    /// orphaning anything still inside it.
    pub(crate) fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.relocate(id, None);
        let unit = self.units.remove(&id)?;
        for item in &unit.inventory {
            if let Some(child) = self.units.get_mut(item) {
                child.environment = None;
            }
        }
        if self.by_path.get(&unit.path) == Some(&id) {
            self.by_path.remove(&unit.path);
        }
        Some(unit)
    }

    pub(crate) fn len(&self) -> usize {
        self.units.len()
    }
}
