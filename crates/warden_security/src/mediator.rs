//! The mediator: world state plus the policy every component consults.

use crate::session::SessionTable;
use crate::world::{Unit, UnitTable};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, instrument, warn};
use warden_core::{Facet, Identity, PrivilegeLevel, PrivilegedOp, UnitId, WardenConfig};
use warden_error::{ConfigError, WardenResult};

/// A decision path that must not be entered twice for the same subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Checkpoint {
    Decide(PrivilegedOp, UnitId),
    Destruct(UnitId),
    Shadow(UnitId),
}

/// The reference monitor.
///
/// One mediator serves one host runtime. It owns the table of live units,
/// the session table, and the configured policy; every host-visible
/// operation is a method on it.
#[derive(Debug)]
pub struct Mediator {
    pub(crate) config: WardenConfig,
    pub(crate) units: UnitTable,
    pub(crate) sessions: SessionTable,
    pub(crate) name_pattern: Regex,
    pub(crate) heartbeat_failures: HashMap<UnitId, u32>,
    pub(crate) pending_shutdown: Option<chrono::DateTime<chrono::Utc>>,
    in_flight: HashSet<Checkpoint>,
    master: UnitId,
}

impl Mediator {
    /// Build a mediator and spawn its master unit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid policy or name pattern, and
    /// a mediator error when the master path is not attributable to root.
    #[instrument(skip(config), fields(master = %config.session.master_path))]
    pub fn new(config: WardenConfig) -> WardenResult<Self> {
        config.validate()?;
        let name_pattern = Regex::new(&config.session.name_pattern).map_err(|e| {
            ConfigError::new(format!(
                "session.name_pattern '{}' is not a valid regex: {}",
                config.session.name_pattern, e
            ))
        })?;

        let mut units = UnitTable::default();
        let master_path = config.session.master_path.clone();
        let master = units.insert(
            master_path.clone(),
            warden_core::path::program_name(&master_path),
            config.policy.root_uid.clone(),
            BTreeSet::new(),
        );

        let mediator = Self {
            config,
            units,
            sessions: SessionTable::default(),
            name_pattern,
            heartbeat_failures: HashMap::new(),
            pending_shutdown: None,
            in_flight: HashSet::new(),
            master,
        };

        if mediator.creator_file(&master_path).as_ref() != Some(&mediator.config.policy.root_uid) {
            return Err(ConfigError::new(format!(
                "session.master_path '{}' must lie under a root-owned prefix",
                master_path
            ))
            .into());
        }

        info!(master = %mediator.master, "Mediator ready");
        Ok(mediator)
    }

    /// Active configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Handle of the master unit.
    pub fn master(&self) -> UnitId {
        self.master
    }

    /// Look up a live unit.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// True while the unit exists.
    pub fn is_live(&self, id: UnitId) -> bool {
        self.units.contains(id)
    }

    /// Live unit currently registered at `path`.
    pub fn find(&self, path: &str) -> Option<UnitId> {
        self.units.find(path)
    }

    /// Number of live units, the master included.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Iterate over all live units.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Effective identity of a live unit.
    pub fn euid_of(&self, id: UnitId) -> Option<&Identity> {
        self.units.get(id).and_then(Unit::euid)
    }

    /// Privilege level a unit currently acts with.
    ///
    /// Destroyed units and units without an effective identity are players.
    pub fn level_of_unit(&self, id: UnitId) -> PrivilegeLevel {
        self.config.policy.level_of(self.euid_of(id))
    }

    /// True when the unit's effective identity is root.
    pub(crate) fn acts_as_root(&self, id: UnitId) -> bool {
        self.euid_of(id) == Some(&self.config.policy.root_uid)
    }

    /// Record the memory the host attributes to a unit.
    pub fn set_footprint(&mut self, id: UnitId, bytes: u64) {
        self.units.set_footprint(id, bytes);
    }

    /// Whether the unit's periodic task is enabled.
    pub fn heartbeat_enabled(&self, id: UnitId) -> bool {
        self.units.get(id).is_some_and(|unit| *unit.heartbeat())
    }

    /// Move a unit into a container.
    ///
    /// Refused when either side is gone, the destination is not a container,
    /// or the move would place a unit inside itself.
    #[instrument(skip(self))]
    pub fn move_into(&mut self, id: UnitId, container: UnitId) -> bool {
        let fits = self
            .units
            .get(container)
            .is_some_and(|dest| dest.has(Facet::Container));
        if !fits || !self.units.contains(id) || id == container || self.units.is_within(container, id)
        {
            warn!("Move refused");
            return false;
        }
        self.units.relocate(id, Some(container));
        true
    }

    pub(crate) fn in_flight(&self, checkpoint: Checkpoint) -> bool {
        self.in_flight.contains(&checkpoint)
    }

    /// Run `body` unless `checkpoint` is already in flight, in which case
    /// `reentered` is returned without running it.
    pub(crate) fn guarded<T>(
        &mut self,
        checkpoint: Checkpoint,
        reentered: T,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if !self.in_flight.insert(checkpoint) {
            warn!(?checkpoint, "Re-entrant request refused");
            return reentered;
        }
        let outcome = body(self);
        self.in_flight.remove(&checkpoint);
        outcome
    }
}
