//! Destruction Gatekeeper.

use crate::host::Host;
use crate::mediator::Checkpoint;
use crate::Mediator;
use tracing::{debug, info, instrument, warn};
use warden_core::{Facet, UnitId};
use warden_error::{MediatorError, MediatorErrorKind, MediatorResult};

/// Why a destruction was vetoed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AbortReason {
    /// The unit does not exist
    #[display("unit is not live")]
    NotLive,
    /// The master unit is never destroyed
    #[display("the master unit cannot be destroyed")]
    Master,
    /// A destruction of this unit is already being prepared
    #[display("destruction already in progress")]
    Reentrant,
    /// An interactive unit inside has nowhere to go
    #[display("no refuge for interactive contents")]
    NoRefuge,
    /// A contained unit refused to be destroyed
    #[display("contained {} could not be destroyed", _0)]
    Contents(UnitId),
}

/// Outcome of [`Mediator::prepare_destruct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Contents evacuated, dependents notified; destruction may proceed
    Ready,
    /// Destruction vetoed; the unit stays live
    Abort(AbortReason),
}

impl Readiness {
    /// True for [`Readiness::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl Mediator {
    /// Prepare `unit` for destruction.
    ///
    /// Each contained unit is told its container is going away, then moved
    /// out: interactive units to the void room (or the container's
    /// environment), others to the environment. Non-interactive contents with
    /// nowhere to go are destroyed with it.
    #[instrument(skip(self, host))]
    pub fn prepare_destruct(&mut self, host: &mut dyn Host, unit: UnitId) -> Readiness {
        if unit == self.master() {
            return Readiness::Abort(AbortReason::Master);
        }
        if !self.is_live(unit) {
            return Readiness::Abort(AbortReason::NotLive);
        }
        self.guarded(
            Checkpoint::Destruct(unit),
            Readiness::Abort(AbortReason::Reentrant),
            |m| m.evacuate(host, unit),
        )
    }

    fn evacuate(&mut self, host: &mut dyn Host, unit: UnitId) -> Readiness {
        let Some(subject) = self.units.get(unit) else {
            return Readiness::Abort(AbortReason::NotLive);
        };
        let inventory = subject.inventory().clone();
        if inventory.is_empty() {
            return Readiness::Ready;
        }
        let environment = subject.environment().filter(|env| self.units.contains(*env));
        let void = if inventory.iter().any(|item| self.is_interactive(*item)) {
            self.void_room(unit)
        } else {
            None
        };
        if void.or(environment).is_none() && inventory.iter().any(|item| self.is_interactive(*item)) {
            warn!(%unit, "Interactive contents have no refuge");
            return Readiness::Abort(AbortReason::NoRefuge);
        }

        for item in inventory {
            if !self.is_inside(item, unit) {
                continue;
            }
            host.container_destructing(self, item, unit);
            if !self.is_inside(item, unit) {
                continue;
            }
            let refuge = if self.is_interactive(item) {
                void.or(environment)
            } else {
                environment
            };
            match refuge.filter(|dest| self.units.contains(*dest)) {
                Some(dest) => {
                    debug!(%item, %dest, "Evacuating");
                    self.units.relocate(item, Some(dest));
                }
                None => {
                    if let Err(e) = self.destruct(host, item) {
                        warn!(%item, error = %e, "Contents refused destruction");
                        return Readiness::Abort(AbortReason::Contents(item));
                    }
                }
            }
        }
        Readiness::Ready
    }

    fn is_inside(&self, item: UnitId, container: UnitId) -> bool {
        self.units
            .get(item)
            .is_some_and(|unit| *unit.environment() == Some(container))
    }

    /// The void room, loaded on demand, unless it is `leaving` or inside it.
    fn void_room(&mut self, leaving: UnitId) -> Option<UnitId> {
        let program = warden_core::path::program_name(&self.config.session.void_path);
        let void = match self.load(&program, None, [Facet::Container]) {
            Ok(void) => void,
            Err(e) => {
                warn!(error = %e, "Void room unavailable");
                return None;
            }
        };
        (void != leaving && !self.units.is_within(void, leaving)).then_some(void)
    }

    /// Destroy `unit` if the gatekeeper agrees.
    ///
    /// Already-destroyed units are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DestructAborted` when preparation vetoes; the unit stays live.
    #[instrument(skip(self, host))]
    pub fn destruct(&mut self, host: &mut dyn Host, unit: UnitId) -> MediatorResult<()> {
        let Some(path) = self.unit(unit).map(|u| u.path().clone()) else {
            debug!("Already destroyed");
            return Ok(());
        };
        match self.prepare_destruct(host, unit) {
            Readiness::Ready | Readiness::Abort(AbortReason::NotLive) => {
                self.teardown(unit);
                Ok(())
            }
            Readiness::Abort(reason) => Err(MediatorError::new(MediatorErrorKind::DestructAborted {
                path,
                reason: reason.to_string(),
            })),
        }
    }

    /// Destroy `unit` regardless of a veto from its contents.
    ///
    /// Still refuses the master unit and a unit whose destruction is already
    /// being prepared. Returns true when the unit is gone.
    #[instrument(skip(self, host))]
    pub fn force_destruct(&mut self, host: &mut dyn Host, unit: UnitId) -> bool {
        match self.prepare_destruct(host, unit) {
            Readiness::Abort(AbortReason::Master | AbortReason::Reentrant) => false,
            _ => {
                self.teardown(unit);
                true
            }
        }
    }

    fn teardown(&mut self, unit: UnitId) {
        self.disconnect(unit);
        self.heartbeat_failures.remove(&unit);
        if let Some(gone) = self.units.remove(unit) {
            info!(%unit, path = %gone.path(), "Unit destroyed");
        }
    }
}
