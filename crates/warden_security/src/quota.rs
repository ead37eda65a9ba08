//! Quota / Resource Guard.
//!
//! Pressure escalates one way: evict units, then schedule a shutdown.

use crate::host::{Host, LogChannel};
use crate::Mediator;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use warden_core::{Identity, UnitId};

/// Which memory reserve the host had to break into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ReserveTier {
    /// Only the outer reserve is gone
    User,
    /// The inner reserve is gone too
    Master,
}

impl ReserveTier {
    /// Grace period before shutdown, in minutes.
    pub fn grace_minutes(self) -> u32 {
        match self {
            ReserveTier::User => 6,
            ReserveTier::Master => 1,
        }
    }
}

/// Outcome of [`Mediator::handle_memory_pressure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureOutcome {
    /// Eviction freed enough
    Relieved {
        /// Bytes freed
        freed: u64,
    },
    /// Eviction fell short; a shutdown is pending
    ShutdownScheduled {
        /// Bytes freed before giving up
        freed: u64,
        /// Minutes left until the pending shutdown
        minutes: u32,
    },
}

impl Mediator {
    fn evictable(&self, unit: UnitId) -> bool {
        self.units.get(unit).is_some_and(|subject| {
            let owner = subject.creator();
            unit != self.master()
                && *owner != self.config.policy.root_uid
                && !self.config.quota.exempt_identities.contains(owner)
                && !self.is_interactive(unit)
        })
    }

    /// Units destroyed along with `unit`: everything non-interactive inside
    /// it when it has no environment to evacuate to.
    fn collateral(&self, unit: UnitId) -> Vec<UnitId> {
        let stranded = self.units.get(unit).is_some_and(|subject| {
            subject
                .environment()
                .filter(|env| self.units.contains(*env))
                .is_none()
        });
        if !stranded {
            return Vec::new();
        }
        self.units
            .iter()
            .map(|inner| *inner.id())
            .filter(|inner| self.units.is_within(*inner, unit) && !self.is_interactive(*inner))
            .collect()
    }

    /// Evict units until `needed` bytes are freed or nothing evictable is
    /// left. Owners with the largest total footprint go first; within an
    /// owner, the largest units go first. A unit whose destruction would take
    /// protected contents with it is skipped. Returns the bytes freed,
    /// contents destroyed alongside included.
    #[instrument(skip(self, host))]
    pub fn run_quota_demon(&mut self, host: &mut dyn Host, needed: u64) -> u64 {
        let mut owners: BTreeMap<Identity, Vec<(UnitId, u64)>> = BTreeMap::new();
        for unit in self.units.iter() {
            if self.evictable(*unit.id()) && *unit.footprint() > 0 {
                owners
                    .entry(unit.creator().clone())
                    .or_default()
                    .push((*unit.id(), *unit.footprint()));
            }
        }
        let mut ranked: Vec<(Identity, u64, Vec<(UnitId, u64)>)> = owners
            .into_iter()
            .map(|(owner, mut units)| {
                units.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                let total = units.iter().map(|(_, bytes)| bytes).sum();
                (owner, total, units)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut freed = 0u64;
        'owners: for (owner, total, units) in ranked {
            debug!(%owner, total, "Evicting from owner");
            for (unit, _) in units {
                if freed >= needed {
                    break 'owners;
                }
                if !self.evictable(unit) {
                    continue;
                }
                let collateral = self.collateral(unit);
                if let Some(kept) = collateral.iter().find(|inner| !self.evictable(**inner)) {
                    debug!(%unit, protected = %kept, "Eviction would take protected contents");
                    continue;
                }
                let doomed: Vec<(UnitId, u64)> = std::iter::once(unit)
                    .chain(collateral)
                    .filter_map(|id| self.units.get(id).map(|u| (id, *u.footprint())))
                    .collect();
                match self.destruct(host, unit) {
                    Ok(()) => {
                        let bytes: u64 = doomed
                            .iter()
                            .filter(|(id, _)| !self.is_live(*id))
                            .map(|(_, bytes)| bytes)
                            .sum();
                        freed += bytes;
                        host.log_file(LogChannel::Quota, &format!("evicted {} ({} bytes) of {}\n", unit, bytes, owner));
                    }
                    Err(e) => debug!(%unit, error = %e, "Eviction vetoed"),
                }
            }
        }
        info!(freed, needed, "Quota demon finished");
        freed
    }

    /// Schedule a graceful shutdown in `minutes`.
    ///
    /// A pending shutdown is only ever brought forward, never postponed.
    /// Returns true when this call changed the schedule.
    pub fn slow_shut_down(&mut self, host: &mut dyn Host, minutes: u32) -> bool {
        self.slow_shut_down_at(host, minutes, Utc::now())
    }

    #[instrument(skip(self, host))]
    fn slow_shut_down_at(&mut self, host: &mut dyn Host, minutes: u32, now: DateTime<Utc>) -> bool {
        let deadline = now + TimeDelta::minutes(i64::from(minutes));
        if self.pending_shutdown.is_some_and(|pending| pending <= deadline) {
            debug!(pending = ?self.pending_shutdown, "Shutdown already sooner");
            return false;
        }
        self.pending_shutdown = Some(deadline);
        warn!(minutes, %deadline, "Shutdown scheduled");
        host.log_file(LogChannel::Quota, &format!("shutdown in {} minutes\n", minutes));
        let notice = format!("The game is shutting down in {} minute(s).\n", minutes);
        for unit in self.sessions.bound_units() {
            host.tell(unit, &notice);
        }
        host.schedule_shutdown(Duration::from_secs(u64::from(minutes) * 60));
        true
    }

    /// When the pending shutdown is due, if one is scheduled.
    pub fn pending_shutdown(&self) -> Option<DateTime<Utc>> {
        self.pending_shutdown
    }

    /// Whole minutes from `now` until the pending shutdown, rounded up.
    fn minutes_left(&self, now: DateTime<Utc>) -> Option<u32> {
        self.pending_shutdown.map(|deadline| {
            let seconds = (deadline - now).num_seconds().max(0);
            u32::try_from((seconds + 59) / 60).unwrap_or(u32::MAX)
        })
    }

    /// React to the host breaking into a memory reserve.
    #[instrument(skip(self, host))]
    pub fn handle_memory_pressure(
        &mut self,
        host: &mut dyn Host,
        needed: u64,
        tier: ReserveTier,
    ) -> PressureOutcome {
        let freed = self.run_quota_demon(host, needed);
        if freed >= needed {
            return PressureOutcome::Relieved { freed };
        }
        let now = Utc::now();
        self.slow_shut_down_at(host, tier.grace_minutes(), now);
        PressureOutcome::ShutdownScheduled {
            freed,
            minutes: self.minutes_left(now).unwrap_or(tier.grace_minutes()),
        }
    }
}
