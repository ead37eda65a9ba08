//! Identity Resolver: who owns a unit, decided once at creation.

use crate::Mediator;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};
use warden_core::{path, Facet, Identity, UnitId};
use warden_error::{MediatorError, MediatorErrorKind, MediatorResult};

impl Mediator {
    /// Identity a path's code belongs to, `None` when the path is unowned.
    ///
    /// Accepts instance paths (`/players/bob/torch#3`) and program names
    /// (`players/bob/torch.c`) alike.
    pub fn creator_file(&self, path: &str) -> Option<Identity> {
        let canonical = path::normalize(&path::object_path(path))?;
        let base = path::blueprint_path(&canonical);
        let policy = &self.config.policy;

        for root in [&policy.player_root, &policy.domain_root] {
            if let Some(name) = path::component_below(base, root) {
                // Namespaces may not masquerade as the privileged identities
                if name == policy.root_uid.as_str() || name == policy.backbone_uid.as_str() {
                    return None;
                }
                return Some(Identity::new(name));
            }
        }
        if policy.root_prefixes.iter().any(|p| path::is_under(base, p)) {
            return Some(policy.root_uid.clone());
        }
        if policy.backbone_prefixes.iter().any(|p| path::is_under(base, p)) {
            return Some(policy.backbone_uid.clone());
        }
        None
    }

    /// Owner for a unit about to be created at `path` on behalf of
    /// `instantiator`.
    ///
    /// Backbone code is never its own owner: it takes the instantiator's
    /// effective identity, or root when created at the host's own request.
    pub fn resolve_creator(&self, path: &str, instantiator: Option<UnitId>) -> Option<Identity> {
        let owner = self.creator_file(path)?;
        if owner != self.config.policy.backbone_uid {
            return Some(owner);
        }
        match instantiator {
            None => Some(self.config.policy.root_uid.clone()),
            Some(id) => self
                .units
                .get(id)?
                .euid()
                .filter(|euid| **euid != self.config.policy.backbone_uid)
                .cloned(),
        }
    }

    /// Load the unit for a program, returning the live unit when one exists.
    ///
    /// # Errors
    ///
    /// Returns `InstantiationRefused` when no owner can be attributed; the
    /// unit never becomes live.
    #[instrument(skip(self, facets))]
    pub fn load(
        &mut self,
        program: &str,
        instantiator: Option<UnitId>,
        facets: impl IntoIterator<Item = Facet>,
    ) -> MediatorResult<UnitId> {
        let path = path::object_path(program);
        let lookup = path::normalize(&path).unwrap_or_else(|| path.clone());
        if let Some(existing) = self.units.find(&lookup) {
            debug!(%existing, "Program already loaded");
            return Ok(existing);
        }
        self.instantiate(path, instantiator, facets.into_iter().collect())
    }

    /// Create a fresh instance of a program under a new clone path.
    ///
    /// # Errors
    ///
    /// Returns `InstantiationRefused` when no owner can be attributed.
    #[instrument(skip(self, facets))]
    pub fn clone_unit(
        &mut self,
        program: &str,
        instantiator: Option<UnitId>,
        facets: impl IntoIterator<Item = Facet>,
    ) -> MediatorResult<UnitId> {
        let number = self.units.next_clone_number();
        let path = format!("{}#{}", path::object_path(program), number);
        self.instantiate(path, instantiator, facets.into_iter().collect())
    }

    fn instantiate(
        &mut self,
        path: String,
        instantiator: Option<UnitId>,
        facets: BTreeSet<Facet>,
    ) -> MediatorResult<UnitId> {
        let Some(canonical) = path::normalize(&path) else {
            warn!(%path, "Refusing to instantiate non-canonical path");
            return Err(MediatorError::new(MediatorErrorKind::InstantiationRefused { path }));
        };
        let Some(creator) = self.resolve_creator(&canonical, instantiator) else {
            warn!(%canonical, ?instantiator, "No owner for new unit");
            return Err(MediatorError::new(MediatorErrorKind::InstantiationRefused {
                path: canonical,
            }));
        };

        let program = path::program_name(&canonical);
        let id = self.units.insert(canonical, program, creator.clone(), facets);
        info!(%id, %creator, "Unit created");
        Ok(id)
    }
}
