//! Editor setup persistence, written by the master on a user's behalf.

use crate::host::Host;
use crate::Mediator;
use tracing::{debug, instrument};
use warden_core::UnitId;

const SETUP_FILE: &str = "~/.edrc";
const DEAD_EDIT_DIR: &str = "~/dead.edit";

impl Mediator {
    /// Save the editor setup code of `who` to its home directory.
    ///
    /// The master acts as `who` only for the duration of the write.
    #[instrument(skip(self, host))]
    pub fn save_ed_setup(&mut self, host: &mut dyn Host, who: UnitId, code: i64) -> bool {
        let Some(identity) = self.euid_of(who).cloned() else {
            return false;
        };
        let master = self.master();
        let Some(scope) = self.assume_euid(master, identity) else {
            return false;
        };
        let access = scope.validate_write_for(master, SETUP_FILE, "write_file");
        match access.resolve(SETUP_FILE) {
            Some(path) => host.write_file(path, &code.to_string()),
            None => {
                debug!("Editor setup write denied");
                false
            }
        }
    }

    /// Read back the editor setup code of `who`; 0 when absent or denied.
    #[instrument(skip(self, host))]
    pub fn retrieve_ed_setup(&mut self, host: &mut dyn Host, who: UnitId) -> i64 {
        let Some(identity) = self.euid_of(who).cloned() else {
            return 0;
        };
        let master = self.master();
        let Some(scope) = self.assume_euid(master, identity) else {
            return 0;
        };
        let access = scope.validate_read_for(master, SETUP_FILE, "read_file");
        access
            .resolve(SETUP_FILE)
            .and_then(|path| host.read_file(path))
            .and_then(|contents| contents.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Where the unsaved buffer of `who`, editing `file`, is kept when the
    /// editor is torn down. `None` when `who` may not write there.
    #[instrument(skip(self))]
    pub fn ed_buffer_save_path(&mut self, who: UnitId, file: &str) -> Option<String> {
        let name = file.rsplit('/').find(|part| !part.is_empty() && *part != "..")?;
        let requested = format!("{}/{}", DEAD_EDIT_DIR, name);
        let identity = self.euid_of(who).cloned()?;
        let master = self.master();
        let scope = self.assume_euid(master, identity)?;
        let access = scope.validate_write_for(master, &requested, "write_file");
        access.resolve(&requested).map(str::to_string)
    }
}
