//! The fixed enumerations of guarded operations.

use serde::{Deserialize, Serialize};

/// Whether a filesystem primitive reads, writes, or may do either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AccessMode {
    /// Consults `validate_read`
    Read,
    /// Consults `validate_write`
    Write,
    /// Consults whichever validator matches the request
    Either,
}

/// Every filesystem primitive the host guards.
///
/// Names parse from the strings the host passes (`"read_file"`,
/// `"save_object"`, ...). Anything outside this set is unguardable and must be
/// refused by the validators.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use warden_core::{AccessMode, FileOp};
///
/// let op = FileOp::from_str("save_object").unwrap();
/// assert_eq!(op.mode(), AccessMode::Write);
/// assert!(FileOp::from_str("format_disk").is_err());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileOp {
    /// Directory listing
    GetDir,
    /// File size query
    FileSize,
    /// Byte-range read
    ReadBytes,
    /// Line-range read
    ReadFile,
    /// Print a file to the caller
    PrintFile,
    /// Restore object state
    RestoreObject,
    /// Read the end of a file
    Tail,
    /// Editor open, read or write depending on the request
    EdStart,
    /// Byte-range write
    WriteBytes,
    /// Append or replace lines
    WriteFile,
    /// Save object state
    SaveObject,
    /// Rename, checked once per endpoint
    DoRename,
    /// Directory create
    Mkdir,
    /// Directory remove
    Rmdir,
    /// File remove
    RemoveFile,
    /// Reindent a source file in place
    Cindent,
}

impl FileOp {
    /// The validator(s) this primitive is guarded by.
    pub fn mode(self) -> AccessMode {
        match self {
            FileOp::GetDir
            | FileOp::FileSize
            | FileOp::ReadBytes
            | FileOp::ReadFile
            | FileOp::PrintFile
            | FileOp::RestoreObject
            | FileOp::Tail => AccessMode::Read,
            FileOp::EdStart => AccessMode::Either,
            FileOp::WriteBytes
            | FileOp::WriteFile
            | FileOp::SaveObject
            | FileOp::DoRename
            | FileOp::Mkdir
            | FileOp::Rmdir
            | FileOp::RemoveFile
            | FileOp::Cindent => AccessMode::Write,
        }
    }

    /// True when `validate_read` may authorize this primitive.
    pub fn is_read(self) -> bool {
        matches!(self.mode(), AccessMode::Read | AccessMode::Either)
    }

    /// True when `validate_write` may authorize this primitive.
    pub fn is_write(self) -> bool {
        matches!(self.mode(), AccessMode::Write | AccessMode::Either)
    }
}

/// Every privileged operation routed through the privilege mediator.
///
/// The set is exhaustive; the policy per kind lives in the mediator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrivilegedOp {
    /// Bind a closure to unit `arg`
    BindLambda,
    /// Enumerate every scheduled deferred call with its captured arguments
    CallOutInfo,
    /// Reach a built-in shadowed by a nomask override
    #[strum(to_string = "nomask simul_efun", serialize = "nomask_simul_efun")]
    #[serde(rename = "nomask simul_efun", alias = "nomask_simul_efun")]
    NomaskSimulEfun,
    /// Rename live unit `arg` to `arg2`
    RenameObject,
    /// Send a raw datagram to host `arg`
    #[strum(to_string = "send_imp", serialize = "send_datagram")]
    #[serde(alias = "send_datagram")]
    SendImp,
    /// Set the compiler's auto-include string
    SetAutoIncludeString,
    /// Read the extra bookkeeping of identity `arg`
    GetExtraWizinfo,
    /// Write the extra bookkeeping of identity `arg`
    SetExtraWizinfo,
    /// Resize the extra bookkeeping to `arg`
    SetExtraWizinfoSize,
    /// Force the ambient current unit to `arg`
    SetThisObject,
    /// Add an action on behalf of a shadow of unit `arg`
    ShadowAddAction,
    /// Dump the whole per-identity bookkeeping table
    WizlistInfo,
}

impl PrivilegedOp {
    /// Operations whose results expose other identities' live closures,
    /// arrays or mappings. Reading them is as good as writing them.
    pub fn exposes_captured_state(self) -> bool {
        matches!(
            self,
            PrivilegedOp::CallOutInfo | PrivilegedOp::WizlistInfo | PrivilegedOp::GetExtraWizinfo
        )
    }
}
