mod classify;
mod signer;
mod types;
mod walk;

pub use classify::{classify, FileKind, INSTALLER_EXTENSIONS, MIN_BINARY_LEN, SCRIPT_EXTENSIONS};
pub use signer::{
    default_resolver, sha256_file, HashOnlyResolver, PowerShellResolver, SignatureResolver,
    SignerInfo,
};
pub use types::{
    DirectoryHit, DiscoveredFile, Safety, SafetyMode, ScanReport, ScanTarget, SkipRecord,
    WalkItem, WritableDirectorySet,
};
pub use walk::{CancelToken, DirectoryWalker};
