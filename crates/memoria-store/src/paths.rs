//! Relative path layout inside a journal data directory.
//!
//! ```text
//! master.json                     keyring
//! entries/<uuid>.json             one record per entry
//! attachments/<uuid>/<uuid>.bin   plain attachment blob
//! attachments/<uuid>/<uuid>.enc   sealed attachment blob (MEMENV01)
//! rekey/...                       staging during a password change
//! rekey.commit                    re-key commit marker
//! ```

use uuid::Uuid;

/// Keyring file holding salt, KDF descriptor and verifier.
pub const KEYRING: &str = "master.json";

/// Directory containing all entry records.
pub const ENTRIES_DIR: &str = "entries";

/// Directory containing per-entry attachment directories.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Staging root for an in-progress re-key.
pub const REKEY_DIR: &str = "rekey";

/// Present only between a completed re-key stage and its roll-forward.
pub const REKEY_MARKER: &str = "rekey.commit";

const RECORD_EXT: &str = ".json";
const PLAIN_BLOB_EXT: &str = ".bin";
const SEALED_BLOB_EXT: &str = ".enc";

/// Path to an entry record.
pub fn entry_record(id: &Uuid) -> String {
    format!("{ENTRIES_DIR}/{id}{RECORD_EXT}")
}

/// Directory holding an entry's attachment blobs.
pub fn attachment_dir(entry_id: &Uuid) -> String {
    format!("{ATTACHMENTS_DIR}/{entry_id}")
}

/// Path to one attachment blob. Sealed and plain blobs use distinct names so
/// toggling encryption never overwrites the blob the committed record uses.
pub fn attachment_blob(entry_id: &Uuid, attachment_id: &Uuid, sealed: bool) -> String {
    let ext = if sealed { SEALED_BLOB_EXT } else { PLAIN_BLOB_EXT };
    format!("{}/{attachment_id}{ext}", attachment_dir(entry_id))
}

/// Staging location for `path` during a re-key.
pub fn staged(path: &str) -> String {
    format!("{REKEY_DIR}/{path}")
}

/// Parse an entry id from a record file name (`<uuid>.json`).
pub fn parse_record_name(file_name: &str) -> Option<Uuid> {
    file_name
        .strip_suffix(RECORD_EXT)
        .and_then(|stem| Uuid::parse_str(stem).ok())
}

/// Parse a blob file name into its attachment id and sealed flag.
pub fn parse_blob_name(file_name: &str) -> Option<(Uuid, bool)> {
    let (stem, sealed) = if let Some(stem) = file_name.strip_suffix(SEALED_BLOB_EXT) {
        (stem, true)
    } else {
        (file_name.strip_suffix(PLAIN_BLOB_EXT)?, false)
    };
    Uuid::parse_str(stem).ok().map(|id| (id, sealed))
}
