use std::path::PathBuf;
use tfx_catalog::PackageRecord;

/// Extension of every generated archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// File name of the archive (and of its quarantine marker) for a record:
/// `<filename>_<language>.zip`.
///
/// The same relative name is used in both the archives folder and the
/// quarantine folder. It is not validated here; the storage backends reject
/// names that would escape their folder.
pub fn artifact_name(record: &PackageRecord) -> PathBuf {
    PathBuf::from(format!("{}_{}.{ARCHIVE_EXTENSION}", record.filename, record.language))
}
