use asn_lib::{Blob, Sum};
use std::path::Path;

/// hook called once a blob is stored
///
/// forwarding the blob to the other sessions interested in it is not
/// done by the server yet: the default hook only logs.
pub trait Notifier {
    /// `name` is the time ordered name of the blob (see
    /// [`Blob::file_name`]), `path` where it is stored
    fn ingested(&self, session: &str, blob: &Blob, sum: &Sum, name: &str, path: &Path);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn ingested(&self, session: &str, blob: &Blob, sum: &Sum, name: &str, path: &Path) {
        tracing::debug!(
            session,
            blob = %blob.name,
            time = %blob.time,
            sum = %sum,
            name,
            path = %path.display(),
            "blob ingested"
        );
    }
}
