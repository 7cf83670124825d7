//! Artifact locations that are written without going through the tracking
//! service.

use std::path::Path;

use object_store::{
    ObjectStore, PutPayload, gcp::GoogleCloudStorageBuilder, path::Path as ObjectPath,
};

/// Root of a run's artifacts, as reported by the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactRoot<'a> {
    /// Served by the tracking service's artifact proxy; holds the path below it.
    Proxied(&'a str),
    /// A Google Cloud Storage bucket and the key prefix inside it.
    Gcs { bucket: &'a str, prefix: &'a str },
}

impl<'a> ArtifactRoot<'a> {
    /// Classifies an artifact URI.
    ///
    /// `mlflow-artifacts:/1/abc/artifacts` and
    /// `mlflow-artifacts://host:5000/1/abc/artifacts` are proxied below
    /// `1/abc/artifacts`; `gs://bucket/1/abc/artifacts` is written straight
    /// to the bucket. Anything else is `None`.
    pub(crate) fn parse(uri: &'a str) -> Option<Self> {
        if let Some(rest) = uri.strip_prefix("mlflow-artifacts:") {
            let rest = match rest.strip_prefix("//") {
                Some(with_host) => with_host.split_once('/').map_or("", |(_, path)| path),
                None => rest,
            };
            return Some(ArtifactRoot::Proxied(rest.trim_matches('/')));
        }

        let rest = uri.strip_prefix("gs://")?;
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return None;
        }
        Some(ArtifactRoot::Gcs {
            bucket,
            prefix: prefix.trim_matches('/'),
        })
    }
}

/// Joins the non-empty segments with `/`.
pub(crate) fn join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Opens a bucket.
///
/// Settings are taken from the `GOOGLE_*` environment variables; an explicit
/// `credentials` file overrides `GOOGLE_APPLICATION_CREDENTIALS`. Without
/// either, the platform's default credentials are used.
pub(crate) fn gcs(bucket: &str, credentials: Option<&Path>) -> object_store::Result<impl ObjectStore> {
    let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
    if let Some(path) = credentials {
        builder = builder.with_application_credentials(path.to_string_lossy());
    }
    builder.build()
}

/// Writes `contents` at `key`, replacing any previous object.
pub(crate) async fn put(
    store: &dyn ObjectStore,
    key: &str,
    contents: Vec<u8>,
) -> object_store::Result<()> {
    store
        .put(&ObjectPath::from(key), PutPayload::from(contents))
        .await?;
    Ok(())
}
