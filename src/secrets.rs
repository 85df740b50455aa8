//! Backend credential lookup
//!
//! The bridge workloads authenticate to the object-storage backend with an
//! access-key pair kept in a Kubernetes Secret. The Secret must carry
//! `s3_access_key` and `s3_secret_key` entries; anything less is a
//! precondition failure surfaced before any composition starts.

use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use tracing::debug;

use crate::{Error, Result};

/// Secret key holding the S3 access key
const ACCESS_KEY_ENTRY: &str = "s3_access_key";

/// Secret key holding the S3 secret key
const SECRET_KEY_ENTRY: &str = "s3_secret_key";

/// S3 credential pair shared by all bridges of one deployment file
#[derive(Clone, Debug, PartialEq)]
pub struct BackendCredentials {
    /// S3 access key
    pub access_key: String,
    /// S3 secret key
    pub secret_key: String,
}

impl BackendCredentials {
    /// Extract the credential pair from a Secret
    ///
    /// Fails with a credential error when the Secret has no data, lacks
    /// either entry, or an entry is not valid UTF-8.
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let name = secret.metadata.name.as_deref().unwrap_or("<unnamed>");
        let data = secret
            .data
            .as_ref()
            .ok_or_else(|| Error::credential(format!("secret '{}' has no data", name)))?;

        let read = |entry: &str| -> Result<String> {
            let bytes = data.get(entry).ok_or_else(|| {
                Error::credential(format!("secret '{}' is missing '{}'", name, entry))
            })?;
            String::from_utf8(bytes.0.clone()).map_err(|_| {
                Error::credential(format!("secret '{}' entry '{}' is not UTF-8", name, entry))
            })
        };

        Ok(Self {
            access_key: read(ACCESS_KEY_ENTRY)?,
            secret_key: read(SECRET_KEY_ENTRY)?,
        })
    }
}

/// Fetch the backend credentials from a Secret in the given namespace
pub async fn fetch_backend_credentials(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<BackendCredentials> {
    debug!(secret = %name, namespace = %namespace, "Reading backend credentials");
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get(name).await?;
    BackendCredentials::from_secret(&secret)
}
