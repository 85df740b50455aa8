//! Bridge configuration records
//!
//! Two layers of configuration live here:
//!
//! - [`BridgeConfig`] - the full input for composing one bridge instance.
//!   Immutable for the duration of a composition; the composer never writes
//!   back into it.
//! - [`BridgeFile`] - the YAML deployment file consumed by the binary: one
//!   shared backend endpoint and credential secret, plus the list of
//!   [`BackendEntry`] records to instantiate. The binary expands each entry
//!   into a `BridgeConfig` via [`BridgeConfig::from_entry`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::secrets::BackendCredentials;
use crate::{Error, Result};

/// Base label applied to every bridge resource; each instance adds a
/// `module: <backend name>` label on top.
pub const APP_LABEL: &str = "s3bridge";

/// Backend connection parameters, passed through to the bridge container as
/// environment configuration. Opaque to the composer: no URL or bucket-name
/// validation happens here beyond non-emptiness.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BackendSpec {
    /// S3-compatible endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// S3 access key
    pub access_key: String,
    /// S3 secret key
    pub secret_key: String,
}

/// External exposure target. Presence triggers the IngressRoute (and, with a
/// path, the Middlewares); absence means the bridge is cluster-internal only.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExternalUrl {
    /// External hostname the route matches on
    pub host: String,
    /// Optional path prefix, stripped before forwarding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Full configuration for one bridge instance
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Bridge instance name, unique within the namespace
    pub name: String,
    /// Target namespace
    pub namespace: String,
    /// Labels applied to every resource and used as the workload selector.
    /// The Deployment template and the Service selector must carry the same
    /// set, or routing breaks silently; the composer enforces this.
    pub labels: BTreeMap<String, String>,
    /// Backend connection parameters
    pub backend: BackendSpec,
    /// External exposure target, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<ExternalUrl>,
    /// Allowed CORS origins; only consulted when `external_url.path` is set.
    /// Empty means wildcard-all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

impl BridgeConfig {
    /// Validate required fields before any resource object is constructed
    ///
    /// Fails fast on a missing `name`, `namespace`, `backend.endpoint`, or
    /// `backend.bucket`. Credentials are not checked here - they are a
    /// precondition handled by the secret lookup.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::configuration("bridge name must not be empty"));
        }
        if self.namespace.is_empty() {
            return Err(Error::configuration("bridge namespace must not be empty"));
        }
        if self.backend.endpoint.is_empty() {
            return Err(Error::configuration("backend.endpoint must not be empty"));
        }
        if self.backend.bucket.is_empty() {
            return Err(Error::configuration("backend.bucket must not be empty"));
        }
        Ok(())
    }

    /// Expand a deployment-file entry into a full bridge configuration
    ///
    /// The instance is named `s3bridge-<entry name>` and labeled with the
    /// shared app label plus `module: <entry name>`, so every instance gets a
    /// distinct selector while staying enumerable under the app label.
    pub fn from_entry(
        file: &BridgeFile,
        entry: &BackendEntry,
        credentials: &BackendCredentials,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), APP_LABEL.to_string());
        labels.insert("module".to_string(), entry.name.clone());

        let external_url = entry.external_hostname.as_ref().map(|host| ExternalUrl {
            host: host.clone(),
            path: entry.path.clone(),
        });

        Self {
            name: format!("s3bridge-{}", entry.name),
            namespace: file.namespace.clone(),
            labels,
            backend: BackendSpec {
                endpoint: file.endpoint.clone(),
                bucket: entry.bucket.clone(),
                access_key: credentials.access_key.clone(),
                secret_key: credentials.secret_key.clone(),
            },
            external_url,
            allowed_origins: entry.allowed_origins.clone(),
        }
    }
}

// =============================================================================
// Deployment File
// =============================================================================

/// One backend entry from the deployment file
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendEntry {
    /// Short backend name; instance name and module label derive from it
    pub name: String,
    /// Bucket to expose
    pub bucket: String,
    /// External hostname to publish on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_hostname: Option<String>,
    /// Path prefix under the external hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Allowed CORS origins for this backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

/// The YAML deployment file consumed by the binary
///
/// All backends share one endpoint and one credential secret; each entry
/// becomes an independent bridge instance.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFile {
    /// Namespace every bridge is created in
    pub namespace: String,
    /// Shared S3-compatible endpoint URL
    pub endpoint: String,
    /// Name of the Secret holding `s3_access_key` / `s3_secret_key`
    pub credentials_secret: String,
    /// Backends to instantiate, one bridge each
    pub backends: Vec<BackendEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> BridgeConfig {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "s3bridge".to_string());
        BridgeConfig {
            name: "s3bridge-media".to_string(),
            namespace: "s3bridge-app".to_string(),
            labels,
            backend: BackendSpec {
                endpoint: "http://ceph:8100".to_string(),
                bucket: "media".to_string(),
                access_key: "A".to_string(),
                secret_key: "B".to_string(),
            },
            external_url: None,
            allowed_origins: vec![],
        }
    }

    // =========================================================================
    // Story: Validation Fails Fast
    // =========================================================================

    #[test]
    fn story_valid_config_passes() {
        assert!(make_config().validate().is_ok());
    }

    #[test]
    fn story_missing_name_is_rejected() {
        let mut config = make_config();
        config.name = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn story_missing_namespace_is_rejected() {
        let mut config = make_config();
        config.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn story_missing_backend_fields_are_rejected() {
        let mut config = make_config();
        config.backend.endpoint = String::new();
        assert!(config.validate().is_err());

        let mut config = make_config();
        config.backend.bucket = String::new();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Story: Deployment File Expansion
    // =========================================================================

    fn make_file() -> BridgeFile {
        BridgeFile {
            namespace: "s3bridge-app".to_string(),
            endpoint: "http://hsuper-ceph.hsu-hh.de:8100".to_string(),
            credentials_secret: "s3bridge-ceph-credentials".to_string(),
            backends: vec![BackendEntry {
                name: "compdes".to_string(),
                bucket: "teaching-compdes-video".to_string(),
                external_hostname: Some("assets.kramer.science".to_string()),
                path: Some("/compdes/video".to_string()),
                allowed_origins: vec!["https://compdes.hsu-hh.info".to_string()],
            }],
        }
    }

    #[test]
    fn story_entry_expands_to_full_config() {
        let file = make_file();
        let credentials = BackendCredentials {
            access_key: "AKIA".to_string(),
            secret_key: "shh".to_string(),
        };

        let config = BridgeConfig::from_entry(&file, &file.backends[0], &credentials);

        assert_eq!(config.name, "s3bridge-compdes");
        assert_eq!(config.namespace, "s3bridge-app");
        assert_eq!(config.labels.get("app"), Some(&"s3bridge".to_string()));
        assert_eq!(config.labels.get("module"), Some(&"compdes".to_string()));
        assert_eq!(config.backend.bucket, "teaching-compdes-video");
        assert_eq!(config.backend.access_key, "AKIA");

        let external = config.external_url.unwrap();
        assert_eq!(external.host, "assets.kramer.science");
        assert_eq!(external.path.as_deref(), Some("/compdes/video"));
    }

    #[test]
    fn story_entry_without_hostname_stays_internal() {
        let mut file = make_file();
        file.backends[0].external_hostname = None;
        let credentials = BackendCredentials {
            access_key: "A".to_string(),
            secret_key: "B".to_string(),
        };

        let config = BridgeConfig::from_entry(&file, &file.backends[0], &credentials);
        assert!(config.external_url.is_none());
    }

    #[test]
    fn story_deployment_file_parses_from_yaml() {
        let yaml = r#"
namespace: s3bridge-app
endpoint: http://ceph:8100
credentialsSecret: s3bridge-ceph-credentials
backends:
  - name: compdes
    bucket: teaching-compdes-video
    externalHostname: assets.kramer.science
    path: /compdes/video
    allowedOrigins:
      - https://compdes.hsu-hh.info
  - name: internal
    bucket: internal-data
"#;
        let file: BridgeFile = serde_yaml::from_str(yaml).expect("should parse");
        assert_eq!(file.backends.len(), 2);
        assert_eq!(file.backends[0].allowed_origins.len(), 1);
        assert!(file.backends[1].external_hostname.is_none());
        assert!(file.backends[1].allowed_origins.is_empty());
    }
}
