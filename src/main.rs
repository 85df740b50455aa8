//! S3 Bridge operator - exposes S3-compatible buckets as in-cluster HTTP services

use clap::Parser;
use futures::future::join_all;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use s3bridge_operator::composer::{BridgeComposer, BridgeResourceSet};
use s3bridge_operator::config::{BridgeConfig, BridgeFile};
use s3bridge_operator::provision::{provision_bridge, BridgeResult, KubeProvisioner};
use s3bridge_operator::secrets::{fetch_backend_credentials, BackendCredentials};
use s3bridge_operator::FIELD_MANAGER;

/// Declare S3 bridges from a deployment file
#[derive(Parser, Debug)]
#[command(name = "s3bridge-operator", version, about, long_about = None)]
struct Cli {
    /// Path to the YAML deployment file
    ///
    /// Lists the shared backend endpoint, the credential secret, and the
    /// backends to expose; each backend becomes one bridge instance.
    #[arg(short = 'f', long = "config")]
    config_file: std::path::PathBuf,

    /// Override the namespace from the deployment file
    #[arg(long)]
    namespace: Option<String>,

    /// Print the composed manifests as YAML instead of applying them
    ///
    /// Needs no cluster; credential values are replaced with placeholders so
    /// no secret material ends up on stdout.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let content = tokio::fs::read_to_string(&cli.config_file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", cli.config_file, e))?;
    let mut file: BridgeFile = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse deployment file: {}", e))?;

    if let Some(namespace) = cli.namespace {
        file.namespace = namespace;
    }

    if cli.dry_run {
        return dry_run(&file);
    }

    run(&file).await
}

/// Compose every backend and print the manifests without touching a cluster
fn dry_run(file: &BridgeFile) -> anyhow::Result<()> {
    let credentials = BackendCredentials {
        access_key: format!("<{}:s3_access_key>", file.credentials_secret),
        secret_key: format!("<{}:s3_secret_key>", file.credentials_secret),
    };

    let mut failures = 0usize;
    for entry in &file.backends {
        let config = BridgeConfig::from_entry(file, entry, &credentials);
        match BridgeComposer::compose(&config) {
            Ok(set) => print_manifests(&set)?,
            Err(e) => {
                failures += 1;
                error!(backend = %entry.name, error = %e, "Composition failed");
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{} of {} bridges failed to compose", failures, file.backends.len());
    }
    Ok(())
}

fn print_manifests(set: &BridgeResourceSet) -> anyhow::Result<()> {
    println!("---\n{}", serde_yaml::to_string(&set.deployment)?);
    println!("---\n{}", serde_yaml::to_string(&set.service)?);
    for middleware in &set.middlewares {
        println!("---\n{}", serde_yaml::to_string(middleware)?);
    }
    if let Some(route) = &set.route {
        println!("---\n{}", serde_yaml::to_string(route)?);
    }
    Ok(())
}

/// Provision every backend against the cluster
///
/// Each bridge is independent: one failing is reported as a distinct failure
/// and does not abort the others. The process exits non-zero if any failed.
async fn run(file: &BridgeFile) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    ensure_namespace(&client, &file.namespace).await?;

    // Credentials are a precondition: one lookup, shared by all bridges
    let credentials =
        fetch_backend_credentials(&client, &file.namespace, &file.credentials_secret).await?;

    let provisioner = KubeProvisioner::new(client);

    // Composition is independent per backend; provision them concurrently
    let bridges = file.backends.iter().map(|entry| {
        let config = BridgeConfig::from_entry(file, entry, &credentials);
        let provisioner = &provisioner;
        async move {
            let result = match BridgeComposer::compose(&config) {
                Ok(set) => provision_bridge(provisioner, &set).await,
                Err(e) => Err(e),
            };
            (entry.name.clone(), result)
        }
    });

    let mut failures = 0usize;
    for (name, result) in join_all(bridges).await {
        match result {
            Ok(bridge) => report_bridge(&name, &bridge),
            Err(e) => {
                failures += 1;
                error!(backend = %name, error = %e, "Bridge provisioning failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} bridges failed", failures, file.backends.len());
    }
    Ok(())
}

fn report_bridge(name: &str, bridge: &BridgeResult) {
    info!(
        backend = %name,
        address = %bridge.endpoint_address,
        workload = %bridge.workload,
        endpoint = %bridge.endpoint,
        route = bridge.route.as_deref().unwrap_or("-"),
        policies = bridge.policies.len(),
        "Bridge provisioned"
    );
}

/// Create the target namespace if it does not exist (server-side apply)
async fn ensure_namespace(client: &Client, name: &str) -> anyhow::Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns: Namespace = serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name },
    }))?;
    namespaces
        .patch(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&ns))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to ensure namespace '{}': {}", name, e))?;
    Ok(())
}
