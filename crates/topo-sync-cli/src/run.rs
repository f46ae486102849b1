//! Job wiring

use crate::Cli;
use anyhow::Context;
use std::sync::Arc;
use topo_sync_client::{
    build_http_client, ApiSession, AuthClient, ProxySetting, RemoteSink, TopologyClient,
};
use topo_sync_core::{
    acquire_token, load_export, AuthError, FileSink, LocalDirSource, RetryPolicy, SyncError,
    SyncPipeline, SyncReport, TopologySink,
};

/// Exit code when no bearer token could be obtained
pub const EXIT_AUTH_FAILURE: u8 = 1;

/// Exit code of every other fatal error
pub const EXIT_FATAL: u8 = 2;

/// Run the job once
///
/// A token is acquired up front so bad credentials fail before the export is
/// touched, and again once the export is loaded so the topology session starts
/// with a fresh one.
pub async fn run(cli: &Cli) -> anyhow::Result<SyncReport> {
    let config = Arc::new(cli.sync_config().context("invalid configuration")?);
    let proxy = cli.proxy().context("invalid proxy configuration")?;
    proxy.to_proxy().context("invalid proxy configuration")?;
    let http = build_http_client().context("failed to set up HTTP client")?;
    let auth = AuthClient::new(http.clone(), cli.auth_endpoint.clone(), cli.credentials());
    bearer_token(&auth).await?;

    let source = Arc::new(LocalDirSource::new(&cli.source_dir));
    if let ProxySetting::Via(url) = &proxy {
        tracing::info!(
            proxy = %url,
            source = %cli.source_dir.display(),
            "Proxy applies to object storage only, the local source reads without it"
        );
    }
    let export = load_export(source.as_ref(), &config).await?;

    let session = Arc::new(
        ApiSession::new(cli.endpoints(), cli.job_name.clone(), bearer_token(&auth).await?)
            .with_tenant_id(cli.tenant_id.clone()),
    );
    let topology = Arc::new(TopologyClient::new(http.clone(), Arc::clone(&session)));

    let sink: Arc<dyn TopologySink> = if cli.create_file {
        tracing::info!(path = %cli.output_file.display(), "Writing output file instead of calling the topology API");
        let sink = FileSink::create(&cli.output_file)
            .await
            .map_err(SyncError::Sink)
            .context("cannot prepare output file")?;
        Arc::new(sink)
    } else {
        Arc::new(RemoteSink::new(http, session))
    };

    let report = SyncPipeline::new(config, source, topology, sink)
        .sync(export)
        .await?;
    Ok(report)
}

async fn bearer_token(auth: &AuthClient) -> anyhow::Result<String> {
    let token = acquire_token(auth, RetryPolicy::default())
        .await
        .map_err(SyncError::Auth)
        .context("cannot continue without a bearer token")?;
    Ok(token)
}

/// Process exit code for a failed run
#[must_use]
pub fn exit_code(error: &anyhow::Error) -> u8 {
    let auth = error
        .downcast_ref::<SyncError>()
        .is_some_and(SyncError::is_fatal_auth)
        || error.downcast_ref::<AuthError>().is_some();
    if auth {
        EXIT_AUTH_FAILURE
    } else {
        EXIT_FATAL
    }
}
