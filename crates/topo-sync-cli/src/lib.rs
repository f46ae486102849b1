//! # topo-sync
//!
//! Batch job syncing one change-management export into the topology graph.
//!
//! ## Configuration
//!
//! Every flag is backed by an environment variable so the job can run from a
//! scheduler with no arguments:
//!
//! - `APP_SOURCE_DIR` - object storage root holding the export
//! - `APP_SEPERATOR`, `APP_APIGW_INDICATOR`, `APP_STBS_INDICATOR` - service text handling
//! - `APP_CHG_DATA_*_ATTR` - names of the change attributes the job reads
//! - `APP_CHG_PROPS_TO_COPY` - attributes to keep (`*` for all)
//! - `APP_CHG_TYPES_OF_INTEREST` - statuses to sync
//! - `APP_CREATE_FILE`, `APP_OUTPUT_FILE` - write `changes.data` instead of calling the API
//! - `APP_DEV_MODE` - debug logging with raw payload dumps
//! - `APP_USE_PROXY`, `APP_PROXY_URL` - object-storage proxy
//! - `AIOPS_*` - auth, topology, resources and references endpoints, credentials, job name
//!
//! ## Exit codes
//!
//! - `0` - run completed, including runs that skipped records
//! - `1` - no bearer token could be obtained
//! - `2` - any other fatal error

pub mod run;

use clap::{ArgAction, Parser, ValueEnum};
use std::convert::Infallible;
use std::path::PathBuf;
use topo_sync_client::{Credentials, Endpoints, ProxySetting, DEFAULT_TENANT_ID};
use topo_sync_core::{
    AttributeNames, AttributeSelection, BroadcastIndicators, ConfigError, MissingAttributePolicy,
    SyncConfig, DEFAULT_OUTPUT_FILE,
};

pub use run::{exit_code, run, EXIT_AUTH_FAILURE, EXIT_FATAL};

/// Sync a change-management export into the topology graph.
#[derive(Debug, Parser)]
#[command(name = "topo-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory standing in for the object storage root.
    #[arg(long, env = "APP_SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Separator used in the affected-services text.
    #[arg(long, env = "APP_SEPERATOR", default_value = "|")]
    pub separator: String,

    /// Service name marking a change to every API gateway front end.
    #[arg(long, env = "APP_APIGW_INDICATOR")]
    pub front_end_indicator: String,

    /// Service name marking a change to every set-top box.
    #[arg(long, env = "APP_STBS_INDICATOR")]
    pub set_top_box_indicator: String,

    /// Attribute holding the implementation start time.
    #[arg(long, env = "APP_CHG_DATA_IMPL_START_ATTR")]
    pub start_time_attr: String,

    /// Attribute holding the affected services.
    #[arg(long, env = "APP_CHG_DATA_AFF_SRVS_ATTR")]
    pub services_attr: String,

    /// Attribute holding the affected organizations.
    #[arg(long, env = "APP_CHG_DATA_AFF_OPCO_ATTR")]
    pub organizations_attr: String,

    /// Attribute holding the change title.
    #[arg(long, env = "APP_CHG_DATA_TITLE_ATTR")]
    pub title_attr: String,

    /// Attribute holding the change status.
    #[arg(long, env = "APP_CHG_DATA_STATUS_ATTR")]
    pub status_attr: String,

    /// Comma-separated attributes to keep, `*` for all.
    #[arg(long, env = "APP_CHG_PROPS_TO_COPY", default_value = "*")]
    pub props_to_copy: String,

    /// Comma-separated statuses to sync.
    #[arg(long, env = "APP_CHG_TYPES_OF_INTEREST")]
    pub statuses: String,

    /// What to do when a kept attribute is missing: null, skip or fail.
    #[arg(long, env = "APP_ON_MISSING_ATTR", default_value = "null")]
    pub on_missing_attr: MissingAttributePolicy,

    /// Write emissions to a local file instead of the topology API.
    #[arg(
        long,
        env = "APP_CREATE_FILE",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub create_file: bool,

    /// Output artifact in file mode.
    #[arg(long, env = "APP_OUTPUT_FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Debug logging with raw payload dumps.
    #[arg(
        long,
        env = "APP_DEV_MODE",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub dev_mode: bool,

    /// Route object-storage requests through a proxy.
    #[arg(
        long,
        env = "APP_USE_PROXY",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub use_proxy: bool,

    /// Proxy URL.
    #[arg(long, env = "APP_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Auth endpoint.
    #[arg(long, env = "AIOPS_AUTH_EP")]
    pub auth_endpoint: String,

    /// Auth user name.
    #[arg(long, env = "AIOPS_AUTH_EP_USER")]
    pub auth_user: String,

    /// Auth API key.
    #[arg(long, env = "AIOPS_AUTH_EP_PW", hide_env_values = true)]
    pub auth_password: String,

    /// Observer job name sent with every write.
    #[arg(long, env = "AIOPS_OBS_JOBNAME")]
    pub job_name: String,

    /// Topology query endpoint.
    #[arg(long, env = "AIOPS_TOPO_EP")]
    pub topology_endpoint: String,

    /// Resources endpoint receiving change vertices.
    #[arg(long, env = "AIOPS_RESOURCES_EP")]
    pub resources_endpoint: String,

    /// References endpoint receiving relations.
    #[arg(long, env = "AIOPS_REFERENCES_EP")]
    pub references_endpoint: String,

    /// Tenant of the topology service.
    #[arg(long, env = "AIOPS_TENANT_ID", default_value = DEFAULT_TENANT_ID)]
    pub tenant_id: String,

    /// Log output format.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Boolean flag: only `true` and `1` switch it on.
fn parse_flag(raw: &str) -> Result<bool, Infallible> {
    Ok(matches!(raw.trim(), "true" | "1"))
}

impl Cli {
    /// Validated pipeline configuration.
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        let config = SyncConfig::new(
            self.separator.clone(),
            BroadcastIndicators {
                front_end: self.front_end_indicator.clone(),
                set_top_box: self.set_top_box_indicator.clone(),
            },
            AttributeNames {
                start_time: self.start_time_attr.clone(),
                affected_services: self.services_attr.clone(),
                affected_organizations: self.organizations_attr.clone(),
                title: self.title_attr.clone(),
                status: self.status_attr.clone(),
            },
        )
        .with_selection(AttributeSelection::parse(&self.props_to_copy))
        .with_statuses(&self.statuses)
        .with_missing_attribute_policy(self.on_missing_attr);
        config.validate()?;
        Ok(config)
    }

    /// Service endpoints.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            auth: self.auth_endpoint.clone(),
            topology: self.topology_endpoint.clone(),
            resources: self.resources_endpoint.clone(),
            references: self.references_endpoint.clone(),
        }
    }

    /// Auth credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.auth_user.clone(),
            api_key: self.auth_password.clone(),
        }
    }

    /// Proxy setting for object-storage traffic.
    pub fn proxy(&self) -> Result<ProxySetting, topo_sync_client::ClientError> {
        ProxySetting::from_flag(self.use_proxy, self.proxy_url.as_deref())
    }

    /// Log filter used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_filter(&self) -> &'static str {
        if self.dev_mode {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
pub(crate) fn test_args() -> Vec<&'static str> {
    vec![
        "topo-sync",
        "--source-dir",
        "/mnt/changes",
        "--front-end-indicator",
        "APIGW FE",
        "--set-top-box-indicator",
        "STBs",
        "--start-time-attr",
        "Impl. Start (UTC)",
        "--services-attr",
        "Affected Services",
        "--organizations-attr",
        "Affected OpCo's",
        "--title-attr",
        "Change Title",
        "--status-attr",
        "Change Status",
        "--statuses",
        "Scheduled, Implemented",
        "--auth-endpoint",
        "https://aiops.test/auth",
        "--auth-user",
        "sync-job",
        "--auth-password",
        "s3cret",
        "--job-name",
        "change-sync",
        "--topology-endpoint",
        "https://aiops.test/topology/resources",
        "--resources-endpoint",
        "https://aiops.test/topology/observer/resources",
        "--references-endpoint",
        "https://aiops.test/topology/observer/references",
    ]
}
