//! Environment variables handed to the worker process.
//!
//! Job identity, target, and credentials travel through the environment
//! rather than argv so secrets never show up in process listings.

use crate::error::CoreError;
use crate::session_codes::{join_codes, split_codes};
use crate::types::DbId;

pub const ENV_JOB_ID: &str = "JOB_ID";
pub const ENV_SEASON: &str = "SEASON";
pub const ENV_ROUND: &str = "ROUND";
pub const ENV_SESSION_CODES: &str = "SESSION_CODES";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HTTP_PROXY: &str = "HTTP_PROXY";
pub const ENV_HTTPS_PROXY: &str = "HTTPS_PROXY";
pub const ENV_NO_PROXY: &str = "NO_PROXY";

/// Optional proxy settings forwarded to the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub no_proxy: Option<String>,
}

/// Everything the worker needs to know about its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerJobEnv {
    pub job_id: DbId,
    pub season: i32,
    pub round: i32,
    pub session_codes: Vec<String>,
    pub database_url: String,
    pub proxy: ProxySettings,
}

impl WorkerJobEnv {
    /// Key/value pairs to set on the child process.
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (ENV_JOB_ID.to_string(), self.job_id.to_string()),
            (ENV_SEASON.to_string(), self.season.to_string()),
            (ENV_ROUND.to_string(), self.round.to_string()),
            (ENV_SESSION_CODES.to_string(), join_codes(&self.session_codes)),
            (ENV_DATABASE_URL.to_string(), self.database_url.clone()),
        ];

        let proxies = [
            (ENV_HTTP_PROXY, &self.proxy.http),
            (ENV_HTTPS_PROXY, &self.proxy.https),
            (ENV_NO_PROXY, &self.proxy.no_proxy),
        ];
        for (key, value) in proxies {
            if let Some(value) = value {
                vars.push((key.to_string(), value.clone()));
            }
        }
        vars
    }

    /// Read the job environment through `lookup` (the worker side).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CoreError::Validation(format!("{key} must be set")))
        };
        let parse_int = |key: &str| -> Result<i64, CoreError> {
            required(key)?.trim().parse::<i64>().map_err(|e| {
                CoreError::Validation(format!("{key} must be an integer: {e}"))
            })
        };

        let job_id = parse_int(ENV_JOB_ID)?;
        let season = i32::try_from(parse_int(ENV_SEASON)?)
            .map_err(|_| CoreError::Validation(format!("{ENV_SEASON} out of range")))?;
        let round = i32::try_from(parse_int(ENV_ROUND)?)
            .map_err(|_| CoreError::Validation(format!("{ENV_ROUND} out of range")))?;
        let session_codes = split_codes(&required(ENV_SESSION_CODES)?);
        let database_url = required(ENV_DATABASE_URL)?;

        Ok(Self {
            job_id,
            season,
            round,
            session_codes,
            database_url,
            proxy: ProxySettings {
                http: lookup(ENV_HTTP_PROXY),
                https: lookup(ENV_HTTPS_PROXY),
                no_proxy: lookup(ENV_NO_PROXY),
            },
        })
    }

    /// Read the job environment from the current process.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
