// Verifier: post-start readiness check against the running server

use std::time::Duration;
use tracing::{info, warn};

use crate::api::responses::HealthResponse;
use crate::config::Config;
use crate::core::errors::VerifyError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const HEALTH_PATH: &str = "/health";

/// Health check settings derived from configuration
#[derive(Debug, Clone)]
pub struct VerifySettings {
    pub path: String,
    pub timeout: Duration,
    pub attempts: u32,
    pub backoff: Duration,
}

impl VerifySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: HEALTH_PATH.to_string(),
            timeout: Duration::from_secs(config.verify_timeout_secs),
            attempts: config.verify_attempts.max(1),
            backoff: Duration::from_millis(100),
        }
    }
}

/// Request `GET {base_url}{path}` until it reports ready or attempts run out
///
/// Transport errors are retried; a response other than 200 with
/// `status == "ok"` fails immediately.
pub async fn verify_health(base_url: &str, settings: VerifySettings) -> Result<(), VerifyError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), settings.path);
    let client = reqwest::Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(settings.timeout.min(CONNECT_TIMEOUT)) // Fail fast on connection
        .build()
        .map_err(|source| VerifyError::Unreachable {
            url: url.clone(),
            attempts: 0,
            source,
        })?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    return Err(VerifyError::Unhealthy {
                        url,
                        status: status.as_u16(),
                    });
                }

                let health: HealthResponse =
                    response
                        .json()
                        .await
                        .map_err(|source| VerifyError::Unreachable {
                            url: url.clone(),
                            attempts: attempt,
                            source,
                        })?;

                if health.status != "ok" {
                    return Err(VerifyError::NotReady {
                        url,
                        reported: health.status,
                    });
                }

                info!(url = %url, attempt, "Health check succeeded");
                return Ok(());
            }
            Err(source) if attempt >= settings.attempts => {
                return Err(VerifyError::Unreachable {
                    url,
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                warn!(error = %e, url = %url, attempt, "Health check failed, retrying");
                tokio::time::sleep(settings.backoff * attempt).await;
            }
        }
    }
}
