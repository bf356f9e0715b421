//! Directions provider client.
//!
//! Wraps the external "distance between two coordinates" capability
//! behind the [`DirectionsProvider`] trait so the pipeline can be driven
//! by a scripted provider in tests. The concrete implementation targets
//! the Mapbox directions API with a blocking HTTP client, a per-request
//! timeout, and a bounded retry on transport failures.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result, RouteLookupError};
use crate::location::Location;
use crate::retry::RetryPolicy;

/// Travel profile requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TravelMode {
    #[default]
    Walking,
    Driving,
    Cycling,
}

impl TravelMode {
    /// Provider-specific profile segment for the request URL.
    fn profile(self) -> &'static str {
        match self {
            TravelMode::Walking => "mapbox.walking",
            TravelMode::Driving => "mapbox.driving",
            TravelMode::Cycling => "mapbox.cycling",
        }
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "walking" => Ok(TravelMode::Walking),
            "driving" => Ok(TravelMode::Driving),
            "cycling" => Ok(TravelMode::Cycling),
            other => Err(format!(
                "unknown travel mode '{other}' (expected walking, driving, or cycling)"
            )),
        }
    }
}

/// Distance and duration reported by the provider for one route.
///
/// Units follow the configured API: meters and seconds for Mapbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance: f64,
    pub duration: f64,
}

/// Capability consumed by the enrichment pipeline: given two
/// coordinates and a mode, return distance and duration or fail.
pub trait DirectionsProvider {
    fn route(
        &self,
        origin: &Location,
        destination: &Location,
        mode: TravelMode,
    ) -> std::result::Result<RouteSummary, RouteLookupError>;
}

/// Configuration for the Mapbox client. The access token is injected
/// explicitly; there is no ambient key lookup.
#[derive(Debug, Clone)]
pub struct MapboxConfig {
    pub access_token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl MapboxConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: "https://api.mapbox.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point the client at a different host, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Blocking Mapbox directions client with bounded retry.
#[derive(Debug)]
pub struct MapboxDirections {
    config: MapboxConfig,
    retry: RetryPolicy,
    client: Client,
}

impl MapboxDirections {
    pub fn new(config: MapboxConfig) -> Result<Self> {
        Self::with_retry(config, RetryPolicy::default())
    }

    pub fn with_retry(config: MapboxConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| RouteLookupError::Transport {
                attempts: 0,
                source,
            })?;
        Ok(Self {
            config,
            retry,
            client,
        })
    }

    fn request_url(&self, origin: &Location, destination: &Location, mode: TravelMode) -> String {
        format!(
            "{base}/v4/directions/{profile}/{o_lat},{o_lon};{d_lat},{d_lon}.json\
             ?alternatives=false&geometry=false&steps=false&access_token={token}",
            base = self.config.base_url,
            profile = mode.profile(),
            o_lat = origin.latitude(),
            o_lon = origin.longitude(),
            d_lat = destination.latitude(),
            d_lon = destination.longitude(),
            token = self.config.access_token,
        )
    }

    fn fetch_once(&self, url: &str) -> std::result::Result<RouteSummary, RouteLookupError> {
        let response =
            self.client
                .get(url)
                .send()
                .map_err(|source| RouteLookupError::Transport {
                    attempts: 1,
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteLookupError::Status { status });
        }

        let body: DirectionsResponse =
            response
                .json()
                .map_err(|err| RouteLookupError::Malformed {
                    message: err.to_string(),
                })?;

        summary_from_response(body)
    }
}

impl DirectionsProvider for MapboxDirections {
    fn route(
        &self,
        origin: &Location,
        destination: &Location,
        mode: TravelMode,
    ) -> std::result::Result<RouteSummary, RouteLookupError> {
        let url = self.request_url(origin, destination, mode);
        debug!(origin = %origin, destination = %destination, "directions lookup");

        self.retry
            .run(|| self.fetch_once(&url), RouteLookupError::is_transient)
            .map_err(|err| match err {
                // A transport error surviving the retry loop means the
                // whole budget was spent on it.
                RouteLookupError::Transport { source, .. } => RouteLookupError::Transport {
                    attempts: self.retry.max_attempts,
                    source,
                },
                other => other,
            })
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    distance: f64,
    duration: f64,
}

fn summary_from_response(
    body: DirectionsResponse,
) -> std::result::Result<RouteSummary, RouteLookupError> {
    let first = body.routes.into_iter().next().ok_or(RouteLookupError::NoRoutes)?;
    Ok(RouteSummary {
        distance: first.distance,
        duration: first.duration,
    })
}

/// Read a provider access token from a key file, trimming whitespace.
pub fn load_api_key(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::ApiKeyNotFound {
            path: path.to_path_buf(),
        });
    }
    let key = fs::read_to_string(path)?.trim().to_string();
    if key.is_empty() {
        return Err(Error::ApiKeyEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(key)
}
