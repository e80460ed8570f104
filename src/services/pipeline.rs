//! Query pipeline: location extraction, default fallback, weather fetch, projection.
//!
//! ```text
//! AwaitingQuery -> LocationResolved -> WeatherResolved
//!                                   \-> Failed
//! ```
//!
//! Extraction failures degrade silently to the default location. A fetch
//! failure is the only outcome the user sees as an error.

use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::services::location::LocationExtractor;
use crate::services::metrics::{project, CoreMetrics};
use crate::services::weatherapi::{WeatherPayload, WeatherSource};

/// Where the location used for a query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Extracted from the query by the model.
    Extracted,
    /// The configured fallback.
    Default,
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    WeatherResolved {
        location: String,
        source: LocationSource,
        metrics: CoreMetrics,
        payload: WeatherPayload,
    },
    Failed {
        location: String,
        source: LocationSource,
        /// The fetch error's description, shown verbatim.
        error: String,
    },
}

impl PipelineOutcome {
    pub fn location(&self) -> &str {
        match self {
            PipelineOutcome::WeatherResolved { location, .. }
            | PipelineOutcome::Failed { location, .. } => location,
        }
    }

    pub fn source(&self) -> LocationSource {
        match self {
            PipelineOutcome::WeatherResolved { source, .. }
            | PipelineOutcome::Failed { source, .. } => *source,
        }
    }
}

/// Runs one query through the extract, fetch, project sequence.
#[derive(Clone)]
pub struct WeatherPipeline {
    extractor: Arc<dyn LocationExtractor>,
    weather: Arc<dyn WeatherSource>,
    default_location: String,
}

impl WeatherPipeline {
    pub fn new(
        extractor: Arc<dyn LocationExtractor>,
        weather: Arc<dyn WeatherSource>,
        default_location: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            weather,
            default_location: default_location.into(),
        }
    }

    /// Resolve a location for `query`, falling back to the default.
    pub async fn resolve_location(&self, query: &str) -> (String, LocationSource) {
        match self.extractor.extract(query).await {
            Some(location) => (location, LocationSource::Extracted),
            None => {
                tracing::debug!(
                    "No location extracted, using default '{}'",
                    self.default_location
                );
                (self.default_location.clone(), LocationSource::Default)
            }
        }
    }

    /// Run the whole pipeline for one query.
    pub async fn run(&self, query: &str) -> PipelineOutcome {
        let (location, source) = self.resolve_location(query).await;
        tracing::debug!("Location resolved: '{}' ({:?})", location, source);

        match self.weather.fetch(&location).await {
            Ok(payload) => {
                let metrics = project(payload.as_value());
                if metrics.is_empty() {
                    tracing::warn!("Weather payload for '{}' had no recognised fields", location);
                }
                tracing::info!("Weather resolved for '{}'", location);
                PipelineOutcome::WeatherResolved {
                    location,
                    source,
                    metrics,
                    payload,
                }
            }
            Err(e) => {
                tracing::warn!("Weather fetch for '{}' failed: {}", location, e);
                PipelineOutcome::Failed {
                    location,
                    source,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-ins for the two external calls.

    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    use crate::services::location::LocationExtractor;
    use crate::services::weatherapi::{FetchError, WeatherPayload, WeatherSource};

    /// Returns a fixed extraction result and records each query it sees.
    pub struct FakeExtractor {
        reply: Option<String>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        pub fn returning(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(|s| s.to_string()),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LocationExtractor for FakeExtractor {
        async fn extract(&self, query: &str) -> Option<String> {
            self.queries.lock().unwrap().push(query.to_string());
            self.reply.clone()
        }
    }

    /// Returns a fixed payload (or a status error) and records requested locations.
    pub struct FakeWeather {
        reply: Result<Value, String>,
        pub locations: Mutex<Vec<String>>,
    }

    impl FakeWeather {
        pub fn ok(payload: Value) -> Self {
            Self {
                reply: Ok(payload),
                locations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                locations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn fetch(&self, location: &str) -> Result<WeatherPayload, FetchError> {
            self.locations.lock().unwrap().push(location.to_string());
            match &self.reply {
                Ok(v) => Ok(WeatherPayload::new(v.clone())),
                Err(msg) => Err(FetchError::Request(msg.clone())),
            }
        }
    }
}
