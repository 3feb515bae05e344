//! Configuration validation utilities

use crate::schema::{Config, TrackingStrategy};
use serde::Serialize;
use std::time::Duration;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_relay(config, &mut report);
        Self::validate_upstream(config, &mut report);
        Self::validate_bundle(config, &mut report);
        Self::validate_tracking(config, &mut report);
        Self::validate_logging(config, &mut report);

        report
    }

    fn validate_relay(config: &Config, report: &mut ValidationReport) {
        let relay = &config.relay;

        if relay.name.is_empty() {
            report.add_error("relay.name", "Relay name cannot be empty");
        }

        if relay.url.is_empty() {
            report.add_error("relay.url", "Relay URL cannot be empty");
        } else if relay.url.starts_with("http://") {
            report.add_warning("relay.url", "Relay URL should use HTTPS");
        } else if !relay.url.starts_with("https://") {
            report.add_error("relay.url", &format!("Invalid relay URL format: {}", relay.url));
        }

        if let Some(ref ws_url) = relay.ws_url {
            if !ws_url.starts_with("ws://") && !ws_url.starts_with("wss://") {
                report.add_error("relay.ws_url", "WebSocket URL must start with ws:// or wss://");
            } else if ws_url.starts_with("ws://") {
                report.add_warning("relay.ws_url", "WebSocket URL should use wss://");
            }
        }

        for (field, path) in [
            ("relay.bundles_path", &relay.bundles_path),
            ("relay.inflight_status_path", &relay.inflight_status_path),
            ("relay.bundle_status_path", &relay.bundle_status_path),
        ] {
            if path.is_empty() {
                report.add_warning(field, "Empty path, requests will go to the relay base URL");
            }
        }

        if relay.timeout_seconds == 0 {
            report.add_error("relay.timeout_seconds", "Timeout cannot be zero");
        } else if relay.timeout_seconds > 300 {
            report.add_warning(
                "relay.timeout_seconds",
                &format!("Timeout is very high ({}s)", relay.timeout_seconds),
            );
        }
    }

    fn validate_upstream(config: &Config, report: &mut ValidationReport) {
        let upstream = &config.upstream;

        if upstream.rpc_url.is_empty() {
            report.add_error("upstream.rpc_url", "Upstream RPC URL cannot be empty");
        } else if !upstream.rpc_url.starts_with("http://") && !upstream.rpc_url.starts_with("https://") {
            report.add_error("upstream.rpc_url", "Upstream RPC URL must start with http:// or https://");
        }

        let valid_commitments = ["processed", "confirmed", "finalized"];
        if !valid_commitments.contains(&upstream.commitment.as_str()) {
            report.add_error(
                "upstream.commitment",
                &format!(
                    "Invalid commitment: {}. Valid commitments: {:?}",
                    upstream.commitment, valid_commitments
                ),
            );
        }

        if upstream.timeout_seconds == 0 {
            report.add_error("upstream.timeout_seconds", "Timeout cannot be zero");
        }
    }

    fn validate_bundle(config: &Config, report: &mut ValidationReport) {
        if config.bundle.max_transactions == 0 {
            report.add_error("bundle.max_transactions", "Bundle size limit cannot be 0");
        } else if config.bundle.max_transactions > 5 {
            report.add_warning(
                "bundle.max_transactions",
                "Block engines currently reject bundles with more than 5 transactions",
            );
        }
    }

    fn validate_tracking(config: &Config, report: &mut ValidationReport) {
        let tracking = &config.tracking;

        if tracking.max_poll_attempts == 0 {
            report.add_error("tracking.max_poll_attempts", "At least one status query is required");
        }

        if tracking.poll_interval_ms == 0 {
            report.add_error("tracking.poll_interval_ms", "Poll interval cannot be 0");
        } else if tracking.poll_interval_ms < 500 {
            report.add_warning(
                "tracking.poll_interval_ms",
                "Poll interval below 500ms is likely to hit relay rate limits",
            );
        }

        if tracking.poll_budget() > Duration::from_secs(600) {
            report.add_warning(
                "tracking",
                &format!(
                    "Poll budget of {}s outlives any recent blockhash",
                    tracking.poll_budget().as_secs()
                ),
            );
        }

        if tracking.event_timeout_seconds == 0 {
            report.add_error("tracking.event_timeout_seconds", "Event timeout cannot be 0");
        }

        if tracking.strategy == TrackingStrategy::Event && config.relay.ws_url.is_none() {
            report.add_error("relay.ws_url", "Event tracking requires a WebSocket URL");
        }
    }

    fn validate_logging(config: &Config, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            report.add_error(
                "logging.level",
                &format!("Invalid log level: {}. Valid levels: {:?}", config.logging.level, valid_levels),
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            report.add_error(
                "logging.format",
                &format!("Invalid log format: {}. Valid formats: {:?}", config.logging.format, valid_formats),
            );
        }

        if config.logging.level == "trace" || config.logging.level == "debug" {
            report.add_warning("logging.level", "Debug/trace logging may impact performance in production");
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
