// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Flow Gateway

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-flow-gateway-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "rsa-oaep-sha256",
    "aes-128-gcm",
    "iv-flip-responses",
    "ping-health-check",
    "screen-dispatcher",
    "refresh-on-back",
    "booking-flow",
    "submission-log",
    "flow-catalog",
    "key-cache",
];

/// Data-exchange protocol versions accepted in decrypted requests
pub const SUPPORTED_FLOW_VERSIONS: &[&str] = &["3.0"];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Flow Gateway {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "flow_versions": SUPPORTED_FLOW_VERSIONS,
    })
}
