/// Memory annotations for tabs
///
/// Per-tab memory comes from chrome.processes, which only Dev and Canary
/// channels expose. On stable Chrome the sampler returns nothing and every tab
/// keeps `memory: None`.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tab_data::TabInfo;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// How often the panel re-samples memory
pub const MEMORY_REFRESH_INTERVAL_MS: f64 = 30_000.0;
/// Minimum gap between two high-memory alerts
pub const MEMORY_ALERT_COOLDOWN_MS: f64 = 5.0 * 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryThreshold {
    /// Megabytes
    pub warning: f64,
    /// Megabytes
    pub critical: f64,
}

impl Default for MemoryThreshold {
    fn default() -> Self {
        MemoryThreshold {
            warning: 100.0,
            critical: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    Low,
    Medium,
    High,
    Critical,
}

/// Human-readable size with base-1024 units, e.g. "1.5 MB"
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    while exponent < SIZE_UNITS.len() - 1 && bytes >= 1u64 << (10 * (exponent + 1)) {
        exponent += 1;
    }
    let value = bytes as f64 / (1u64 << (10 * exponent)) as f64;

    // Round, then let the float formatter drop trailing zeros
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    format!("{} {}", rounded, SIZE_UNITS[exponent])
}

/// `format_bytes` for counts from JS, where a negative or NaN value means "unknown"
pub fn format_byte_count(bytes: f64, decimals: usize) -> String {
    if bytes.is_nan() || bytes < 0.0 {
        return "N/A".to_string();
    }
    format_bytes(bytes as u64, decimals)
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Copy of `tabs` with sampled memory joined in; tabs missing from the sample get None
pub fn attach_memory(tabs: &[TabInfo], samples: &HashMap<i32, u64>) -> Vec<TabInfo> {
    tabs.iter()
        .map(|tab| TabInfo {
            memory: samples.get(&tab.id).copied(),
            ..tab.clone()
        })
        .collect()
}

pub fn calculate_total_memory(tabs: &[TabInfo]) -> u64 {
    tabs.iter().filter_map(|tab| tab.memory).sum()
}

/// Heaviest tabs first; tabs without a sample count as zero
pub fn sort_tabs_by_memory(tabs: &[TabInfo]) -> Vec<TabInfo> {
    let mut sorted = tabs.to_vec();
    sorted.sort_by(|a, b| b.memory.unwrap_or(0).cmp(&a.memory.unwrap_or(0)));
    sorted
}

/// Tabs using more than `threshold_mb`
pub fn high_memory_tabs(tabs: &[TabInfo], threshold_mb: f64) -> Vec<TabInfo> {
    let threshold_bytes = threshold_mb * BYTES_PER_MB;
    tabs.iter()
        .filter(|tab| tab.memory.unwrap_or(0) as f64 > threshold_bytes)
        .cloned()
        .collect()
}

pub fn memory_status(memory_mb: f64) -> MemoryStatus {
    if memory_mb < 50.0 {
        MemoryStatus::Low
    } else if memory_mb < 100.0 {
        MemoryStatus::Medium
    } else if memory_mb < 200.0 {
        MemoryStatus::High
    } else {
        MemoryStatus::Critical
    }
}

/// Share of `total` taken by `used`, in percent. Zero when the total is unknown.
pub fn memory_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

/// System-wide memory pressure, judged by the share still available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Healthy,
    Moderate,
    Critical,
}

/// Over 30% free is healthy, over 15% moderate, anything less critical
pub fn memory_pressure(available_percentage: f64) -> MemoryPressure {
    if available_percentage > 30.0 {
        MemoryPressure::Healthy
    } else if available_percentage > 15.0 {
        MemoryPressure::Moderate
    } else {
        MemoryPressure::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    pub total: u64,
    pub average: f64,
    /// Tabs with a non-zero sample; zero means memory data is unavailable
    pub sampled_tabs: usize,
}

pub fn summarize_memory(tabs: &[TabInfo]) -> MemorySummary {
    let total = calculate_total_memory(tabs);
    MemorySummary {
        total,
        average: if tabs.is_empty() {
            0.0
        } else {
            total as f64 / tabs.len() as f64
        },
        sampled_tabs: tabs.iter().filter(|tab| tab.memory.unwrap_or(0) > 0).count(),
    }
}

/// Whether a high-memory alert should fire now, given when the last one did
pub fn should_alert(high_memory_count: usize, now: f64, last_alert: f64) -> bool {
    high_memory_count > 0 && now - last_alert > MEMORY_ALERT_COOLDOWN_MS
}
