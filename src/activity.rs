/// Per-tab usage tracking over a rolling 24 hour window
use serde::Serialize;

use crate::clock::Clock;
use crate::storage::{ACTIVITY_KEY, StorageBackend, StorageError, load, save};
use crate::tab_data::{ActivityData, TabActivity, TabInfo};

pub const SECOND_MS: f64 = 1_000.0;
pub const MINUTE_MS: f64 = 60.0 * SECOND_MS;
pub const HOUR_MS: f64 = 60.0 * MINUTE_MS;

/// How long a record survives without a visit
pub const ACTIVITY_RETENTION_MS: f64 = 24.0 * HOUR_MS;
/// How often the background worker sweeps expired records
pub const ACTIVITY_CLEANUP_INTERVAL_MS: f64 = HOUR_MS;
/// How often the side panel re-reads activity
pub const ACTIVITY_REFRESH_INTERVAL_MS: f64 = 10.0 * SECOND_MS;

/// Store for `TabActivity` records, one blob under `tabActivityData`
pub struct ActivityTracker<S, C> {
    backend: S,
    clock: C,
}

impl<S: StorageBackend, C: Clock> ActivityTracker<S, C> {
    pub fn new(backend: S, clock: C) -> Self {
        ActivityTracker { backend, clock }
    }

    async fn load_data(&self) -> Result<ActivityData, StorageError> {
        load(&self.backend, ACTIVITY_KEY).await
    }

    async fn save_data(&self, data: &ActivityData) -> Result<(), StorageError> {
        save(&self.backend, ACTIVITY_KEY, data).await
    }

    /// All records. Reads are best-effort: an unreadable store yields no activity.
    pub async fn get_activity_data(&self) -> ActivityData {
        match self.load_data().await {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Activity data unavailable: {}", e);
                ActivityData::new()
            }
        }
    }

    pub async fn get_tab_activity(&self, tab_id: i32) -> Option<TabActivity> {
        self.get_activity_data().await.remove(&tab_id)
    }

    /// Count a visit: create the record on first sight, else bump it
    pub async fn record_activation(&self, tab_id: i32, url: &str) -> Result<(), StorageError> {
        let mut data = self.load_data().await?;
        let now = self.clock.now_ms();

        data.entry(tab_id)
            .and_modify(|activity| {
                activity.last_visited = now;
                activity.url = url.to_string();
                activity.visit_count += 1;
            })
            .or_insert_with(|| TabActivity {
                tab_id,
                url: url.to_string(),
                last_visited: now,
                total_time_spent: 0.0,
                visit_count: 1,
            });

        self.save_data(&data).await
    }

    /// Add dwell time to an existing record. Any duration is added; filtering
    /// short visits is the caller's job. Returns false when the tab has no record.
    pub async fn record_time_spent(&self, tab_id: i32, duration_ms: f64) -> Result<bool, StorageError> {
        let mut data = self.load_data().await?;

        let Some(activity) = data.get_mut(&tab_id) else {
            return Ok(false);
        };
        activity.total_time_spent += duration_ms;

        self.save_data(&data).await?;
        Ok(true)
    }

    pub async fn remove_activity(&self, tab_id: i32) -> Result<(), StorageError> {
        let mut data = self.load_data().await?;
        data.remove(&tab_id);
        self.save_data(&data).await
    }

    /// Drop records not visited within the retention window. Returns how many went.
    pub async fn cleanup_old(&self) -> Result<usize, StorageError> {
        let mut data = self.load_data().await?;
        let cutoff = self.clock.now_ms() - ACTIVITY_RETENTION_MS;
        let before = data.len();

        data.retain(|_, activity| activity.last_visited > cutoff);
        let removed = before - data.len();

        self.save_data(&data).await?;
        if removed > 0 {
            log::debug!("Expired {} activity records", removed);
        }
        Ok(removed)
    }
}

/// Copy of `tabs` with each tab's activity record joined in
pub fn attach_activity(tabs: &[TabInfo], data: &ActivityData) -> Vec<TabInfo> {
    tabs.iter()
        .map(|tab| TabInfo {
            activity: data.get(&tab.id).cloned(),
            ..tab.clone()
        })
        .collect()
}

/// Relative label for a visit timestamp: "Just now", "5m ago", "3h ago", "2d ago"
pub fn format_last_visited(timestamp: f64, now: f64) -> String {
    let diff = now - timestamp;
    let seconds = (diff / SECOND_MS).floor();
    let minutes = (seconds / 60.0).floor();
    let hours = (minutes / 60.0).floor();
    let days = (hours / 24.0).floor();

    if seconds < 60.0 {
        "Just now".to_string()
    } else if minutes < 60.0 {
        format!("{}m ago", minutes)
    } else if hours < 24.0 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", days)
    }
}

/// Compact duration: "< 1s", "45s", "12m", "2h", "2h 5m"
pub fn format_time_spent(milliseconds: f64) -> String {
    if milliseconds < SECOND_MS {
        return "< 1s".to_string();
    }

    let seconds = (milliseconds / SECOND_MS).floor() as u64;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        match minutes % 60 {
            0 => format!("{}h", hours),
            remaining => format!("{}h {}m", hours, remaining),
        }
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Recent,
    Idle,
    Stale,
}

/// Recency bucket: under 5 minutes, 30 minutes, 2 hours, or older
pub fn activity_status(last_visited: f64, now: f64) -> ActivityStatus {
    let minutes = ((now - last_visited) / MINUTE_MS).floor();

    if minutes < 5.0 {
        ActivityStatus::Active
    } else if minutes < 30.0 {
        ActivityStatus::Recent
    } else if minutes < 120.0 {
        ActivityStatus::Idle
    } else {
        ActivityStatus::Stale
    }
}

/// Header numbers for the activity strip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_time_spent: f64,
    /// Visited in the last 30 minutes
    pub active_tabs: usize,
    /// Not visited for over 2 hours, or never
    pub stale_tabs: usize,
}

pub fn summarize_activity(tabs: &[TabInfo], now: f64) -> ActivitySummary {
    let tracked = tabs.iter().filter_map(|tab| tab.activity.as_ref());

    ActivitySummary {
        total_time_spent: tracked.clone().map(|a| a.total_time_spent).sum(),
        active_tabs: tracked
            .filter(|a| now - a.last_visited < 30.0 * MINUTE_MS)
            .count(),
        stale_tabs: tabs
            .iter()
            .filter(|tab| match &tab.activity {
                Some(a) => now - a.last_visited > 2.0 * HOUR_MS,
                None => true,
            })
            .count(),
    }
}
