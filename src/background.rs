/// Background worker bookkeeping: which tab is in front and for how long
use serde::{Deserialize, Serialize};

use crate::activity::ActivityTracker;
use crate::clock::Clock;
use crate::storage::{StorageBackend, StorageError};

/// Shorter visits are flash-switches and are not counted as time spent
pub const MIN_RECORDED_DURATION_MS: f64 = 1_000.0;

/// Time spent on a tab that is ready to be recorded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dwell {
    pub tab_id: i32,
    pub duration_ms: f64,
}

/// Tracks the foreground tab and when it came to the front
///
/// The timer pauses while the browser window is unfocused. It serializes so the
/// worker can hand it back and forth across event callbacks.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveTabTimer {
    active_tab_id: Option<i32>,
    started_at: Option<f64>,
}

impl ActiveTabTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tab_id(&self) -> Option<i32> {
        self.active_tab_id
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Dwell for the current tab, if it lasted longer than the minimum
    pub fn elapsed(&self, now: f64) -> Option<Dwell> {
        let tab_id = self.active_tab_id?;
        let duration_ms = now - self.started_at?;
        (duration_ms > MIN_RECORDED_DURATION_MS).then_some(Dwell { tab_id, duration_ms })
    }

    pub fn start(&mut self, tab_id: i32, now: f64) {
        self.active_tab_id = Some(tab_id);
        self.started_at = Some(now);
    }

    pub fn pause(&mut self) {
        self.started_at = None;
    }

    /// Restart timing for the tab already in front
    pub fn resume(&mut self, now: f64) {
        if self.active_tab_id.is_some() {
            self.started_at = Some(now);
        }
    }

    pub fn clear(&mut self) {
        self.active_tab_id = None;
        self.started_at = None;
    }
}

/// Tab events from chrome.tabs / chrome.windows, applied to the activity store
pub struct BackgroundTracker<S, C> {
    tracker: ActivityTracker<S, C>,
    clock: C,
    timer: ActiveTabTimer,
}

impl<S: StorageBackend, C: Clock + Clone> BackgroundTracker<S, C> {
    pub fn new(backend: S, clock: C) -> Self {
        Self::with_timer(backend, clock, ActiveTabTimer::new())
    }

    /// Resume from a timer saved after an earlier event
    pub fn with_timer(backend: S, clock: C, timer: ActiveTabTimer) -> Self {
        BackgroundTracker {
            tracker: ActivityTracker::new(backend, clock.clone()),
            clock,
            timer,
        }
    }

    pub fn into_timer(self) -> ActiveTabTimer {
        self.timer
    }

    pub fn tracker(&self) -> &ActivityTracker<S, C> {
        &self.tracker
    }

    pub fn timer(&self) -> &ActiveTabTimer {
        &self.timer
    }

    async fn flush_dwell(&self) -> Result<(), StorageError> {
        if let Some(dwell) = self.timer.elapsed(self.clock.now_ms()) {
            self.tracker.record_time_spent(dwell.tab_id, dwell.duration_ms).await?;
        }
        Ok(())
    }

    /// chrome.tabs.onActivated: close out the previous tab, then count the new one
    pub async fn on_tab_activated(&mut self, tab_id: i32, url: &str) -> Result<(), StorageError> {
        self.flush_dwell().await?;
        self.tracker.record_activation(tab_id, url).await?;
        self.timer.start(tab_id, self.clock.now_ms());
        Ok(())
    }

    /// chrome.tabs.onRemoved
    pub async fn on_tab_removed(&mut self, tab_id: i32) -> Result<(), StorageError> {
        if self.timer.active_tab_id() == Some(tab_id) {
            self.flush_dwell().await?;
            self.timer.clear();
        }
        self.tracker.remove_activity(tab_id).await
    }

    /// chrome.windows.onFocusChanged. Losing focus records time and pauses the timer.
    pub async fn on_focus_changed(&mut self, focused: bool) -> Result<(), StorageError> {
        if focused {
            self.timer.resume(self.clock.now_ms());
        } else {
            self.flush_dwell().await?;
            self.timer.pause();
        }
        Ok(())
    }

    /// Hourly sweep, also run once at startup
    pub async fn sweep(&self) -> Result<usize, StorageError> {
        self.tracker.cleanup_old().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;

    const T0: f64 = 1_700_000_000_000.0;

    #[test]
    fn test_timer_ignores_short_visits() {
        let mut timer = ActiveTabTimer::new();
        timer.start(5, T0);

        assert_eq!(timer.elapsed(T0 + 500.0), None);
        assert_eq!(timer.elapsed(T0 + 1_000.0), None);
        assert_eq!(
            timer.elapsed(T0 + 1_001.0),
            Some(Dwell {
                tab_id: 5,
                duration_ms: 1_001.0
            })
        );
    }

    #[test]
    fn test_timer_pause_and_resume() {
        let mut timer = ActiveTabTimer::new();
        timer.start(5, T0);
        timer.pause();

        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(T0 + 10_000.0), None);

        timer.resume(T0 + 20_000.0);
        assert_eq!(timer.elapsed(T0 + 25_000.0).map(|d| d.duration_ms), Some(5_000.0));
    }

    #[test]
    fn test_resume_without_active_tab_stays_idle() {
        let mut timer = ActiveTabTimer::new();
        timer.resume(T0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_flash_switch_adds_no_time() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut background = BackgroundTracker::new(&storage, &clock);

        block_on(background.on_tab_activated(5, "https://a.com")).unwrap();
        clock.advance(500.0);
        block_on(background.on_tab_activated(6, "https://b.com")).unwrap();

        let activity = block_on(background.tracker().get_tab_activity(5)).unwrap();
        assert_eq!(activity.total_time_spent, 0.0);
    }

    #[test]
    fn test_switching_records_previous_tab_time() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut background = BackgroundTracker::new(&storage, &clock);

        block_on(background.on_tab_activated(5, "https://a.com")).unwrap();
        clock.advance(30_000.0);
        block_on(background.on_tab_activated(6, "https://b.com")).unwrap();
        clock.advance(2_000.0);
        block_on(background.on_tab_activated(5, "https://a.com")).unwrap();

        let a = block_on(background.tracker().get_tab_activity(5)).unwrap();
        let b = block_on(background.tracker().get_tab_activity(6)).unwrap();
        assert_eq!(a.total_time_spent, 30_000.0);
        assert_eq!(a.visit_count, 2);
        assert_eq!(b.total_time_spent, 2_000.0);
        assert_eq!(background.timer().active_tab_id(), Some(5));
    }

    #[test]
    fn test_removing_active_tab_clears_timer_and_record() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut background = BackgroundTracker::new(&storage, &clock);

        block_on(background.on_tab_activated(5, "https://a.com")).unwrap();
        clock.advance(5_000.0);
        block_on(background.on_tab_removed(5)).unwrap();

        assert_eq!(background.timer().active_tab_id(), None);
        assert!(block_on(background.tracker().get_tab_activity(5)).is_none());
    }

    #[test]
    fn test_unfocused_time_is_not_counted() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut background = BackgroundTracker::new(&storage, &clock);

        block_on(background.on_tab_activated(5, "https://a.com")).unwrap();
        clock.advance(4_000.0);
        block_on(background.on_focus_changed(false)).unwrap();
        clock.advance(60_000.0);
        block_on(background.on_focus_changed(true)).unwrap();
        clock.advance(3_000.0);
        block_on(background.on_focus_changed(false)).unwrap();

        let activity = block_on(background.tracker().get_tab_activity(5)).unwrap();
        assert_eq!(activity.total_time_spent, 7_000.0);
    }

    #[test]
    fn test_timer_survives_handoff() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut first = BackgroundTracker::new(&storage, &clock);
        block_on(first.on_tab_activated(5, "https://a.com")).unwrap();
        let json = serde_json::to_value(first.into_timer()).unwrap();

        clock.advance(10_000.0);
        let timer: ActiveTabTimer = serde_json::from_value(json).unwrap();
        let mut second = BackgroundTracker::with_timer(&storage, &clock, timer);
        block_on(second.on_tab_activated(6, "https://b.com")).unwrap();

        let activity = block_on(second.tracker().get_tab_activity(5)).unwrap();
        assert_eq!(activity.total_time_spent, 10_000.0);
    }

    #[test]
    fn test_sweep_expires_old_records() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let mut background = BackgroundTracker::new(&storage, &clock);

        block_on(background.on_tab_activated(1, "https://a.com")).unwrap();
        clock.advance(25.0 * 60.0 * 60_000.0);

        assert_eq!(block_on(background.sweep()).unwrap(), 1);
    }
}
