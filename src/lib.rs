/// Tab Wise - side panel tab grouping for Chrome
/// Built with Rust + WASM

pub mod activity;
pub mod background;
pub mod clock;
pub mod domain;
pub mod group_store;
pub mod grouping;
pub mod hierarchy;
pub mod memory;
pub mod panel;
pub mod storage;
pub mod tab_data;

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use activity::ActivityTracker;
use background::{ActiveTabTimer, BackgroundTracker};
use clock::{BrowserClock, Clock};
use group_store::{CustomGroupStore, SaveOutcome};
use grouping::GroupedTabs;
use panel::PanelState;
use storage::ChromeStorage;
use tab_data::{
    AutoGroupStrategy, BrowserTab, CustomGroupConfig, CustomGroupUpdate, GroupingSettings, TabGroup,
};

// JS bridge to chrome.tabs and chrome.processes
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTabsMemory(tab_ids: JsValue) -> Result<JsValue, JsValue>;
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Values cross the boundary as plain JSON. Going through serde_json keeps
// integer map keys (tab ids) as object keys on both sides.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    json.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    let json: serde_json::Value = serde_wasm_bindgen::from_value(value)?;
    serde_json::from_value(json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_strategy(strategy: &str) -> Result<AutoGroupStrategy, JsValue> {
    strategy.parse().map_err(|e: String| JsValue::from_str(&e))
}

fn group_store() -> CustomGroupStore<ChromeStorage, BrowserClock> {
    CustomGroupStore::new(ChromeStorage, BrowserClock)
}

fn activity_tracker() -> ActivityTracker<ChromeStorage, BrowserClock> {
    ActivityTracker::new(ChromeStorage, BrowserClock)
}

// ---- Grouping ----

#[wasm_bindgen]
pub fn group_tabs(tabs: JsValue, strategy: &str, custom_groups: JsValue) -> Result<JsValue, JsValue> {
    let tabs: Vec<tab_data::TabInfo> = from_js(tabs)?;
    let custom_groups: Vec<CustomGroupConfig> = from_js(custom_groups)?;
    let groups = grouping::group_tabs(&tabs, parse_strategy(strategy)?, &custom_groups, &BrowserClock);
    to_js(&groups)
}

/// Search, group and nest in one pass, as the side panel renders
#[wasm_bindgen]
pub fn render_panel(
    tabs: JsValue,
    search_query: &str,
    strategy: &str,
    enable_auto_grouping: bool,
    custom_groups: JsValue,
) -> Result<JsValue, JsValue> {
    let state = PanelState {
        tabs: from_js(tabs)?,
        search_query: search_query.to_string(),
        strategy: parse_strategy(strategy)?,
        enable_auto_grouping,
        custom_groups: from_js(custom_groups)?,
    };
    let groups = state.grouped(&BrowserClock);
    to_js(&hierarchy::organize_hierarchy(&groups))
}

#[wasm_bindgen]
pub fn filter_tabs(tabs: JsValue, query: &str) -> Result<JsValue, JsValue> {
    let tabs: Vec<tab_data::TabInfo> = from_js(tabs)?;
    to_js(&grouping::filter_tabs(&tabs, query))
}

#[wasm_bindgen]
pub fn organize_hierarchy(groups: JsValue) -> Result<JsValue, JsValue> {
    let groups: GroupedTabs = from_js(groups)?;
    to_js(&hierarchy::organize_hierarchy(&groups))
}

#[wasm_bindgen]
pub fn parent_candidates(groups: JsValue, editing_id: Option<String>) -> Result<JsValue, JsValue> {
    let groups: Vec<CustomGroupConfig> = from_js(groups)?;
    to_js(&hierarchy::parent_candidates(&groups, editing_id.as_deref()))
}

#[wasm_bindgen]
pub fn prettify_domain(domain: &str) -> String {
    domain::prettify_domain(domain)
}

#[wasm_bindgen]
pub fn favicon_or_default(favicon: Option<String>) -> String {
    domain::favicon_or_default(favicon.as_deref()).to_string()
}

/// Current tabs, with activity and memory joined in
#[wasm_bindgen]
pub async fn load_tabs() -> Result<JsValue, JsValue> {
    let raw: Vec<BrowserTab> = from_js(queryTabs().await?)?;
    let tabs = tab_data::normalize_tabs(raw);

    let activity_data = activity_tracker().get_activity_data().await;
    let tabs = activity::attach_activity(&tabs, &activity_data);

    let ids: Vec<i32> = tabs.iter().map(|tab| tab.id).collect();
    let samples: HashMap<i32, u64> = match getTabsMemory(to_js(&ids)?).await {
        Ok(js) if !js.is_null() && !js.is_undefined() => from_js(js)?,
        Ok(_) => HashMap::new(),
        Err(e) => {
            log::warn!("Memory sampling unavailable: {:?}", e);
            HashMap::new()
        }
    };

    to_js(&memory::attach_memory(&tabs, &samples))
}

// ---- Custom groups ----

#[wasm_bindgen]
pub async fn get_custom_groups() -> Result<JsValue, JsValue> {
    to_js(&group_store().list().await?)
}

#[wasm_bindgen]
pub async fn add_custom_group(group: JsValue) -> Result<(), JsValue> {
    group_store().add(from_js(group)?).await?;
    Ok(())
}

#[wasm_bindgen]
pub async fn update_custom_group(group_id: &str, updates: JsValue) -> Result<bool, JsValue> {
    let updates: CustomGroupUpdate = from_js(updates)?;
    Ok(group_store().update(group_id, updates).await?)
}

#[wasm_bindgen]
pub async fn delete_custom_group(group_id: &str) -> Result<bool, JsValue> {
    Ok(group_store().delete(group_id).await?)
}

/// New favorite state, or undefined when the group does not exist
#[wasm_bindgen]
pub async fn toggle_group_favorite(group_id: &str) -> Result<Option<bool>, JsValue> {
    Ok(group_store().toggle_favorite(group_id).await?)
}

#[wasm_bindgen]
pub async fn add_tab_to_group(group_id: &str, tab_id: i32) -> Result<bool, JsValue> {
    Ok(group_store().add_tab_to_group(group_id, tab_id).await?)
}

#[wasm_bindgen]
pub async fn remove_tab_from_group(group_id: &str, tab_id: i32) -> Result<bool, JsValue> {
    Ok(group_store().remove_tab_from_group(group_id, tab_id).await?)
}

/// Drag-and-drop target. `None` drops the tab back to automatic grouping.
#[wasm_bindgen]
pub async fn move_tab_to_group(tab_id: i32, target_group_id: Option<String>) -> Result<(), JsValue> {
    group_store()
        .move_tab_to_group(tab_id, target_group_id.as_deref())
        .await?;
    Ok(())
}

#[wasm_bindgen]
pub async fn cleanup_dead_tabs(active_tab_ids: Vec<i32>) -> Result<bool, JsValue> {
    Ok(group_store().cleanup_dead_tabs(&active_tab_ids).await?)
}

/// Returns "created" or "updated"
#[wasm_bindgen]
pub async fn save_custom_group(group: JsValue) -> Result<String, JsValue> {
    let outcome = group_store().save_group(from_js(group)?).await?;
    Ok(match outcome {
        SaveOutcome::Created => "created".to_string(),
        SaveOutcome::Updated => "updated".to_string(),
    })
}

#[wasm_bindgen]
pub fn new_custom_group(
    name: &str,
    color: Option<String>,
    tab_ids: Vec<i32>,
    parent_group_id: Option<String>,
) -> Result<JsValue, JsValue> {
    let color = color.unwrap_or_else(|| group_store::random_group_color().to_string());
    to_js(&group_store().new_group(name, &color, tab_ids, parent_group_id))
}

/// Snapshot an automatic group as a new custom group config (not yet saved)
#[wasm_bindgen]
pub fn convert_to_custom(group: JsValue) -> Result<JsValue, JsValue> {
    let group: TabGroup = from_js(group)?;
    to_js(&group_store().convert_to_custom(&group))
}

#[wasm_bindgen]
pub fn generate_group_id() -> String {
    group_store().generate_group_id()
}

#[wasm_bindgen]
pub async fn get_grouping_settings() -> Result<JsValue, JsValue> {
    to_js(&group_store().get_grouping_settings().await?)
}

#[wasm_bindgen]
pub async fn save_grouping_settings(settings: JsValue) -> Result<(), JsValue> {
    let settings: GroupingSettings = from_js(settings)?;
    group_store().save_grouping_settings(&settings).await?;
    Ok(())
}

// ---- Activity ----

#[wasm_bindgen]
pub async fn get_activity_data() -> Result<JsValue, JsValue> {
    to_js(&activity_tracker().get_activity_data().await)
}

#[wasm_bindgen]
pub async fn record_tab_activation(tab_id: i32, url: &str) -> Result<(), JsValue> {
    activity_tracker().record_activation(tab_id, url).await?;
    Ok(())
}

#[wasm_bindgen]
pub async fn record_time_spent(tab_id: i32, duration_ms: f64) -> Result<bool, JsValue> {
    Ok(activity_tracker().record_time_spent(tab_id, duration_ms).await?)
}

#[wasm_bindgen]
pub async fn remove_tab_activity(tab_id: i32) -> Result<(), JsValue> {
    activity_tracker().remove_activity(tab_id).await?;
    Ok(())
}

/// Number of expired records dropped
#[wasm_bindgen]
pub async fn cleanup_old_activity() -> Result<u32, JsValue> {
    let removed = background_tracker(JsValue::NULL)?.sweep().await?;
    Ok(removed as u32)
}

#[wasm_bindgen]
pub fn format_last_visited(timestamp: f64) -> String {
    activity::format_last_visited(timestamp, BrowserClock.now_ms())
}

#[wasm_bindgen]
pub fn format_time_spent(milliseconds: f64) -> String {
    activity::format_time_spent(milliseconds)
}

/// "active", "recent", "idle" or "stale"
#[wasm_bindgen]
pub fn activity_status(last_visited: f64) -> Result<JsValue, JsValue> {
    to_js(&activity::activity_status(last_visited, BrowserClock.now_ms()))
}

#[wasm_bindgen]
pub fn summarize_activity(tabs: JsValue) -> Result<JsValue, JsValue> {
    let tabs: Vec<tab_data::TabInfo> = from_js(tabs)?;
    to_js(&activity::summarize_activity(&tabs, BrowserClock.now_ms()))
}

// ---- Background worker events ----
//
// The worker keeps the timer returned by each call and passes it to the next.

fn background_tracker(timer: JsValue) -> Result<BackgroundTracker<ChromeStorage, BrowserClock>, JsValue> {
    let timer: ActiveTabTimer = if timer.is_null() || timer.is_undefined() {
        ActiveTabTimer::new()
    } else {
        from_js(timer)?
    };
    Ok(BackgroundTracker::with_timer(ChromeStorage, BrowserClock, timer))
}

#[wasm_bindgen]
pub async fn on_tab_activated(timer: JsValue, tab_id: i32, url: &str) -> Result<JsValue, JsValue> {
    let mut background = background_tracker(timer)?;
    background.on_tab_activated(tab_id, url).await?;
    to_js(&background.into_timer())
}

#[wasm_bindgen]
pub async fn on_tab_removed(timer: JsValue, tab_id: i32) -> Result<JsValue, JsValue> {
    let mut background = background_tracker(timer)?;
    background.on_tab_removed(tab_id).await?;
    to_js(&background.into_timer())
}

#[wasm_bindgen]
pub async fn on_focus_changed(timer: JsValue, focused: bool) -> Result<JsValue, JsValue> {
    let mut background = background_tracker(timer)?;
    background.on_focus_changed(focused).await?;
    to_js(&background.into_timer())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshIntervals {
    activity_cleanup_ms: f64,
    activity_refresh_ms: f64,
    memory_refresh_ms: f64,
}

/// Timer periods for the worker and the side panel
#[wasm_bindgen]
pub fn refresh_intervals() -> Result<JsValue, JsValue> {
    to_js(&RefreshIntervals {
        activity_cleanup_ms: activity::ACTIVITY_CLEANUP_INTERVAL_MS,
        activity_refresh_ms: activity::ACTIVITY_REFRESH_INTERVAL_MS,
        memory_refresh_ms: memory::MEMORY_REFRESH_INTERVAL_MS,
    })
}

// ---- Memory ----

#[wasm_bindgen]
pub fn format_bytes(bytes: f64, decimals: usize) -> String {
    memory::format_byte_count(bytes, decimals)
}

/// "healthy", "moderate" or "critical" for the share of system memory still free
#[wasm_bindgen]
pub fn memory_pressure(available_percentage: f64) -> Result<JsValue, JsValue> {
    to_js(&memory::memory_pressure(available_percentage))
}

/// "low", "medium", "high" or "critical" for a byte count
#[wasm_bindgen]
pub fn memory_status(bytes: f64) -> Result<JsValue, JsValue> {
    to_js(&memory::memory_status(memory::bytes_to_mb(bytes.max(0.0) as u64)))
}

#[wasm_bindgen]
pub fn memory_percentage(used: f64, total: f64) -> f64 {
    memory::memory_percentage(used.max(0.0) as u64, total.max(0.0) as u64)
}

#[wasm_bindgen]
pub fn summarize_memory(tabs: JsValue) -> Result<JsValue, JsValue> {
    let tabs: Vec<tab_data::TabInfo> = from_js(tabs)?;
    to_js(&memory::summarize_memory(&tabs))
}

/// Tabs above the warning threshold, heaviest first
#[wasm_bindgen]
pub fn high_memory_tabs(tabs: JsValue) -> Result<JsValue, JsValue> {
    let tabs: Vec<tab_data::TabInfo> = from_js(tabs)?;
    let threshold = memory::MemoryThreshold::default();
    let sorted = memory::sort_tabs_by_memory(&tabs);
    to_js(&memory::high_memory_tabs(&sorted, threshold.warning))
}

#[wasm_bindgen]
pub fn should_alert_memory(high_memory_count: usize, last_alert: f64) -> bool {
    memory::should_alert(high_memory_count, BrowserClock.now_ms(), last_alert)
}
