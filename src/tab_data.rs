/// Data structures for Tab Wise
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A tab exactly as the host browser reports it (chrome.tabs.Tab subset)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: Option<i32>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub fav_icon_url: Option<String>,
    pub window_id: Option<i32>,
    pub active: Option<bool>,
}

/// Information about a browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: i32,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<TabActivity>,
    /// Private memory in bytes, when the host exposes process info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

impl TabInfo {
    pub fn new(id: i32, url: String, title: String) -> TabInfo {
        TabInfo {
            id,
            title,
            url,
            fav_icon_url: None,
            active: None,
            window_id: None,
            activity: None,
            memory: None,
        }
    }

    /// Normalize a raw browser tab. Tabs without an id (devtools, prerender) are skipped.
    pub fn from_browser_tab(tab: BrowserTab) -> Option<TabInfo> {
        let id = tab.id?;
        Some(TabInfo {
            id,
            title: tab.title.unwrap_or_default(),
            url: tab.url.unwrap_or_default(),
            fav_icon_url: tab.fav_icon_url,
            active: tab.active,
            window_id: tab.window_id,
            activity: None,
            memory: None,
        })
    }
}

/// Normalize the full tab list returned by chrome.tabs.query
pub fn normalize_tabs(tabs: Vec<BrowserTab>) -> Vec<TabInfo> {
    tabs.into_iter().filter_map(TabInfo::from_browser_tab).collect()
}

/// Usage statistics for one tab within the retention window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabActivity {
    pub tab_id: i32,
    pub url: String,
    /// Epoch milliseconds of the last activation
    pub last_visited: f64,
    /// Milliseconds spent on the tab
    pub total_time_spent: f64,
    pub visit_count: u32,
}

/// Activity records keyed by tab id
pub type ActivityData = HashMap<i32, TabActivity>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Automatic,
    Custom,
}

/// Heuristic used to cluster tabs that no custom group claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoGroupStrategy {
    #[default]
    Domain,
    ContentSimilarity,
    TimeOfDay,
    ActivityPattern,
    ProjectContext,
}

impl AutoGroupStrategy {
    pub const ALL: [AutoGroupStrategy; 5] = [
        AutoGroupStrategy::Domain,
        AutoGroupStrategy::ContentSimilarity,
        AutoGroupStrategy::TimeOfDay,
        AutoGroupStrategy::ActivityPattern,
        AutoGroupStrategy::ProjectContext,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutoGroupStrategy::Domain => "domain",
            AutoGroupStrategy::ContentSimilarity => "content-similarity",
            AutoGroupStrategy::TimeOfDay => "time-of-day",
            AutoGroupStrategy::ActivityPattern => "activity-pattern",
            AutoGroupStrategy::ProjectContext => "project-context",
        }
    }

    /// Label shown in the strategy selector
    pub fn label(&self) -> &'static str {
        match self {
            AutoGroupStrategy::Domain => "By Domain",
            AutoGroupStrategy::ContentSimilarity => "By Content",
            AutoGroupStrategy::TimeOfDay => "By Time of Day",
            AutoGroupStrategy::ActivityPattern => "By Activity",
            AutoGroupStrategy::ProjectContext => "By Project",
        }
    }
}

impl fmt::Display for AutoGroupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoGroupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutoGroupStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("Unknown grouping strategy: {}", s))
    }
}

/// A user-defined group as persisted in chrome.storage.local
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupConfig {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Weak references: ids may point at tabs that have since closed
    pub tab_ids: Vec<i32>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
    pub created_at: f64,
    pub last_modified: f64,
}

/// Partial update merged into a stored group. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub tab_ids: Option<Vec<i32>>,
    pub is_favorite: Option<bool>,
    /// `Some(None)` clears the parent
    #[serde(default)]
    pub parent_group_id: Option<Option<String>>,
}

impl CustomGroupUpdate {
    pub fn apply(self, group: &mut CustomGroupConfig) {
        if let Some(name) = self.name {
            group.name = name;
        }
        if let Some(color) = self.color {
            group.color = color;
        }
        if let Some(tab_ids) = self.tab_ids {
            group.tab_ids = tab_ids;
        }
        if let Some(is_favorite) = self.is_favorite {
            group.is_favorite = is_favorite;
        }
        if let Some(parent_group_id) = self.parent_group_id {
            group.parent_group_id = parent_group_id;
        }
    }
}

impl From<CustomGroupConfig> for CustomGroupUpdate {
    fn from(group: CustomGroupConfig) -> Self {
        CustomGroupUpdate {
            name: Some(group.name),
            color: Some(group.color),
            tab_ids: Some(group.tab_ids),
            is_favorite: Some(group.is_favorite),
            parent_group_id: Some(group.parent_group_id),
        }
    }
}

/// A group as rendered for one grouping pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: String,
    /// Display name
    pub domain: String,
    pub tabs: Vec<TabInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_group_strategy: Option<AutoGroupStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<f64>,
}

impl TabGroup {
    pub fn is_custom(&self) -> bool {
        self.group_type == GroupType::Custom
    }

    pub fn tab_ids(&self) -> Vec<i32> {
        self.tabs.iter().map(|tab| tab.id).collect()
    }
}

/// User-facing grouping preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupingSettings {
    pub enable_auto_grouping: bool,
    pub auto_group_strategies: Vec<AutoGroupStrategy>,
    pub default_group_type: GroupType,
    pub show_nested_groups: bool,
    pub favorites_first: bool,
}

impl Default for GroupingSettings {
    fn default() -> Self {
        GroupingSettings {
            enable_auto_grouping: true,
            auto_group_strategies: vec![AutoGroupStrategy::Domain],
            default_group_type: GroupType::Automatic,
            show_nested_groups: true,
            favorites_first: true,
        }
    }
}

impl GroupingSettings {
    /// Strategy to group by: the first configured one, or domain when auto-grouping is off
    pub fn active_strategy(&self) -> AutoGroupStrategy {
        if !self.enable_auto_grouping {
            return AutoGroupStrategy::Domain;
        }
        self.auto_group_strategies.first().copied().unwrap_or_default()
    }
}

/// Palette offered for custom groups
pub const GROUP_COLORS: [&str; 16] = [
    "#EF4444", // Red
    "#F97316", // Orange
    "#F59E0B", // Amber
    "#EAB308", // Yellow
    "#84CC16", // Lime
    "#22C55E", // Green
    "#10B981", // Emerald
    "#14B8A6", // Teal
    "#06B6D4", // Cyan
    "#0EA5E9", // Sky
    "#3B82F6", // Blue
    "#6366F1", // Indigo
    "#8B5CF6", // Violet
    "#A855F7", // Purple
    "#D946EF", // Fuchsia
    "#EC4899", // Pink
];
