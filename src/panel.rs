/// Side panel refresh cycle: search, group, nest
use crate::clock::Clock;
use crate::group_store::CustomGroupStore;
use crate::grouping::{GroupedTabs, effective_strategy, filter_tabs, group_tabs};
use crate::storage::{StorageBackend, StorageError};
use crate::tab_data::{AutoGroupStrategy, CustomGroupConfig, TabInfo};

/// Everything one render of the side panel depends on
///
/// Tabs and custom groups are replaced wholesale on each refresh, never
/// patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub tabs: Vec<TabInfo>,
    pub search_query: String,
    pub strategy: AutoGroupStrategy,
    pub enable_auto_grouping: bool,
    pub custom_groups: Vec<CustomGroupConfig>,
}

impl Default for PanelState {
    fn default() -> Self {
        PanelState {
            tabs: Vec::new(),
            search_query: String::new(),
            strategy: AutoGroupStrategy::Domain,
            enable_auto_grouping: true,
            custom_groups: Vec::new(),
        }
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_tabs(&self) -> Vec<TabInfo> {
        filter_tabs(&self.tabs, &self.search_query)
    }

    pub fn grouped(&self, clock: &impl Clock) -> GroupedTabs {
        let strategy = effective_strategy(self.enable_auto_grouping, self.strategy);
        group_tabs(&self.visible_tabs(), strategy, &self.custom_groups, clock)
    }

    /// Reload custom groups for a new tab list, pruning ids of closed tabs first
    ///
    /// Pruning is skipped for an empty tab list: that is what the panel sees
    /// before the first tab query answers, and pruning then would empty every group.
    pub async fn refresh<S: StorageBackend, C: Clock>(
        &mut self,
        store: &CustomGroupStore<S, C>,
        tabs: Vec<TabInfo>,
    ) -> Result<(), StorageError> {
        if !tabs.is_empty() {
            let active_ids: Vec<i32> = tabs.iter().map(|tab| tab.id).collect();
            store.cleanup_dead_tabs(&active_ids).await?;
        }
        self.tabs = tabs;
        self.custom_groups = store.list().await?;
        Ok(())
    }

    /// Drop closed tabs locally without waiting for the next tab query
    pub fn forget_tabs(&mut self, closed: &[i32]) {
        self.tabs.retain(|tab| !closed.contains(&tab.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hierarchy::organize_hierarchy;
    use crate::storage::{CUSTOM_GROUPS_KEY, MemoryStorage, save};
    use futures::executor::block_on;

    const T0: f64 = 1_700_000_000_000.0;

    fn create_test_tab(id: i32, url: &str, title: &str) -> TabInfo {
        TabInfo::new(id, url.to_string(), title.to_string())
    }

    fn create_custom_group(id: &str, tab_ids: Vec<i32>, parent: Option<&str>) -> CustomGroupConfig {
        CustomGroupConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#22C55E".to_string(),
            tab_ids,
            is_favorite: false,
            parent_group_id: parent.map(str::to_string),
            created_at: T0,
            last_modified: T0,
        }
    }

    #[test]
    fn test_grouped_applies_search_then_strategy() {
        let clock = ManualClock::new(T0, 14);
        let state = PanelState {
            tabs: vec![
                create_test_tab(1, "https://github.com/rust-lang", "Rust"),
                create_test_tab(2, "https://youtube.com/watch", "Music"),
                create_test_tab(3, "https://github.com/tokio-rs", "Tokio"),
            ],
            search_query: "github".to_string(),
            strategy: AutoGroupStrategy::TimeOfDay,
            ..PanelState::new()
        };

        let groups = state.grouped(&clock);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["auto_Afternoon Tabs"].tab_ids(), vec![1, 3]);
    }

    #[test]
    fn test_disabled_auto_grouping_uses_domain() {
        let clock = ManualClock::new(T0, 14);
        let state = PanelState {
            tabs: vec![create_test_tab(1, "https://github.com/rust-lang", "Rust")],
            strategy: AutoGroupStrategy::TimeOfDay,
            enable_auto_grouping: false,
            ..PanelState::new()
        };

        let groups = state.grouped(&clock);

        assert!(groups.contains_key("auto_GitHub"));
    }

    #[test]
    fn test_refresh_prunes_dead_tabs_and_reloads_groups() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let store = CustomGroupStore::new(&storage, &clock);
        block_on(save(&storage, CUSTOM_GROUPS_KEY, &vec![create_custom_group("g", vec![1, 2], None)])).unwrap();
        let mut state = PanelState::new();

        block_on(state.refresh(&store, vec![create_test_tab(1, "https://a.com", "A")])).unwrap();

        assert_eq!(state.tabs.len(), 1);
        assert_eq!(state.custom_groups[0].tab_ids, vec![1]);
    }

    #[test]
    fn test_refresh_with_no_tabs_keeps_group_membership() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0, 9);
        let store = CustomGroupStore::new(&storage, &clock);
        block_on(save(&storage, CUSTOM_GROUPS_KEY, &vec![create_custom_group("g", vec![1, 2], None)])).unwrap();
        let mut state = PanelState::new();

        block_on(state.refresh(&store, Vec::new())).unwrap();

        assert_eq!(state.custom_groups[0].tab_ids, vec![1, 2]);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_hierarchy_over_panel_groups() {
        let clock = ManualClock::new(T0, 9);
        let state = PanelState {
            tabs: vec![
                create_test_tab(1, "https://a.com", "A"),
                create_test_tab(2, "https://b.com", "B"),
                create_test_tab(3, "https://c.com", "C"),
            ],
            custom_groups: vec![
                create_custom_group("parent", vec![1], None),
                create_custom_group("child", vec![2], Some("parent")),
            ],
            ..PanelState::new()
        };

        let groups = state.grouped(&clock);
        let nested = organize_hierarchy(&groups);

        let top: Vec<&str> = nested.top_level_groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(top, vec!["parent", "auto_C"]);
        assert_eq!(nested.children_of("parent")[0].id, "child");
    }

    #[test]
    fn test_forget_tabs() {
        let mut state = PanelState {
            tabs: vec![
                create_test_tab(1, "https://a.com", "A"),
                create_test_tab(2, "https://b.com", "B"),
            ],
            ..PanelState::new()
        };

        state.forget_tabs(&[1]);

        assert_eq!(state.tabs.len(), 1);
        assert_eq!(state.tabs[0].id, 2);
    }
}
