/// Persisted custom groups and grouping settings
///
/// Every operation reads the whole group list fresh, edits it in memory and
/// writes the whole list back under one key. Nothing is cached between calls.
use std::collections::HashSet;

use uuid::Uuid;

use crate::clock::Clock;
use crate::storage::{
    CUSTOM_GROUPS_KEY, GROUPING_SETTINGS_KEY, StorageBackend, StorageError, load, save,
};
use crate::tab_data::{
    CustomGroupConfig, CustomGroupUpdate, GROUP_COLORS, GroupingSettings, TabGroup,
};

/// Name given to groups saved with a blank name
pub const UNNAMED_GROUP: &str = "Unnamed Group";

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Whether `save_group` created a new group or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

pub struct CustomGroupStore<S, C> {
    backend: S,
    clock: C,
}

impl<S: StorageBackend, C: Clock> CustomGroupStore<S, C> {
    pub fn new(backend: S, clock: C) -> Self {
        CustomGroupStore { backend, clock }
    }

    pub async fn list(&self) -> Result<Vec<CustomGroupConfig>, StorageError> {
        load(&self.backend, CUSTOM_GROUPS_KEY).await
    }

    async fn save_all(&self, groups: &[CustomGroupConfig]) -> Result<(), StorageError> {
        save(&self.backend, CUSTOM_GROUPS_KEY, &groups).await?;
        log::debug!("Saved {} custom groups", groups.len());
        Ok(())
    }

    pub async fn get(&self, group_id: &str) -> Result<Option<CustomGroupConfig>, StorageError> {
        let groups = self.list().await?;
        Ok(groups.into_iter().find(|g| g.id == group_id))
    }

    /// Append a group. Ids are not checked for collisions.
    pub async fn add(&self, group: CustomGroupConfig) -> Result<(), StorageError> {
        let mut groups = self.list().await?;
        groups.push(group);
        self.save_all(&groups).await
    }

    /// Merge `update` into the group and stamp `last_modified`. Returns false if the id is unknown.
    pub async fn update(&self, group_id: &str, update: CustomGroupUpdate) -> Result<bool, StorageError> {
        let mut groups = self.list().await?;
        let now = self.clock.now_ms();

        let Some(group) = groups.iter_mut().find(|g| g.id == group_id) else {
            return Ok(false);
        };
        update.apply(group);
        group.last_modified = now;

        self.save_all(&groups).await?;
        Ok(true)
    }

    /// Remove a group. Its tabs fall back to automatic grouping.
    pub async fn delete(&self, group_id: &str) -> Result<bool, StorageError> {
        let mut groups = self.list().await?;
        let original_len = groups.len();
        groups.retain(|g| g.id != group_id);

        if groups.len() == original_len {
            return Ok(false);
        }
        self.save_all(&groups).await?;
        Ok(true)
    }

    /// Flip the favorite flag, returning the new value (None for an unknown id)
    pub async fn toggle_favorite(&self, group_id: &str) -> Result<Option<bool>, StorageError> {
        let mut groups = self.list().await?;
        let now = self.clock.now_ms();

        let Some(group) = groups.iter_mut().find(|g| g.id == group_id) else {
            return Ok(None);
        };
        group.is_favorite = !group.is_favorite;
        group.last_modified = now;
        let is_favorite = group.is_favorite;

        self.save_all(&groups).await?;
        Ok(Some(is_favorite))
    }

    /// Add a tab id unless the group already lists it
    pub async fn add_tab_to_group(&self, group_id: &str, tab_id: i32) -> Result<bool, StorageError> {
        let mut groups = self.list().await?;
        let now = self.clock.now_ms();

        match groups.iter_mut().find(|g| g.id == group_id) {
            Some(group) if !group.tab_ids.contains(&tab_id) => {
                group.tab_ids.push(tab_id);
                group.last_modified = now;
            }
            _ => return Ok(false),
        }

        self.save_all(&groups).await?;
        Ok(true)
    }

    pub async fn remove_tab_from_group(&self, group_id: &str, tab_id: i32) -> Result<bool, StorageError> {
        let mut groups = self.list().await?;
        let now = self.clock.now_ms();

        let Some(group) = groups.iter_mut().find(|g| g.id == group_id) else {
            return Ok(false);
        };
        group.tab_ids.retain(|&id| id != tab_id);
        group.last_modified = now;

        self.save_all(&groups).await?;
        Ok(true)
    }

    /// Detach a tab from every group, then attach it to `target` if given
    ///
    /// Afterwards at most one group lists the tab. Writes once, and only when
    /// something changed.
    pub async fn move_tab_to_group(&self, tab_id: i32, target: Option<&str>) -> Result<(), StorageError> {
        let mut groups = self.list().await?;
        let now = self.clock.now_ms();
        let mut changed = false;

        for group in groups.iter_mut() {
            let mut next: Vec<i32> = group.tab_ids.iter().copied().filter(|&id| id != tab_id).collect();
            if target == Some(group.id.as_str()) {
                next.push(tab_id);
            }
            if next != group.tab_ids {
                group.tab_ids = next;
                group.last_modified = now;
                changed = true;
            }
        }

        if changed {
            self.save_all(&groups).await?;
        }
        Ok(())
    }

    /// Drop ids of tabs that are no longer open. Returns true if anything was written.
    pub async fn cleanup_dead_tabs(&self, active_tab_ids: &[i32]) -> Result<bool, StorageError> {
        let active: HashSet<i32> = active_tab_ids.iter().copied().collect();
        let mut groups = self.list().await?;
        let mut removed = 0;

        for group in groups.iter_mut() {
            let before = group.tab_ids.len();
            group.tab_ids.retain(|id| active.contains(id));
            removed += before - group.tab_ids.len();
        }

        if removed == 0 {
            return Ok(false);
        }

        log::debug!("Removed {} dead tab references from custom groups", removed);
        self.save_all(&groups).await?;
        Ok(true)
    }

    /// Save from the group dialog: replace the group if its id exists, else append it
    pub async fn save_group(&self, mut group: CustomGroupConfig) -> Result<SaveOutcome, StorageError> {
        group.name = normalize_group_name(&group.name);
        if group.parent_group_id.as_deref() == Some(group.id.as_str()) {
            group.parent_group_id = None;
        }

        let mut groups = self.list().await?;
        let now = self.clock.now_ms();

        let outcome = match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => {
                CustomGroupUpdate::from(group).apply(existing);
                existing.last_modified = now;
                SaveOutcome::Updated
            }
            None => {
                groups.push(group);
                SaveOutcome::Created
            }
        };

        self.save_all(&groups).await?;
        Ok(outcome)
    }

    /// Fresh group for the create dialog
    pub fn new_group(&self, name: &str, color: &str, tab_ids: Vec<i32>, parent_group_id: Option<String>) -> CustomGroupConfig {
        let now = self.clock.now_ms();
        CustomGroupConfig {
            id: self.generate_group_id(),
            name: normalize_group_name(name),
            color: color.to_string(),
            tab_ids: dedup_tab_ids(tab_ids),
            is_favorite: false,
            parent_group_id,
            created_at: now,
            last_modified: now,
        }
    }

    /// Draft a custom group from a rendered group, keeping its name and current tabs
    pub fn convert_to_custom(&self, group: &TabGroup) -> CustomGroupConfig {
        let now = self.clock.now_ms();
        CustomGroupConfig {
            id: self.generate_group_id(),
            name: group.domain.clone(),
            color: random_group_color().to_string(),
            tab_ids: dedup_tab_ids(group.tab_ids()),
            is_favorite: false,
            parent_group_id: None,
            created_at: now,
            last_modified: now,
        }
    }

    /// `group_<millis>_<9 base36 chars>`. Collisions are possible but negligible.
    pub fn generate_group_id(&self) -> String {
        let mut entropy = Uuid::new_v4().as_u128();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| {
                let digit = (entropy % 36) as usize;
                entropy /= 36;
                BASE36[digit] as char
            })
            .collect();
        format!("group_{}_{}", self.clock.now_ms() as u64, suffix)
    }

    pub async fn get_grouping_settings(&self) -> Result<GroupingSettings, StorageError> {
        load(&self.backend, GROUPING_SETTINGS_KEY).await
    }

    pub async fn save_grouping_settings(&self, settings: &GroupingSettings) -> Result<(), StorageError> {
        save(&self.backend, GROUPING_SETTINGS_KEY, settings).await
    }
}

/// Trimmed name, or `Unnamed Group` when blank
pub fn normalize_group_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNNAMED_GROUP.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Random palette color
pub fn random_group_color() -> &'static str {
    let index = (Uuid::new_v4().as_u128() % GROUP_COLORS.len() as u128) as usize;
    GROUP_COLORS[index]
}

fn dedup_tab_ids(tab_ids: Vec<i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    tab_ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
