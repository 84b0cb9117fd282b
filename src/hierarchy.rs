/// Splits grouped tabs into top-level groups and their direct children
use indexmap::IndexMap;
use serde::Serialize;

use crate::grouping::GroupedTabs;
use crate::tab_data::{CustomGroupConfig, TabGroup};

/// One level of nesting over a grouping pass
///
/// Children are resolved only one level deep. A group whose parent is itself a
/// child, or whose parent is not in this pass, sits in `child_groups` under an
/// id that no top-level group carries and is not reachable from the top level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHierarchy<'a> {
    pub top_level_groups: Vec<&'a TabGroup>,
    pub child_groups: IndexMap<String, Vec<&'a TabGroup>>,
}

impl<'a> GroupHierarchy<'a> {
    /// Direct children of a group, in display order
    pub fn children_of(&self, group_id: &str) -> &[&'a TabGroup] {
        self.child_groups
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Top-level groups followed by their children, as the side panel walks them
    pub fn render_order(&self) -> Vec<&'a TabGroup> {
        self.top_level_groups
            .iter()
            .flat_map(|group| std::iter::once(*group).chain(self.children_of(&group.id).iter().copied()))
            .collect()
    }
}

/// Partition groups by `parent_group_id`, keeping the engine's order in both halves
pub fn organize_hierarchy(groups: &GroupedTabs) -> GroupHierarchy<'_> {
    let mut top_level_groups = Vec::new();
    let mut child_groups: IndexMap<String, Vec<&TabGroup>> = IndexMap::new();

    for group in groups.values() {
        match &group.parent_group_id {
            Some(parent_id) => child_groups.entry(parent_id.clone()).or_default().push(group),
            None => top_level_groups.push(group),
        }
    }

    GroupHierarchy {
        top_level_groups,
        child_groups,
    }
}

/// Groups offered as a parent when editing `editing_id`
///
/// Excludes the group itself and its direct children, so an edit can never
/// make a group its own parent or swap parent and child.
pub fn parent_candidates<'a>(
    groups: &'a [CustomGroupConfig],
    editing_id: Option<&str>,
) -> Vec<&'a CustomGroupConfig> {
    match editing_id {
        Some(id) => groups
            .iter()
            .filter(|g| g.id != id && g.parent_group_id.as_deref() != Some(id))
            .collect(),
        None => groups.iter().collect(),
    }
}
