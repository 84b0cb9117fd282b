/// Grouping engine: partitions tabs into custom and automatic groups
use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::clock::Clock;
use crate::domain::{OTHER_GROUP, capitalize, domain_group_name, parse_url, prettify_domain};
use crate::tab_data::{AutoGroupStrategy, CustomGroupConfig, GroupType, TabGroup, TabInfo};

/// Groups keyed by id, in display order
pub type GroupedTabs = IndexMap<String, TabGroup>;

/// Prefix shared by every automatic group id
pub const AUTO_GROUP_PREFIX: &str = "auto_";

const CONTENT_KEYWORDS: [&str; 6] = ["docs", "github", "youtube", "reddit", "stackoverflow", "medium"];
const DEVELOPMENT_MARKERS: [&str; 3] = ["/dev", "/api", "developer"];
const READING_MARKERS: [&str; 3] = ["blog", "article", "post"];

/// Activity categories, checked in declaration order
const ACTIVITY_PATTERNS: [(&str, &[&str]); 5] = [
    (
        "Work",
        &["docs", "drive", "mail", "calendar", "slack", "teams", "zoom", "notion", "trello", "asana"],
    ),
    ("Social", &["facebook", "twitter", "instagram", "linkedin", "reddit", "tiktok"]),
    ("Entertainment", &["youtube", "netflix", "spotify", "twitch", "hulu", "prime"]),
    ("Shopping", &["amazon", "ebay", "shop", "store", "cart"]),
    ("Development", &["github", "stackoverflow", "gitlab", "codepen", "replit", "dev.to"]),
];

/// Project key used for tabs whose URL does not parse
const PROJECT_OTHER_KEY: &str = "other";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static pattern"));

/// Group tabs for display
///
/// Algorithm:
/// 1. Every custom group (in store order) claims the open tabs listed in its
///    `tab_ids`; the first group to list a tab wins it. Custom groups with no
///    open tabs are skipped.
/// 2. Unclaimed tabs are grouped by `strategy`.
/// 3. Favorites sort first, then larger groups. The sort is stable, so equal
///    groups keep insertion order.
pub fn group_tabs(
    tabs: &[TabInfo],
    strategy: AutoGroupStrategy,
    custom_groups: &[CustomGroupConfig],
    clock: &impl Clock,
) -> GroupedTabs {
    let mut groups = GroupedTabs::new();
    let mut claimed: HashSet<i32> = HashSet::new();

    for custom in custom_groups {
        let members: Vec<TabInfo> = tabs
            .iter()
            .filter(|tab| !claimed.contains(&tab.id) && custom.tab_ids.contains(&tab.id))
            .cloned()
            .collect();

        if members.is_empty() {
            continue;
        }

        claimed.extend(members.iter().map(|tab| tab.id));
        let group = custom_tab_group(custom, members);
        groups.insert(group.id.clone(), group);
    }

    let remaining: Vec<&TabInfo> = tabs.iter().filter(|tab| !claimed.contains(&tab.id)).collect();
    let now = clock.now_ms();

    let buckets = match strategy {
        AutoGroupStrategy::Domain => group_by_domain(&remaining),
        AutoGroupStrategy::ContentSimilarity => group_by_content_similarity(&remaining),
        AutoGroupStrategy::TimeOfDay => group_by_time_of_day(&remaining, clock.local_hour()),
        AutoGroupStrategy::ActivityPattern => group_by_activity_pattern(&remaining),
        AutoGroupStrategy::ProjectContext => group_by_project_context(&remaining),
    };

    for bucket in buckets {
        let mut group = bucket.into_group(strategy, now);
        group.id = unused_group_id(&groups, group.id);
        groups.insert(group.id.clone(), group);
    }

    sort_groups(&mut groups);
    log::debug!(
        "Grouped {} tabs into {} groups ({} custom) by {}",
        tabs.len(),
        groups.len(),
        groups.values().filter(|g| g.is_custom()).count(),
        strategy
    );
    groups
}

/// `id`, or `id_2`, `id_3`, ... when a group already holds it
///
/// Custom ids are free-form and project keys sanitise lossily, so an automatic
/// bucket can arrive under an id already in use.
fn unused_group_id(groups: &GroupedTabs, id: String) -> String {
    if !groups.contains_key(&id) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", id, n);
        if !groups.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Favorites first, then by descending tab count
pub fn sort_groups(groups: &mut GroupedTabs) {
    groups.sort_by(|_, a, _, b| {
        b.is_favorite
            .cmp(&a.is_favorite)
            .then_with(|| b.tabs.len().cmp(&a.tabs.len()))
    });
}

/// Case-insensitive substring match against title or URL. An empty query keeps every tab.
pub fn filter_tabs(tabs: &[TabInfo], query: &str) -> Vec<TabInfo> {
    if query.is_empty() {
        return tabs.to_vec();
    }

    let query = query.to_lowercase();
    tabs.iter()
        .filter(|tab| {
            tab.title.to_lowercase().contains(&query) || tab.url.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Strategy to run given the auto-grouping toggle
pub fn effective_strategy(enable_auto_grouping: bool, selected: AutoGroupStrategy) -> AutoGroupStrategy {
    if enable_auto_grouping {
        selected
    } else {
        AutoGroupStrategy::Domain
    }
}

fn custom_tab_group(custom: &CustomGroupConfig, members: Vec<TabInfo>) -> TabGroup {
    TabGroup {
        id: custom.id.clone(),
        domain: custom.name.clone(),
        favicon: members.first().and_then(|tab| tab.fav_icon_url.clone()),
        tabs: members,
        group_type: GroupType::Custom,
        custom_name: Some(custom.name.clone()),
        color: Some(custom.color.clone()),
        is_favorite: custom.is_favorite,
        parent_group_id: custom.parent_group_id.clone(),
        auto_group_strategy: None,
        created_at: Some(custom.created_at),
        last_modified: Some(custom.last_modified),
    }
}

/// Tabs collected under one automatic group before it becomes a `TabGroup`
struct Bucket<'a> {
    id: String,
    name: String,
    tabs: Vec<&'a TabInfo>,
    with_favicon: bool,
}

impl<'a> Bucket<'a> {
    fn into_group(self, strategy: AutoGroupStrategy, now: f64) -> TabGroup {
        let favicon = if self.with_favicon {
            self.tabs.first().and_then(|tab| tab.fav_icon_url.clone())
        } else {
            None
        };

        TabGroup {
            id: self.id,
            domain: self.name,
            tabs: self.tabs.into_iter().cloned().collect(),
            favicon,
            group_type: GroupType::Automatic,
            custom_name: None,
            color: None,
            is_favorite: false,
            parent_group_id: None,
            auto_group_strategy: Some(strategy),
            created_at: Some(now),
            last_modified: None,
        }
    }
}

/// Buckets tabs by a display name, keyed `auto_<name>`, in first-seen order
fn bucket_by_name<'a>(tabs: &[&'a TabInfo], name_of: impl Fn(&TabInfo) -> String) -> Vec<Bucket<'a>> {
    let mut buckets: IndexMap<String, Bucket<'a>> = IndexMap::new();

    for &tab in tabs {
        let name = name_of(tab);
        buckets
            .entry(name.clone())
            .or_insert_with(|| Bucket {
                id: format!("{}{}", AUTO_GROUP_PREFIX, name),
                name,
                tabs: Vec::new(),
                with_favicon: true,
            })
            .tabs
            .push(tab);
    }

    buckets.into_values().collect()
}

fn group_by_domain<'a>(tabs: &[&'a TabInfo]) -> Vec<Bucket<'a>> {
    bucket_by_name(tabs, |tab| domain_group_name(&tab.url))
}

fn group_by_content_similarity<'a>(tabs: &[&'a TabInfo]) -> Vec<Bucket<'a>> {
    bucket_by_name(tabs, |tab| content_group_name(&tab.url, &tab.title))
}

fn group_by_time_of_day<'a>(tabs: &[&'a TabInfo], hour: u32) -> Vec<Bucket<'a>> {
    if tabs.is_empty() {
        return Vec::new();
    }

    let name = time_of_day_group_name(hour).to_string();
    vec![Bucket {
        id: format!("{}{}", AUTO_GROUP_PREFIX, name),
        name,
        tabs: tabs.to_vec(),
        with_favicon: false,
    }]
}

fn group_by_activity_pattern<'a>(tabs: &[&'a TabInfo]) -> Vec<Bucket<'a>> {
    bucket_by_name(tabs, |tab| activity_group_name(&tab.url))
}

fn group_by_project_context<'a>(tabs: &[&'a TabInfo]) -> Vec<Bucket<'a>> {
    let mut projects: IndexMap<String, Vec<&'a TabInfo>> = IndexMap::new();

    for &tab in tabs {
        let key = project_key(&tab.url).unwrap_or_else(|| PROJECT_OTHER_KEY.to_string());
        projects.entry(key).or_default().push(tab);
    }

    projects
        .into_iter()
        .map(|(key, tabs)| {
            let name = project_group_name(&key);
            Bucket {
                id: format!(
                    "{}{}_{}",
                    AUTO_GROUP_PREFIX,
                    name,
                    NON_ALPHANUMERIC.replace_all(&key, "_")
                ),
                name,
                tabs,
                with_favicon: true,
            }
        })
        .collect()
}

/// Keyword bucket for the content-similarity strategy
///
/// The first keyword found in the URL or title names the group; development
/// and reading markers in the URL then override it unconditionally, reading last.
pub fn content_group_name(url: &str, title: &str) -> String {
    let url = url.to_lowercase();
    let title = title.to_lowercase();

    let mut name = CONTENT_KEYWORDS
        .iter()
        .find(|keyword| url.contains(*keyword) || title.contains(*keyword))
        .map(|keyword| capitalize(keyword))
        .unwrap_or_else(|| OTHER_GROUP.to_string());

    if DEVELOPMENT_MARKERS.iter().any(|marker| url.contains(marker)) {
        name = "Development".to_string();
    }
    if READING_MARKERS.iter().any(|marker| url.contains(marker)) {
        name = "Reading".to_string();
    }

    name
}

/// Period name for an hour of the day
pub fn time_of_day_group_name(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Morning Tabs",
        12..=16 => "Afternoon Tabs",
        17..=20 => "Evening Tabs",
        _ => "Night Tabs",
    }
}

/// Activity category for a URL, `Other` when no keyword matches
pub fn activity_group_name(url: &str) -> String {
    let url = url.to_lowercase();
    ACTIVITY_PATTERNS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| url.contains(keyword)))
        .map(|(category, _)| category.to_string())
        .unwrap_or_else(|| OTHER_GROUP.to_string())
}

/// Hostname plus first path segment, or hostname alone. None when the URL does not parse.
pub fn project_key(raw: &str) -> Option<String> {
    let url = parse_url(raw)?;
    let host = url.host_str().unwrap_or("");

    match url.path().split('/').find(|segment| !segment.is_empty()) {
        Some(segment) => Some(format!("{}/{}", host, segment)),
        None => Some(host.to_string()),
    }
}

fn project_group_name(key: &str) -> String {
    if key == PROJECT_OTHER_KEY {
        return OTHER_GROUP.to_string();
    }
    let host = key.split('/').next().unwrap_or(key);
    prettify_domain(host)
}
