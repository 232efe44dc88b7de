//! Application settings, assembled from named fragments
//!
//! Settings are never merged field by field. An import either replaces the
//! whole object or leaves it alone, so the only composition that happens is
//! here, when defaults are built.

use serde::{Deserialize, Serialize};

use crate::entity::{Label, Role, Theme};

/// Version written into every settings object this crate produces
pub const SETTINGS_VERSION: i64 = 1;

/// Look and feel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub theme: Theme,
    pub accent_color: String,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            accent_color: "#4f46e5".to_string(),
        }
    }
}

/// Defaults applied when planning new work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningDefaults {
    /// 0 = Sunday, 1 = Monday, ...
    pub week_start_day: i64,
    pub sprint_length_days: i64,
    pub default_story_weight: i64,
    pub show_completed: bool,
}

impl Default for PlanningDefaults {
    fn default() -> Self {
        Self {
            week_start_day: 1,
            sprint_length_days: 14,
            default_story_weight: 1,
            show_completed: false,
        }
    }
}

/// User-defined vocabularies stories are tagged with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub story_sizes: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            story_sizes: ["XS", "S", "M", "L", "XL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            roles: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl Taxonomy {
    /// Default sizes plus a small set of roles for a fresh install
    pub fn starter() -> Self {
        let roles = ["Personal", "Work", "Family"]
            .iter()
            .enumerate()
            .map(|(i, name)| Role {
                id: format!("role-{}", name.to_lowercase()),
                name: name.to_string(),
                color: None,
                order: i as i64,
            })
            .collect();

        Self {
            roles,
            ..Self::default()
        }
    }
}

/// Versioned settings object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: i64,
    pub appearance: Appearance,
    pub planning: PlanningDefaults,
    pub taxonomy: Taxonomy,
}

impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::new().build()
    }
}

impl Settings {
    /// Start a builder from the default fragments
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }
}

/// Builder for [`Settings`]
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    appearance: Appearance,
    planning: PlanningDefaults,
    taxonomy: Taxonomy,
}

impl SettingsBuilder {
    /// Create a builder holding the default fragments
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn planning(mut self, planning: PlanningDefaults) -> Self {
        self.planning = planning;
        self
    }

    pub fn taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.appearance.theme = theme;
        self
    }

    pub fn roles(mut self, roles: Vec<Role>) -> Self {
        self.taxonomy.roles = roles;
        self
    }

    pub fn labels(mut self, labels: Vec<Label>) -> Self {
        self.taxonomy.labels = labels;
        self
    }

    /// Finish, stamping the current settings version
    pub fn build(self) -> Settings {
        Settings {
            version: SETTINGS_VERSION,
            appearance: self.appearance,
            planning: self.planning,
            taxonomy: self.taxonomy,
        }
    }
}
