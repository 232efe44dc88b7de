//! Domain records exchanged with the planning application
//!
//! These are plain values. The application's state layer owns them; this
//! crate only converts and recombines them. JSON field names are camelCase to
//! match the backup file and the remote store's header row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declare a closed string choice with `as_str`, `Display` and a
/// case-insensitive `FromStr`.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Wire spelling
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("unrecognized {}: '{}'", stringify!($name), s))
            }
        }
    };
}

choice_enum! {
    /// Story urgency
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
    default Medium
}

choice_enum! {
    /// Board column a story sits in
    pub enum StoryStatus {
        Icebox => "icebox",
        Backlog => "backlog",
        Todo => "todo",
        Progress => "progress",
        Review => "review",
        Done => "done",
    }
    default Backlog
}

choice_enum! {
    /// Goal lifecycle
    pub enum GoalStatus {
        NotStarted => "notStarted",
        InProgress => "inProgress",
        Completed => "completed",
        Archived => "archived",
    }
    default NotStarted
}

choice_enum! {
    /// Project lifecycle
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "onHold",
        Completed => "completed",
    }
    default Planning
}

choice_enum! {
    /// Sprint lifecycle
    pub enum SprintStatus {
        Planned => "planned",
        Active => "active",
        Closed => "closed",
    }
    default Planned
}

choice_enum! {
    /// Colour scheme
    pub enum Theme {
        Light => "light",
        Dark => "dark",
        System => "system",
    }
    default System
}

/// One checkbox inside a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// A unit of work on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<String>,
    pub weight: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: StoryStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Something the user wants to achieve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bounded body of work serving a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A long-range aspiration goals roll up into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vision {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketlistItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

/// Birthday, anniversary or other calendar date worth remembering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantDate {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub recurring: bool,
    pub reminder_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tradition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradition_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A time box of stories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub story_ids: Vec<String>,
    #[serde(default)]
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
}

/// Life role a story is filed under ("Parent", "Engineer")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Board column layout. Travels only inside snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: String,
    pub title: String,
    pub status: StoryStatus,
    #[serde(default)]
    pub order: i64,
}

/// Saved board arrangement. Travels only inside snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardLayout {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(
            "inprogress".parse::<GoalStatus>().unwrap(),
            GoalStatus::InProgress
        );
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_choice_serde_spelling() {
        let json = serde_json::to_string(&ProjectStatus::OnHold).unwrap();
        assert_eq!(json, "\"onHold\"");
        assert_eq!(StoryStatus::default(), StoryStatus::Backlog);
        assert_eq!(Theme::System.to_string(), "system");
    }

    #[test]
    fn test_story_json_is_camel_case() {
        let story = Story {
            id: "s1".to_string(),
            title: "Plan trip".to_string(),
            description: String::new(),
            goal_id: Some("g1".to_string()),
            vision_id: None,
            project_id: None,
            role_id: None,
            sprint_id: None,
            weight: 3,
            size: None,
            priority: Priority::High,
            status: StoryStatus::Todo,
            labels: vec![],
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            checklist: vec![],
            order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&story).unwrap();
        assert_eq!(value["goalId"], "g1");
        assert_eq!(value["dueDate"], "2024-05-01");
        assert!(value.get("visionId").is_none());
    }
}
