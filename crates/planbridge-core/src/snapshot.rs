//! The full data set exchanged with the application's state layer

use serde::{Deserialize, Serialize};

use crate::codec::Record;
use crate::entity::{
    BoardColumn, BoardLayout, BucketlistItem, Goal, ImportantDate, Project, Sprint, Story,
    Tradition, Vision,
};
use crate::settings::Settings;
use crate::validate::Validate;

/// The eight importable collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Collections {
    pub stories: Vec<Story>,
    pub goals: Vec<Goal>,
    pub projects: Vec<Project>,
    pub visions: Vec<Vision>,
    pub bucketlist: Vec<BucketlistItem>,
    pub important_dates: Vec<ImportantDate>,
    pub traditions: Vec<Tradition>,
    pub sprints: Vec<Sprint>,
}

impl Collections {
    /// Total number of entities across all collections
    pub fn total(&self) -> usize {
        self.stories.len()
            + self.goals.len()
            + self.projects.len()
            + self.visions.len()
            + self.bucketlist.len()
            + self.important_dates.len()
            + self.traditions.len()
            + self.sprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A record kind stored as one of the [`Collections`]
pub trait Collected: Record + Validate + Clone + for<'de> Deserialize<'de> {
    /// JSON key of the collection in backups
    const FIELD: &'static str;

    fn of(collections: &Collections) -> &Vec<Self>;

    fn of_mut(collections: &mut Collections) -> &mut Vec<Self>;
}

macro_rules! collected {
    ($ty:ty, $field:ident, $key:literal) => {
        impl Collected for $ty {
            const FIELD: &'static str = $key;

            fn of(collections: &Collections) -> &Vec<Self> {
                &collections.$field
            }

            fn of_mut(collections: &mut Collections) -> &mut Vec<Self> {
                &mut collections.$field
            }
        }
    };
}

collected!(Story, stories, "stories");
collected!(Goal, goals, "goals");
collected!(Project, projects, "projects");
collected!(Vision, visions, "visions");
collected!(BucketlistItem, bucketlist, "bucketlist");
collected!(ImportantDate, important_dates, "importantDates");
collected!(Tradition, traditions, "traditions");
collected!(Sprint, sprints, "sprints");

/// Everything the application persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub collections: Collections,
    /// Board columns; never selected for import
    #[serde(default)]
    pub board_columns: Vec<BoardColumn>,
    /// Board layouts; never selected for import
    #[serde(default)]
    pub board_layouts: Vec<BoardLayout>,
    #[serde(default)]
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{sample_goal, sample_story};

    #[test]
    fn test_collection_accessors() {
        let mut collections = Collections::default();
        Story::of_mut(&mut collections).push(sample_story("A"));
        Goal::of_mut(&mut collections).push(sample_goal("B"));

        assert_eq!(Story::of(&collections).len(), 1);
        assert_eq!(collections.total(), 2);
        assert_eq!(ImportantDate::FIELD, "importantDates");
    }

    #[test]
    fn test_snapshot_json_is_flat() {
        let mut snapshot = Snapshot::default();
        snapshot.collections.stories.push(sample_story("A"));

        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value["stories"].is_array());
        assert!(value["importantDates"].is_array());
        assert!(value["boardColumns"].is_array());
        assert!(value.get("collections").is_none());

        let back: Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }
}
