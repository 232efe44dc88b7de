//! Row codec: typed entities to and from untyped rows of cells
//!
//! Encoding writes every field into the cell its schema column names.
//! Decoding reads cells by column key, through either a positional row or a
//! named row, and runs each through the coercer for the field's type. It
//! never fails: short rows, bad numbers and broken JSON all resolve to the
//! documented defaults.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::coerce;
use crate::entity::{
    BucketlistItem, Goal, ImportantDate, Label, Project, Role, Sprint, Story, Tradition, Vision,
};
use crate::schema::{EntityKind, Schema};
use crate::settings::{Appearance, PlanningDefaults, Settings, Taxonomy, SETTINGS_VERSION};

/// An ordered sequence of raw cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<String>,
}

impl Row {
    /// Create a row from cells
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Cell at `index`, or empty when the row is shorter
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell is blank
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Self::new(cells)
    }
}

/// Cells keyed by column key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedRow {
    fields: HashMap<String, String>,
}

impl NamedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip cells against a positional mapping.
    ///
    /// Cells beyond the mapping, or at positions mapped to `None`, are
    /// dropped. Mapped columns past the end of `cells` stay absent.
    pub fn from_mapping(mapping: &[Option<&str>], cells: Vec<String>) -> Self {
        let fields = mapping
            .iter()
            .zip(cells)
            .filter_map(|(key, cell)| key.map(|k| (k.to_string(), cell)))
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Source<'a> {
    Positional(&'static Schema, &'a Row),
    Named(&'a NamedRow),
}

/// Read-only view that looks cells up by column key and coerces them
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    source: Source<'a>,
}

impl<'a> RowView<'a> {
    /// View a positional row through a schema
    pub fn positional(schema: &'static Schema, row: &'a Row) -> Self {
        Self {
            source: Source::Positional(schema, row),
        }
    }

    /// View a named row
    pub fn named(row: &'a NamedRow) -> Self {
        Self {
            source: Source::Named(row),
        }
    }

    /// The raw cell for `key`; empty when absent
    pub fn raw(&self, key: &str) -> &'a str {
        match self.source {
            Source::Positional(schema, row) => {
                schema.index_of(key).map(|i| row.get(i)).unwrap_or_default()
            }
            Source::Named(row) => row.get(key).unwrap_or_default(),
        }
    }

    /// Untrimmed free text
    pub fn body(&self, key: &str) -> String {
        self.raw(key).to_string()
    }

    pub fn text(&self, key: &str) -> String {
        coerce::text(self.raw(key))
    }

    pub fn optional(&self, key: &str) -> Option<String> {
        coerce::optional(self.raw(key))
    }

    pub fn integer(&self, key: &str, default: i64) -> i64 {
        coerce::integer(self.raw(key), default)
    }

    pub fn flag(&self, key: &str) -> bool {
        coerce::flag(self.raw(key))
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        coerce::delimited(self.raw(key))
    }

    pub fn json_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        coerce::json_list(self.raw(key))
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        coerce::date(self.raw(key))
    }

    pub fn date_or_today(&self, key: &str) -> NaiveDate {
        coerce::date_or_today(self.raw(key))
    }

    pub fn timestamp_or_now(&self, key: &str) -> DateTime<Utc> {
        coerce::timestamp_or_now(self.raw(key))
    }

    pub fn id(&self, key: &str) -> String {
        coerce::id_or_new(self.raw(key))
    }

    pub fn choice<T: FromStr>(&self, key: &str, default: T) -> T {
        coerce::choice(self.raw(key), default)
    }
}

/// Builds a row in schema order from keyed writes
#[derive(Debug)]
pub struct RowWriter {
    schema: &'static Schema,
    cells: Vec<String>,
}

impl RowWriter {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            cells: vec![String::new(); schema.width()],
        }
    }

    fn set(mut self, key: &str, value: String) -> Self {
        match self.schema.index_of(key) {
            Some(index) => self.cells[index] = value,
            None => debug_assert!(false, "column '{}' not in {}", key, self.schema.section),
        }
        self
    }

    pub fn text(self, key: &str, value: &str) -> Self {
        self.set(key, value.to_string())
    }

    pub fn optional(self, key: &str, value: Option<&str>) -> Self {
        self.set(key, coerce::render_optional(value))
    }

    pub fn integer(self, key: &str, value: i64) -> Self {
        self.set(key, value.to_string())
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.set(key, coerce::render_flag(value))
    }

    pub fn list(self, key: &str, values: &[String]) -> Self {
        self.set(key, coerce::render_delimited(values))
    }

    pub fn json<T: Serialize + ?Sized>(self, key: &str, value: &T) -> Self {
        self.set(key, coerce::render_json(value))
    }

    pub fn date(self, key: &str, value: Option<&NaiveDate>) -> Self {
        self.set(key, value.map(coerce::render_date).unwrap_or_default())
    }

    pub fn timestamp(self, key: &str, value: &DateTime<Utc>) -> Self {
        self.set(key, coerce::render_timestamp(value))
    }

    pub fn choice(self, key: &str, value: impl Display) -> Self {
        self.set(key, value.to_string())
    }

    pub fn finish(self) -> Row {
        Row::new(self.cells)
    }
}

/// Normalize free text for identity comparison; case is significant
pub fn normalize_key(s: &str) -> String {
    s.trim().to_string()
}

/// An entity kind with a row layout
pub trait Record: Sized {
    /// Kind tag, used to find the schema and registry entry
    const KIND: EntityKind;

    /// Map every field to its cell, in schema order
    fn encode(&self) -> Row;

    /// Build a best-effort entity from keyed cells
    fn decode_view(view: &RowView<'_>) -> Self;

    /// Identity used by the merge engine to detect duplicates
    fn dedup_key(&self) -> String;

    fn schema() -> &'static Schema {
        Self::KIND.schema()
    }

    /// Decode a positional row
    fn decode(row: &Row) -> Self {
        Self::decode_view(&RowView::positional(Self::KIND.schema(), row))
    }

    /// Decode a named row
    fn decode_named(row: &NamedRow) -> Self {
        Self::decode_view(&RowView::named(row))
    }
}

impl Record for Story {
    const KIND: EntityKind = EntityKind::Story;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .text("description", &self.description)
            .optional("goalId", self.goal_id.as_deref())
            .optional("visionId", self.vision_id.as_deref())
            .optional("projectId", self.project_id.as_deref())
            .optional("roleId", self.role_id.as_deref())
            .optional("sprintId", self.sprint_id.as_deref())
            .integer("weight", self.weight)
            .optional("size", self.size.as_deref())
            .choice("priority", self.priority)
            .choice("status", self.status)
            .list("labels", &self.labels)
            .date("dueDate", self.due_date.as_ref())
            .json("checklist", &self.checklist)
            .integer("order", self.order)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .timestamp("updatedAt", &self.updated_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            description: v.body("description"),
            goal_id: v.optional("goalId"),
            vision_id: v.optional("visionId"),
            project_id: v.optional("projectId"),
            role_id: v.optional("roleId"),
            sprint_id: v.optional("sprintId"),
            weight: v.integer("weight", 1),
            size: v.optional("size"),
            priority: v.choice("priority", Default::default()),
            status: v.choice("status", Default::default()),
            labels: v.list("labels"),
            due_date: v.date("dueDate"),
            checklist: v.json_list("checklist"),
            order: v.integer("order", 0),
            created_at: v.timestamp_or_now("createdAt"),
            updated_at: v.timestamp_or_now("updatedAt"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.title)
    }
}

impl Record for Goal {
    const KIND: EntityKind = EntityKind::Goal;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .text("description", &self.description)
            .optional("visionId", self.vision_id.as_deref())
            .optional("category", self.category.as_deref())
            .choice("status", self.status)
            .date("targetDate", self.target_date.as_ref())
            .integer("order", self.order)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .timestamp("updatedAt", &self.updated_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            description: v.body("description"),
            vision_id: v.optional("visionId"),
            category: v.optional("category"),
            status: v.choice("status", Default::default()),
            target_date: v.date("targetDate"),
            order: v.integer("order", 0),
            created_at: v.timestamp_or_now("createdAt"),
            updated_at: v.timestamp_or_now("updatedAt"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.title)
    }
}

impl Record for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("name", &self.name)
            .text("description", &self.description)
            .optional("goalId", self.goal_id.as_deref())
            .choice("status", self.status)
            .date("startDate", self.start_date.as_ref())
            .date("endDate", self.end_date.as_ref())
            .integer("order", self.order)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .timestamp("updatedAt", &self.updated_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            name: v.text("name"),
            description: v.body("description"),
            goal_id: v.optional("goalId"),
            status: v.choice("status", Default::default()),
            start_date: v.date("startDate"),
            end_date: v.date("endDate"),
            order: v.integer("order", 0),
            created_at: v.timestamp_or_now("createdAt"),
            updated_at: v.timestamp_or_now("updatedAt"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Record for Vision {
    const KIND: EntityKind = EntityKind::Vision;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .text("description", &self.description)
            .optional("category", self.category.as_deref())
            .integer("order", self.order)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .timestamp("updatedAt", &self.updated_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            description: v.body("description"),
            category: v.optional("category"),
            order: v.integer("order", 0),
            created_at: v.timestamp_or_now("createdAt"),
            updated_at: v.timestamp_or_now("updatedAt"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.title)
    }
}

impl Record for BucketlistItem {
    const KIND: EntityKind = EntityKind::BucketlistItem;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .text("description", &self.description)
            .optional("category", self.category.as_deref())
            .optional("location", self.location.as_deref())
            .flag("completed", self.completed)
            .date("completedAt", self.completed_at.as_ref())
            .date("targetDate", self.target_date.as_ref())
            .integer("order", self.order)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            description: v.body("description"),
            category: v.optional("category"),
            location: v.optional("location"),
            completed: v.flag("completed"),
            completed_at: v.date("completedAt"),
            target_date: v.date("targetDate"),
            order: v.integer("order", 0),
            created_at: v.timestamp_or_now("createdAt"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.title)
    }
}

impl Record for ImportantDate {
    const KIND: EntityKind = EntityKind::ImportantDate;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .date("date", Some(&self.date))
            .optional("category", self.category.as_deref())
            .flag("recurring", self.recurring)
            .integer("reminderDays", self.reminder_days)
            .optional("notes", self.notes.as_deref())
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            date: v.date_or_today("date"),
            category: v.optional("category"),
            recurring: v.flag("recurring"),
            reminder_days: v.integer("reminderDays", 7),
            notes: v.optional("notes"),
            created_at: v.timestamp_or_now("createdAt"),
        }
    }

    fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            normalize_key(&self.title),
            coerce::render_date(&self.date)
        )
    }
}

impl Record for Tradition {
    const KIND: EntityKind = EntityKind::Tradition;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("title", &self.title)
            .text("description", &self.description)
            .optional("traditionType", self.tradition_type.as_deref())
            .optional("season", self.season.as_deref())
            .flag("active", self.active)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            title: v.text("title"),
            description: v.body("description"),
            tradition_type: v.optional("traditionType"),
            season: v.optional("season"),
            active: v.flag("active"),
            created_at: v.timestamp_or_now("createdAt"),
        }
    }

    fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            normalize_key(&self.title),
            normalize_key(self.tradition_type.as_deref().unwrap_or_default())
        )
    }
}

impl Record for Sprint {
    const KIND: EntityKind = EntityKind::Sprint;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("name", &self.name)
            .date("startDate", Some(&self.start_date))
            .date("endDate", Some(&self.end_date))
            .optional("goal", self.goal.as_deref())
            .list("storyIds", &self.story_ids)
            .choice("status", self.status)
            .text("id", &self.id)
            .timestamp("createdAt", &self.created_at)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            name: v.text("name"),
            start_date: v.date_or_today("startDate"),
            end_date: v.date_or_today("endDate"),
            goal: v.optional("goal"),
            story_ids: v.list("storyIds"),
            status: v.choice("status", Default::default()),
            created_at: v.timestamp_or_now("createdAt"),
        }
    }

    fn dedup_key(&self) -> String {
        self.id.trim().to_string()
    }
}

impl Record for Role {
    const KIND: EntityKind = EntityKind::Role;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("name", &self.name)
            .optional("color", self.color.as_deref())
            .integer("order", self.order)
            .text("id", &self.id)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            name: v.text("name"),
            color: v.optional("color"),
            order: v.integer("order", 0),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Record for Label {
    const KIND: EntityKind = EntityKind::Label;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .text("name", &self.name)
            .optional("color", self.color.as_deref())
            .text("id", &self.id)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        Self {
            id: v.id("id"),
            name: v.text("name"),
            color: v.optional("color"),
        }
    }

    fn dedup_key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Record for Settings {
    const KIND: EntityKind = EntityKind::Settings;

    fn encode(&self) -> Row {
        RowWriter::new(Self::schema())
            .integer("version", self.version)
            .choice("theme", self.appearance.theme)
            .text("accentColor", &self.appearance.accent_color)
            .integer("weekStartDay", self.planning.week_start_day)
            .integer("sprintLengthDays", self.planning.sprint_length_days)
            .integer("defaultStoryWeight", self.planning.default_story_weight)
            .flag("showCompleted", self.planning.show_completed)
            .list("storySizes", &self.taxonomy.story_sizes)
            .json("roles", &self.taxonomy.roles)
            .json("labels", &self.taxonomy.labels)
            .finish()
    }

    fn decode_view(v: &RowView<'_>) -> Self {
        let defaults = PlanningDefaults::default();
        Settings {
            version: v.integer("version", SETTINGS_VERSION),
            appearance: Appearance {
                theme: v.choice("theme", Default::default()),
                accent_color: v
                    .optional("accentColor")
                    .unwrap_or_else(|| Appearance::default().accent_color),
            },
            planning: PlanningDefaults {
                week_start_day: v.integer("weekStartDay", defaults.week_start_day),
                sprint_length_days: v.integer("sprintLengthDays", defaults.sprint_length_days),
                default_story_weight: v
                    .integer("defaultStoryWeight", defaults.default_story_weight),
                show_completed: v.flag("showCompleted"),
            },
            taxonomy: Taxonomy {
                story_sizes: v.list("storySizes"),
                roles: v.json_list("roles"),
                labels: v.json_list("labels"),
            },
        }
    }

    fn dedup_key(&self) -> String {
        "settings".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entity::{
        ChecklistItem, GoalStatus, Priority, ProjectStatus, SprintStatus, StoryStatus, Theme,
    };

    pub(crate) fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn sample_story(title: &str) -> Story {
        Story {
            id: format!("story-{}", normalize_key(title).replace(' ', "-")),
            title: title.to_string(),
            description: "Line one, with \"quotes\"".to_string(),
            goal_id: Some("goal-1".to_string()),
            vision_id: None,
            project_id: Some("project-1".to_string()),
            role_id: None,
            sprint_id: None,
            weight: 5,
            size: Some("M".to_string()),
            priority: Priority::High,
            status: StoryStatus::Progress,
            labels: vec!["label-a".to_string(), "label-b".to_string()],
            due_date: Some(day(2024, 6, 30)),
            checklist: vec![ChecklistItem {
                id: "c1".to_string(),
                text: "Book, flights".to_string(),
                done: true,
            }],
            order: 2,
            created_at: ts("2024-01-02T03:04:05.123Z"),
            updated_at: ts("2024-02-02T03:04:05Z"),
        }
    }

    pub(crate) fn sample_goal(title: &str) -> Goal {
        Goal {
            id: format!("goal-{}", normalize_key(title)),
            title: title.to_string(),
            description: String::new(),
            vision_id: Some("vision-1".to_string()),
            category: Some("Health".to_string()),
            status: GoalStatus::InProgress,
            target_date: Some(day(2024, 12, 31)),
            order: 1,
            created_at: ts("2024-01-01T00:00:00Z"),
            updated_at: ts("2024-01-05T00:00:00Z"),
        }
    }

    pub(crate) fn sample_sprint(id: &str) -> Sprint {
        Sprint {
            id: id.to_string(),
            name: format!("Sprint {}", id),
            start_date: day(2024, 3, 4),
            end_date: day(2024, 3, 17),
            goal: Some("Ship it".to_string()),
            story_ids: vec!["s1".to_string(), "s2".to_string()],
            status: SprintStatus::Active,
            created_at: ts("2024-03-01T09:00:00Z"),
        }
    }

    fn round_trip<T: Record + PartialEq + std::fmt::Debug>(entity: &T) {
        let row = entity.encode();
        assert_eq!(row.len(), T::schema().width());
        assert_eq!(&T::decode(&row), entity);

        let named = NamedRow::from_mapping(&T::schema().default_mapping(), row.cells);
        assert_eq!(&T::decode_named(&named), entity);
    }

    #[test]
    fn test_round_trip_every_kind() {
        round_trip(&sample_story("Plan trip"));
        round_trip(&sample_goal("Run a marathon"));
        round_trip(&Project {
            id: "p1".to_string(),
            name: "Kitchen remodel".to_string(),
            description: "Cabinets\nand counters".to_string(),
            goal_id: None,
            status: ProjectStatus::OnHold,
            start_date: Some(day(2024, 4, 1)),
            end_date: None,
            order: 0,
            created_at: ts("2024-01-01T00:00:00Z"),
            updated_at: ts("2024-01-01T00:00:00Z"),
        });
        round_trip(&Vision {
            id: "v1".to_string(),
            title: "Healthy family".to_string(),
            description: String::new(),
            category: None,
            order: 3,
            created_at: ts("2024-01-01T00:00:00Z"),
            updated_at: ts("2024-01-01T00:00:00Z"),
        });
        round_trip(&BucketlistItem {
            id: "b1".to_string(),
            title: "See the aurora".to_string(),
            description: String::new(),
            category: Some("Travel".to_string()),
            location: Some("Tromsø".to_string()),
            completed: true,
            completed_at: Some(day(2023, 2, 14)),
            target_date: None,
            order: 0,
            created_at: ts("2022-01-01T00:00:00Z"),
        });
        round_trip(&ImportantDate {
            id: "d1".to_string(),
            title: "Mom's birthday".to_string(),
            date: day(1960, 8, 9),
            category: Some("Birthday".to_string()),
            recurring: true,
            reminder_days: 14,
            notes: None,
            created_at: ts("2024-01-01T00:00:00Z"),
        });
        round_trip(&Tradition {
            id: "t1".to_string(),
            title: "Pancake Sunday".to_string(),
            description: "Every week".to_string(),
            tradition_type: Some("weekly".to_string()),
            season: None,
            active: true,
            created_at: ts("2024-01-01T00:00:00Z"),
        });
        round_trip(&sample_sprint("sp-1"));
        round_trip(&Role {
            id: "r1".to_string(),
            name: "Parent".to_string(),
            color: Some("#ff0000".to_string()),
            order: 1,
        });
        round_trip(&Label {
            id: "l1".to_string(),
            name: "errand".to_string(),
            color: None,
        });
        round_trip(
            &Settings::builder()
                .theme(Theme::Dark)
                .taxonomy(Taxonomy::starter())
                .labels(vec![Label {
                    id: "l1".to_string(),
                    name: "errand".to_string(),
                    color: None,
                }])
                .build(),
        );
    }

    #[test]
    fn test_encode_cell_shapes() {
        let row = sample_story("Plan trip").encode();
        let schema = Story::schema();
        let cell = |key: &str| row.get(schema.index_of(key).unwrap()).to_string();

        assert_eq!(cell("labels"), "label-a;label-b");
        assert_eq!(cell("visionId"), "");
        assert_eq!(cell("dueDate"), "2024-06-30");
        assert_eq!(cell("priority"), "high");
        assert!(cell("checklist").starts_with("[{"));

        let bucket = BucketlistItem::decode(&Row::new(vec!["x".to_string()]));
        let row = bucket.encode();
        assert_eq!(row.get(BucketlistItem::schema().index_of("completed").unwrap()), "false");
    }

    #[test]
    fn test_ragged_row_uses_defaults() {
        let story = Story::decode(&Row::new(vec!["Only a title".to_string()]));
        assert_eq!(story.title, "Only a title");
        assert_eq!(story.weight, 1);
        assert_eq!(story.order, 0);
        assert_eq!(story.priority, Priority::Medium);
        assert_eq!(story.status, StoryStatus::Backlog);
        assert!(story.labels.is_empty());
        assert!(story.checklist.is_empty());
        assert_eq!(story.goal_id, None);
        assert!(!story.id.is_empty());

        let date = ImportantDate::decode(&Row::default());
        assert_eq!(date.reminder_days, 7);
        assert_eq!(date.date, Utc::now().date_naive());
        assert!(!date.recurring);

        let settings = Settings::decode(&Row::default());
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.planning, PlanningDefaults::default());
        assert_eq!(settings.appearance, Appearance::default());
    }

    #[test]
    fn test_malformed_cells_fall_back() {
        let mut row = sample_story("Plan trip").encode();
        let schema = Story::schema();
        row.cells[schema.index_of("weight").unwrap()] = "heavy".to_string();
        row.cells[schema.index_of("checklist").unwrap()] = "[{broken".to_string();
        row.cells[schema.index_of("priority").unwrap()] = "whenever".to_string();
        row.cells[schema.index_of("dueDate").unwrap()] = "someday".to_string();
        row.cells[schema.index_of("goalId").unwrap()] = "   ".to_string();

        let story = Story::decode(&row);
        assert_eq!(story.weight, 1);
        assert!(story.checklist.is_empty());
        assert_eq!(story.priority, Priority::Medium);
        assert_eq!(story.due_date, None);
        assert_eq!(story.goal_id, None);
        assert_eq!(story.title, "Plan trip");
    }

    #[test]
    fn test_dedup_keys() {
        let mut a = sample_story("  Plan trip ");
        let b = sample_story("Plan trip");
        a.id = "different".to_string();
        assert_eq!(a.dedup_key(), b.dedup_key());

        let date = ImportantDate::decode(&Row::new(vec![
            "Anniversary".to_string(),
            "2020-06-01".to_string(),
        ]));
        assert_eq!(date.dedup_key(), "Anniversary|2020-06-01");

        let mut sprint = sample_sprint("sp-9");
        sprint.name = "Renamed".to_string();
        assert_eq!(sprint.dedup_key(), "sp-9");
    }

    #[test]
    fn test_dedup_keys_are_case_sensitive() {
        assert_ne!(
            sample_story("US taxes").dedup_key(),
            sample_story("us taxes").dedup_key()
        );
        assert_eq!(normalize_key("  Plan Trip\t"), "Plan Trip");
    }

    #[test]
    fn test_named_row_drops_unmapped() {
        let named = NamedRow::from_mapping(
            &[Some("title"), None, Some("weight")],
            vec!["A".to_string(), "ignored".to_string(), "4".to_string(), "extra".to_string()],
        );
        assert_eq!(named.len(), 2);
        let story = Story::decode_named(&named);
        assert_eq!(story.title, "A");
        assert_eq!(story.weight, 4);
    }
}
