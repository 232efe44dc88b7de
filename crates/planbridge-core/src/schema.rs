//! Column layouts for every entity kind
//!
//! A schema is the ordered column list that gives a row its positional
//! meaning. Each column carries a machine key (used as the header row of
//! remote ranges and as the field name in named rows) and a human label
//! (used as the header line of interchange documents).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The closed set of entity kinds this crate can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Story,
    Goal,
    Project,
    Vision,
    BucketlistItem,
    ImportantDate,
    Tradition,
    Sprint,
    Settings,
    Role,
    Label,
}

impl EntityKind {
    /// All kinds in document order
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Story,
        EntityKind::Goal,
        EntityKind::Project,
        EntityKind::Vision,
        EntityKind::BucketlistItem,
        EntityKind::ImportantDate,
        EntityKind::Tradition,
        EntityKind::Sprint,
        EntityKind::Settings,
        EntityKind::Role,
        EntityKind::Label,
    ];

    /// Schema for this kind
    pub fn schema(self) -> &'static Schema {
        match self {
            EntityKind::Story => &STORY,
            EntityKind::Goal => &GOAL,
            EntityKind::Project => &PROJECT,
            EntityKind::Vision => &VISION,
            EntityKind::BucketlistItem => &BUCKETLIST_ITEM,
            EntityKind::ImportantDate => &IMPORTANT_DATE,
            EntityKind::Tradition => &TRADITION,
            EntityKind::Sprint => &SPRINT,
            EntityKind::Settings => &SETTINGS,
            EntityKind::Role => &ROLE,
            EntityKind::Label => &LABEL,
        }
    }

    /// Section name as written in interchange documents
    pub fn section_name(self) -> &'static str {
        self.schema().section
    }

    /// Look up a kind by section or sheet name.
    ///
    /// Case, spaces, underscores and hyphens are ignored, so
    /// `Important Dates`, `important_dates` and `IMPORTANTDATES` all match.
    pub fn from_section_name(name: &str) -> Option<EntityKind> {
        let wanted = normalize_name(name);
        EntityKind::ALL
            .into_iter()
            .find(|kind| normalize_name(kind.section_name()) == wanted)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.section_name())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::from_section_name(s)
            .or_else(|| {
                // Singular forms: "story", "goal", "important-date"
                let wanted = normalize_name(s);
                EntityKind::ALL.into_iter().find(|kind| {
                    normalize_name(kind.schema().header_label()) == wanted
                        || normalize_name(&format!("{:?}", kind)) == wanted
                })
            })
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A column definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Machine key, camelCase (e.g., "dueDate")
    pub key: &'static str,
    /// Human label (e.g., "Due Date")
    pub label: &'static str,
}

impl Column {
    const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }

    /// Whether a header cell names this column (by key or label, any case)
    pub fn matches(&self, header_cell: &str) -> bool {
        let cell = header_cell.trim();
        cell.eq_ignore_ascii_case(self.key) || cell.eq_ignore_ascii_case(self.label)
    }
}

/// Ordered column layout of one entity kind
#[derive(Debug)]
pub struct Schema {
    /// Section name in documents; sheet name with spaces removed
    pub section: &'static str,
    /// Columns in row order
    pub columns: &'static [Column],
}

impl Schema {
    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by key
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    /// Column keys in order
    pub fn keys(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.key).collect()
    }

    /// Column labels in order
    pub fn labels(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    /// The literal first cell of a human-readable header line
    pub fn header_label(&self) -> &'static str {
        self.columns.first().map(|c| c.label).unwrap_or_default()
    }

    /// Whether a document line is a header line for this schema.
    ///
    /// Only the first cell is inspected; it must be the first column's label
    /// exactly. A story titled "title" is data, not a header.
    pub fn is_header(&self, cells: &[String]) -> bool {
        match (cells.first(), self.columns.first()) {
            (Some(cell), Some(first)) => cell.trim() == first.label,
            _ => false,
        }
    }

    /// Whether a sheet row is a header row.
    ///
    /// Sheets are written with key headers, so the first column's key is
    /// accepted as well as its label, in any case.
    pub fn is_header_row(&self, cells: &[String]) -> bool {
        match (cells.first(), self.columns.first()) {
            (Some(cell), Some(first)) => first.matches(cell),
            _ => false,
        }
    }

    /// Build a positional mapping from a header line.
    ///
    /// Each entry is the column key at that position, or `None` for a header
    /// cell that names no known column. Returns `None` when no cell matched
    /// at all, so callers can fall back to the built-in order.
    pub fn mapping_from_header(&self, cells: &[String]) -> Option<Vec<Option<&'static str>>> {
        let mapping: Vec<Option<&'static str>> = cells
            .iter()
            .map(|cell| self.columns.iter().find(|c| c.matches(cell)).map(|c| c.key))
            .collect();

        if mapping.iter().any(Option::is_some) {
            Some(mapping)
        } else {
            None
        }
    }

    /// Built-in positional mapping
    pub fn default_mapping(&self) -> Vec<Option<&'static str>> {
        self.columns.iter().map(|c| Some(c.key)).collect()
    }

    /// Sheet name in the remote store
    pub fn sheet_name(&self) -> String {
        self.section.replace(' ', "")
    }

    /// A1 range covering every column, starting at row 1 (e.g., `Stories!A1:R`)
    pub fn range(&self) -> String {
        format!("{}!A1:{}", self.sheet_name(), column_letter(self.width()))
    }
}

/// Spreadsheet column letter for a 1-based column number (1 -> A, 27 -> AA)
pub fn column_letter(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        number = (number - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub static STORY: Schema = Schema {
    section: "Stories",
    columns: &[
        Column::new("title", "Story"),
        Column::new("description", "Description"),
        Column::new("goalId", "Goal"),
        Column::new("visionId", "Vision"),
        Column::new("projectId", "Project"),
        Column::new("roleId", "Role"),
        Column::new("sprintId", "Sprint"),
        Column::new("weight", "Weight"),
        Column::new("size", "Size"),
        Column::new("priority", "Priority"),
        Column::new("status", "Status"),
        Column::new("labels", "Labels"),
        Column::new("dueDate", "Due Date"),
        Column::new("checklist", "Checklist"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
        Column::new("updatedAt", "Updated"),
    ],
};

pub static GOAL: Schema = Schema {
    section: "Goals",
    columns: &[
        Column::new("title", "Goal"),
        Column::new("description", "Description"),
        Column::new("visionId", "Vision"),
        Column::new("category", "Category"),
        Column::new("status", "Status"),
        Column::new("targetDate", "Target Date"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
        Column::new("updatedAt", "Updated"),
    ],
};

pub static PROJECT: Schema = Schema {
    section: "Projects",
    columns: &[
        Column::new("name", "Project"),
        Column::new("description", "Description"),
        Column::new("goalId", "Goal"),
        Column::new("status", "Status"),
        Column::new("startDate", "Start Date"),
        Column::new("endDate", "End Date"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
        Column::new("updatedAt", "Updated"),
    ],
};

pub static VISION: Schema = Schema {
    section: "Visions",
    columns: &[
        Column::new("title", "Vision"),
        Column::new("description", "Description"),
        Column::new("category", "Category"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
        Column::new("updatedAt", "Updated"),
    ],
};

pub static BUCKETLIST_ITEM: Schema = Schema {
    section: "Bucketlist",
    columns: &[
        Column::new("title", "Bucket List Item"),
        Column::new("description", "Description"),
        Column::new("category", "Category"),
        Column::new("location", "Location"),
        Column::new("completed", "Completed"),
        Column::new("completedAt", "Completed On"),
        Column::new("targetDate", "Target Date"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
    ],
};

pub static IMPORTANT_DATE: Schema = Schema {
    section: "Important Dates",
    columns: &[
        Column::new("title", "Important Date"),
        Column::new("date", "Date"),
        Column::new("category", "Category"),
        Column::new("recurring", "Recurring"),
        Column::new("reminderDays", "Reminder Days"),
        Column::new("notes", "Notes"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
    ],
};

pub static TRADITION: Schema = Schema {
    section: "Traditions",
    columns: &[
        Column::new("title", "Tradition"),
        Column::new("description", "Description"),
        Column::new("traditionType", "Type"),
        Column::new("season", "Season"),
        Column::new("active", "Active"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
    ],
};

pub static SPRINT: Schema = Schema {
    section: "Sprints",
    columns: &[
        Column::new("name", "Sprint"),
        Column::new("startDate", "Start Date"),
        Column::new("endDate", "End Date"),
        Column::new("goal", "Sprint Goal"),
        Column::new("storyIds", "Stories"),
        Column::new("status", "Status"),
        Column::new("id", "Id"),
        Column::new("createdAt", "Created"),
    ],
};

pub static SETTINGS: Schema = Schema {
    section: "Settings",
    columns: &[
        Column::new("version", "Version"),
        Column::new("theme", "Theme"),
        Column::new("accentColor", "Accent Color"),
        Column::new("weekStartDay", "Week Start Day"),
        Column::new("sprintLengthDays", "Sprint Length"),
        Column::new("defaultStoryWeight", "Default Weight"),
        Column::new("showCompleted", "Show Completed"),
        Column::new("storySizes", "Story Sizes"),
        Column::new("roles", "Roles"),
        Column::new("labels", "Labels"),
    ],
};

pub static ROLE: Schema = Schema {
    section: "Roles",
    columns: &[
        Column::new("name", "Role"),
        Column::new("color", "Color"),
        Column::new("order", "Order"),
        Column::new("id", "Id"),
    ],
};

pub static LABEL: Schema = Schema {
    section: "Labels",
    columns: &[
        Column::new("name", "Label"),
        Column::new("color", "Color"),
        Column::new("id", "Id"),
    ],
};
