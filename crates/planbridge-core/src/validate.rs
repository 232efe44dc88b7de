//! Structural validators for untyped entity data
//!
//! Used when entities arrive as JSON without passing through the row codec
//! (backup files, direct reads from the remote store). A validator checks
//! that required fields are present with the right primitive type and that
//! optional fields, when present, are not the wrong type. It does not look
//! at cross-field consistency or at whether referenced ids exist.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::entity::{
    BoardColumn, BoardLayout, BucketlistItem, Goal, ImportantDate, Label, Project, Role, Sprint,
    Story, Tradition, Vision,
};
use crate::settings::Settings;

/// Structural check for one entity kind
pub trait Validate {
    /// Whether `value` has the shape of this kind
    fn validate(value: &Value) -> bool;
}

/// Validate, then deserialize.
///
/// `None` when the shape check fails or the value still does not
/// deserialize (an unrecognized enum spelling, for instance).
pub fn narrow<T: Validate + DeserializeOwned>(value: &Value) -> Option<T> {
    if !T::validate(value) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// Field-type checks over a JSON object
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(Fields)
    }

    fn string(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(Value::is_string)
    }

    fn number(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(Value::is_number)
    }

    fn boolean(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(Value::is_boolean)
    }

    fn object(&self, key: &str) -> Option<Fields<'a>> {
        self.0.get(key).and_then(Fields::of)
    }

    fn optional(&self, key: &str, check: fn(&Value) -> bool) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => true,
            Some(v) => check(v),
        }
    }

    fn opt_string(&self, key: &str) -> bool {
        self.optional(key, Value::is_string)
    }

    fn opt_number(&self, key: &str) -> bool {
        self.optional(key, Value::is_number)
    }

    fn opt_strings(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.opt_string(k))
    }

    /// Required array whose every element passes `check`
    fn array(&self, key: &str, check: fn(&Value) -> bool) -> bool {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.iter().all(check),
            _ => false,
        }
    }
}

impl Validate for Story {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.number("weight")
                && f.string("createdAt")
                && f.string("updatedAt")
                && f.opt_strings(&[
                    "description",
                    "goalId",
                    "visionId",
                    "projectId",
                    "roleId",
                    "sprintId",
                    "size",
                    "priority",
                    "status",
                    "dueDate",
                ])
                && f.opt_number("order")
                && f.array("labels", Value::is_string)
                && f.array("checklist", Value::is_object)
        })
    }
}

impl Validate for Goal {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.string("createdAt")
                && f.string("updatedAt")
                && f.opt_strings(&["description", "visionId", "category", "status", "targetDate"])
                && f.opt_number("order")
        })
    }
}

impl Validate for Project {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("name")
                && f.string("createdAt")
                && f.string("updatedAt")
                && f.opt_strings(&["description", "goalId", "status", "startDate", "endDate"])
                && f.opt_number("order")
        })
    }
}

impl Validate for Vision {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.string("createdAt")
                && f.string("updatedAt")
                && f.opt_strings(&["description", "category"])
                && f.opt_number("order")
        })
    }
}

impl Validate for BucketlistItem {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.boolean("completed")
                && f.string("createdAt")
                && f.opt_strings(&[
                    "description",
                    "category",
                    "location",
                    "completedAt",
                    "targetDate",
                ])
                && f.opt_number("order")
        })
    }
}

impl Validate for ImportantDate {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.string("date")
                && f.boolean("recurring")
                && f.number("reminderDays")
                && f.string("createdAt")
                && f.opt_strings(&["category", "notes"])
        })
    }
}

impl Validate for Tradition {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("title")
                && f.boolean("active")
                && f.string("createdAt")
                && f.opt_strings(&["description", "traditionType", "season"])
        })
    }
}

impl Validate for Sprint {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id")
                && f.string("name")
                && f.string("startDate")
                && f.string("endDate")
                && f.string("createdAt")
                && f.opt_strings(&["goal", "status"])
                && f.array("storyIds", Value::is_string)
        })
    }
}

impl Validate for Role {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id") && f.string("name") && f.opt_string("color") && f.opt_number("order")
        })
    }
}

impl Validate for Label {
    fn validate(value: &Value) -> bool {
        Fields::of(value)
            .is_some_and(|f| f.string("id") && f.string("name") && f.opt_string("color"))
    }
}

impl Validate for BoardColumn {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id") && f.string("title") && f.string("status") && f.opt_number("order")
        })
    }
}

impl Validate for BoardLayout {
    fn validate(value: &Value) -> bool {
        Fields::of(value).is_some_and(|f| {
            f.string("id") && f.string("name") && f.array("columnIds", Value::is_string)
        })
    }
}

impl Validate for Settings {
    fn validate(value: &Value) -> bool {
        let Some(f) = Fields::of(value) else {
            return false;
        };
        if !f.number("version") {
            return false;
        }
        let appearance = f
            .object("appearance")
            .is_some_and(|a| a.string("theme") && a.string("accentColor"));
        let planning = f.object("planning").is_some_and(|p| {
            p.number("weekStartDay")
                && p.number("sprintLengthDays")
                && p.number("defaultStoryWeight")
                && p.boolean("showCompleted")
        });
        let taxonomy = f.object("taxonomy").is_some_and(|t| {
            t.array("storySizes", Value::is_string)
                && t.array("roles", Role::validate)
                && t.array("labels", Label::validate)
        });
        appearance && planning && taxonomy
    }
}
