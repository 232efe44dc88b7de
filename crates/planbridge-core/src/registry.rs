//! Per-kind operation table
//!
//! Generic code (the section parser, the document writer, validation by
//! kind name) looks a kind's bundle up here instead of matching on the kind.
//! The table is built on first use and is read-only afterwards.

use serde_json::Value;
use std::sync::OnceLock;

use crate::codec::{NamedRow, Record, Row};
use crate::document::ParsedDocument;
use crate::entity::{
    BucketlistItem, Goal, ImportantDate, Label, Project, Role, Sprint, Story, Tradition, Vision,
};
use crate::schema::{EntityKind, Schema};
use crate::settings::Settings;
use crate::snapshot::{Collected, Snapshot};
use crate::validate::Validate;

/// Everything generic code needs to handle one kind
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: EntityKind,
    pub schema: &'static Schema,
    /// Structural validator for the kind's JSON shape
    pub validate: fn(&Value) -> bool,
    /// Decode a named row and store it in a parsed document
    pub absorb: fn(&mut ParsedDocument, &NamedRow),
    /// Encode the kind's entities held by a snapshot
    pub rows: fn(&Snapshot) -> Vec<Row>,
    /// Whether the document writer emits a section for this kind
    pub exported: bool,
}

impl KindSpec {
    fn collected<T: Collected>() -> Self {
        Self {
            kind: T::KIND,
            schema: T::schema(),
            validate: <T as Validate>::validate,
            absorb: |doc, row| T::of_mut(&mut doc.collections).push(T::decode_named(row)),
            rows: |snapshot| T::of(&snapshot.collections).iter().map(T::encode).collect(),
            exported: true,
        }
    }

    fn settings() -> Self {
        Self {
            kind: EntityKind::Settings,
            schema: Settings::schema(),
            validate: <Settings as Validate>::validate,
            absorb: |doc, row| doc.settings = Some(Settings::decode_named(row)),
            rows: |snapshot| vec![snapshot.settings.encode()],
            exported: true,
        }
    }

    fn role() -> Self {
        Self {
            kind: EntityKind::Role,
            schema: Role::schema(),
            validate: <Role as Validate>::validate,
            absorb: |doc, row| doc.roles.push(Role::decode_named(row)),
            rows: |snapshot| snapshot.settings.taxonomy.roles.iter().map(Role::encode).collect(),
            exported: false,
        }
    }

    fn label() -> Self {
        Self {
            kind: EntityKind::Label,
            schema: Label::schema(),
            validate: <Label as Validate>::validate,
            absorb: |doc, row| doc.labels.push(Label::decode_named(row)),
            rows: |snapshot| {
                snapshot
                    .settings
                    .taxonomy
                    .labels
                    .iter()
                    .map(Label::encode)
                    .collect()
            },
            exported: false,
        }
    }
}

/// The kind table, in document order
#[derive(Debug)]
pub struct Registry {
    specs: Vec<KindSpec>,
}

impl Registry {
    fn build() -> Self {
        let specs = vec![
            KindSpec::collected::<Story>(),
            KindSpec::collected::<Goal>(),
            KindSpec::collected::<Project>(),
            KindSpec::collected::<Vision>(),
            KindSpec::collected::<BucketlistItem>(),
            KindSpec::collected::<ImportantDate>(),
            KindSpec::collected::<Tradition>(),
            KindSpec::collected::<Sprint>(),
            KindSpec::settings(),
            KindSpec::role(),
            KindSpec::label(),
        ];
        debug_assert_eq!(specs.len(), EntityKind::ALL.len());
        Self { specs }
    }

    /// Bundle for a kind
    pub fn get(&self, kind: EntityKind) -> &KindSpec {
        self.specs
            .iter()
            .find(|s| s.kind == kind)
            .unwrap_or_else(|| unreachable!("registry covers every EntityKind"))
    }

    /// Bundle for a document section name
    pub fn by_section(&self, name: &str) -> Option<&KindSpec> {
        EntityKind::from_section_name(name).map(|kind| self.get(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindSpec> {
        self.specs.iter()
    }
}

/// The process-wide registry
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::build)
}

/// Validate an untyped value as the given kind
pub fn validate(kind: EntityKind, value: &Value) -> bool {
    (registry().get(kind).validate)(value)
}
