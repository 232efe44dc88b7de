//! Interchange documents: flat text with one section per entity kind
//!
//! ```text
//! === Stories ===
//! Story,Description,Goal,...
//! "Plan trip","Book flights","goal-1",...
//! ```
//!
//! A section starts at a `=== Name ===` marker and runs to the next marker.
//! The first data line may be a header line; it is recognized by its first
//! cell and used to map the following cells to columns. Without a header
//! line the built-in column order applies.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::codec::NamedRow;
use crate::entity::{Label, Role};
use crate::error::{Error, Result};
use crate::registry::{registry, KindSpec};
use crate::settings::Settings;
use crate::snapshot::{Collections, Snapshot};

/// Typed collections recovered from a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub collections: Collections,
    /// Last `Settings` row in the document, if any
    pub settings: Option<Settings>,
    /// Rows of a standalone `Roles` section
    pub roles: Vec<Role>,
    /// Rows of a standalone `Labels` section
    pub labels: Vec<Label>,
}

impl ParsedDocument {
    /// Convert into a snapshot.
    ///
    /// Settings default when the document has none. Non-empty `Roles` and
    /// `Labels` sections replace the roles and labels inside the settings.
    /// Board collections are never part of a document and come back empty.
    pub fn into_snapshot(self) -> Snapshot {
        let mut settings = self.settings.unwrap_or_default();
        if !self.roles.is_empty() {
            settings.taxonomy.roles = self.roles;
        }
        if !self.labels.is_empty() {
            settings.taxonomy.labels = self.labels;
        }
        Snapshot {
            collections: self.collections,
            board_columns: Vec::new(),
            board_layouts: Vec::new(),
            settings,
        }
    }
}

/// Split one line into cells.
///
/// Commas inside double quotes are literal and `""` inside a quoted cell is
/// an escaped quote. Blanks between a comma and an opening quote are
/// dropped, so `"a", "b, c"` is two cells. Never fails; an unreadable line
/// yields no cells.
pub fn tokenize(line: &str) -> Vec<String> {
    let (normalized, _) = scan_quotes(line, false);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(normalized.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "unreadable line");
            Vec::new()
        }
    }
}

/// Walk `text` tracking quoted cells.
///
/// A quote opens a quoted cell only at the start of a cell, optionally after
/// blanks; anywhere else it is a literal character. Returns the text with
/// those leading blanks removed, and whether a quoted cell is still open at
/// the end. `in_quotes` is the state carried over from a previous line.
fn scan_quotes(text: &str, in_quotes: bool) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = in_quotes;
    let mut cell_start = !in_quotes;
    let mut blanks = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            out.push(c);
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        match c {
            ' ' | '\t' if cell_start => blanks.push(c),
            '"' if cell_start => {
                blanks.clear();
                out.push(c);
                in_quotes = true;
                cell_start = false;
            }
            _ => {
                out.push_str(&blanks);
                blanks.clear();
                out.push(c);
                cell_start = matches!(c, ',' | '\n');
            }
        }
    }
    out.push_str(&blanks);

    (out, in_quotes)
}

/// Section name if `line` is a `=== Name ===` marker
fn section_marker(line: &str) -> Option<&str> {
    let name = line
        .trim()
        .strip_prefix("===")?
        .strip_suffix("===")?
        .trim();
    if name.is_empty() || name.contains("===") {
        None
    } else {
        Some(name)
    }
}

/// Join physical lines so a quoted cell may contain line breaks.
///
/// A section marker always starts a new line; a quoted cell still open when
/// one is reached is cut off there.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.lines() {
        let (joined, carried) = match pending.take() {
            Some(open) if section_marker(line).is_some() => {
                warn!(line = %open, "unterminated quoted cell before section marker");
                lines.push(open);
                (line.to_string(), false)
            }
            Some(mut open) => {
                open.push('\n');
                open.push_str(line);
                (open, true)
            }
            None => (line.to_string(), false),
        };

        let (_, still_open) = scan_quotes(line, carried);
        if still_open {
            pending = Some(joined);
        } else {
            lines.push(joined);
        }
    }

    if let Some(open) = pending {
        warn!(line = %open, "unterminated quoted cell at end of document");
        lines.push(open);
    }

    lines
}

/// Parser state for the section being read
struct Section {
    spec: &'static KindSpec,
    mapping: Vec<Option<&'static str>>,
}

impl Section {
    fn new(spec: &'static KindSpec) -> Self {
        Self {
            spec,
            mapping: spec.schema.default_mapping(),
        }
    }

    fn read_header(&mut self, cells: &[String]) {
        let schema = self.spec.schema;
        self.mapping = match schema.mapping_from_header(cells) {
            Some(mapping) => {
                for (cell, key) in cells.iter().zip(&mapping) {
                    if key.is_none() && !cell.trim().is_empty() {
                        warn!(section = schema.section, column = %cell, "ignoring unrecognized header column");
                    }
                }
                mapping
            }
            None => schema.default_mapping(),
        };
    }
}

/// Parse an interchange document.
///
/// Unknown sections, comma-free lines and rows whose cells are all blank are
/// skipped. Never fails.
pub fn parse_document(text: &str) -> ParsedDocument {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut doc = ParsedDocument::default();
    let mut section: Option<Section> = None;
    let mut rows = 0usize;

    for line in logical_lines(text) {
        if let Some(name) = section_marker(&line) {
            section = registry().by_section(name).map(Section::new);
            if section.is_none() {
                debug!(section = name, "ignoring unknown section");
            }
            continue;
        }

        let Some(current) = section.as_mut() else {
            continue;
        };
        if !line.contains(',') {
            continue;
        }

        let cells = tokenize(&line);
        if current.spec.schema.is_header(&cells) {
            current.read_header(&cells);
            continue;
        }
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let named = NamedRow::from_mapping(&current.mapping, cells);
        (current.spec.absorb)(&mut doc, &named);
        rows += 1;
    }

    debug!(rows, "parsed document");
    doc
}

/// Read and parse a document file
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<ParsedDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_document(&content))
}

/// Render a snapshot as an interchange document.
///
/// Every importable kind and the settings get a section with a header line;
/// data cells are always quoted.
pub fn write_document(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    for spec in registry().iter().filter(|s| s.exported) {
        out.push_str(&format!("=== {} ===\n", spec.schema.section));

        let header: Vec<String> = spec.schema.labels().into_iter().map(escape_cell).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for row in (spec.rows)(snapshot) {
            let cells: Vec<String> = row.cells.iter().map(|c| quote_cell(c)).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Write a snapshot to a document file
pub fn write_document_file<P: AsRef<Path>>(snapshot: &Snapshot, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, write_document(snapshot)).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Quote a value only when it needs it
fn escape_cell(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        quote_cell(s)
    } else {
        s.to_string()
    }
}

fn quote_cell(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{sample_goal, sample_sprint, sample_story};
    use crate::entity::{BoardColumn, StoryStatus, Theme};
    use crate::settings::Taxonomy;

    #[test]
    fn test_tokenize_quoting() {
        assert_eq!(tokenize(r#"a,"b,c","d""e""#), vec!["a", "b,c", "d\"e"]);
        assert_eq!(tokenize("x,,y"), vec!["x", "", "y"]);
        assert_eq!(tokenize(""), Vec::<String>::new());
    }

    #[test]
    fn test_tokenize_blank_before_quote() {
        assert_eq!(
            tokenize(r#""Plan trip", "Book, flights""#),
            vec!["Plan trip", "Book, flights"]
        );
        assert_eq!(tokenize("a, b"), vec!["a", " b"]);
        assert_eq!(tokenize(r#"Fix 2" pipe,leaky"#), vec!["Fix 2\" pipe", "leaky"]);
    }

    #[test]
    fn test_scan_quotes_state() {
        assert!(scan_quotes(r#""a","b"#, false).1);
        assert!(!scan_quotes(r#""a","b""#, false).1);
        assert!(!scan_quotes(r#"Fix 2" pipe,leaky"#, false).1);
        assert!(!scan_quotes(r#"still inside","next"#, true).1);
        assert!(scan_quotes(r#"say ""hi"" again"#, true).1);
    }

    #[test]
    fn test_stray_quote_does_not_swallow_sections() {
        let text = "=== Stories ===\n\
                    Fix 2\" pipe,leaky\n\
                    === Goals ===\n\
                    \"Run\",\"5k\"\n\
                    \"Swim\",\"laps\"\n";
        let doc = parse_document(text);

        assert_eq!(doc.collections.stories.len(), 1);
        assert_eq!(doc.collections.stories[0].title, "Fix 2\" pipe");
        assert_eq!(doc.collections.goals.len(), 2);
    }

    #[test]
    fn test_open_quote_cut_at_section_marker() {
        let text = "=== Stories ===\n\
                    \"Plan trip\",\"never closed\n\
                    === Goals ===\n\
                    \"Run\",\"5k\"\n";
        let doc = parse_document(text);

        assert_eq!(doc.collections.stories.len(), 1);
        assert_eq!(doc.collections.stories[0].title, "Plan trip");
        assert_eq!(doc.collections.goals.len(), 1);
        assert_eq!(doc.collections.goals[0].title, "Run");
    }

    #[test]
    fn test_section_marker_shape() {
        assert_eq!(section_marker("=== Stories ==="), Some("Stories"));
        assert_eq!(section_marker("  === Important Dates ===  "), Some("Important Dates"));
        assert_eq!(section_marker("== Stories =="), None);
        assert_eq!(section_marker("=== ==="), None);
        assert_eq!(section_marker("Stories"), None);
    }

    #[test]
    fn test_stories_with_header_and_two_rows() {
        let text = "=== Stories ===\n\
                    Story,Description,Goal,Vision\n\
                    \"Plan trip\",\"Book flights\",\"\",\"\"\n\
                    \"Fix bike\",\"New chain, brakes\",\"\",\"\"\n";
        let doc = parse_document(text);

        let stories = &doc.collections.stories;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "Plan trip");
        assert_eq!(stories[1].title, "Fix bike");
        assert_eq!(stories[1].description, "New chain, brakes");
        assert_eq!(stories[0].weight, 1);
    }

    #[test]
    fn test_header_line_is_not_data() {
        let text = "=== Goals ===\nGoal,Description\n\"Run\",\"5k\"\n";
        let doc = parse_document(text);
        assert_eq!(doc.collections.goals.len(), 1);
        assert_eq!(doc.collections.goals[0].title, "Run");
    }

    #[test]
    fn test_row_matching_a_column_key_is_data() {
        let text = "=== Stories ===\n\
                    \"title\",\"A story literally named title\"\n\
                    \"Plan trip\",\"Book flights\"\n";
        let doc = parse_document(text);

        let stories = &doc.collections.stories;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "title");
        assert_eq!(stories[0].description, "A story literally named title");
    }

    #[test]
    fn test_spaced_quoted_cells() {
        let text = "=== Stories ===\n\"Plan trip\", \"Book, flights\"\n";
        let doc = parse_document(text);

        let stories = &doc.collections.stories;
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "Plan trip");
        assert_eq!(stories[0].description, "Book, flights");
    }

    #[test]
    fn test_headerless_section_uses_builtin_order() {
        let text = "=== Goals ===\n\"Run\",\"5k\",\"vision-1\"\n";
        let doc = parse_document(text);
        assert_eq!(doc.collections.goals.len(), 1);
        assert_eq!(doc.collections.goals[0].vision_id.as_deref(), Some("vision-1"));
    }

    #[test]
    fn test_reordered_header_remaps_columns() {
        let text = "=== Stories ===\n\
                    Story,Weight,Status,Notes\n\
                    \"Plan trip\",\"8\",\"done\",\"ignored\"\n";
        let doc = parse_document(text);

        let story = &doc.collections.stories[0];
        assert_eq!(story.weight, 8);
        assert_eq!(story.status, StoryStatus::Done);
        assert_eq!(story.description, "");
    }

    #[test]
    fn test_unknown_sections_and_stray_lines_ignored() {
        let text = "preamble, before any section\n\
                    === Widgets ===\n\
                    \"a\",\"b\"\n\
                    === Visions ===\n\
                    just a comment line\n\
                    ,,,\n\
                    \"Healthy family\",\"\"\n";
        let doc = parse_document(text);

        assert_eq!(doc.collections.visions.len(), 1);
        assert_eq!(doc.collections.total(), 1);
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_document("");
        assert_eq!(doc, ParsedDocument::default());
        let doc = parse_document("=== Stories ===\n=== Goals ===\n");
        assert!(doc.collections.is_empty());
    }

    #[test]
    fn test_quoted_cell_spanning_lines() {
        let text = "=== Stories ===\n\"Plan trip\",\"line one\nline two\"\n\"Next\",\"\"\n";
        let doc = parse_document(text);
        assert_eq!(doc.collections.stories.len(), 2);
        assert_eq!(doc.collections.stories[0].description, "line one\nline two");
    }

    #[test]
    fn test_roles_section_overrides_settings() {
        let text = "=== Settings ===\nVersion,Theme\n\"1\",\"dark\"\n\
                    === Roles ===\nRole,Color\n\"Parent\",\"#f00\"\n";
        let snapshot = parse_document(text).into_snapshot();

        assert_eq!(snapshot.settings.appearance.theme, Theme::Dark);
        assert_eq!(snapshot.settings.taxonomy.roles.len(), 1);
        assert_eq!(snapshot.settings.taxonomy.roles[0].name, "Parent");
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let mut snapshot = Snapshot::default();
        let mut story = sample_story("Plan trip");
        story.description = "Multi\nline, \"quoted\"".to_string();
        snapshot.collections.stories = vec![story, sample_story("Fix bike")];
        snapshot.collections.goals = vec![sample_goal("Run")];
        snapshot.collections.sprints = vec![sample_sprint("sp-1")];
        snapshot.settings = Settings::builder().taxonomy(Taxonomy::starter()).build();

        let text = write_document(&snapshot);
        assert!(text.starts_with("=== Stories ===\nStory,Description,"));

        let parsed = parse_document(&text).into_snapshot();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_board_collections_not_written() {
        let mut snapshot = Snapshot::default();
        snapshot.board_columns.push(BoardColumn {
            id: "c1".to_string(),
            title: "Doing".to_string(),
            status: StoryStatus::Progress,
            order: 0,
        });
        let parsed = parse_document(&write_document(&snapshot)).into_snapshot();
        assert!(parsed.board_columns.is_empty());
    }

    #[test]
    fn test_document_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");

        let mut snapshot = Snapshot::default();
        snapshot.collections.goals.push(sample_goal("Run"));
        write_document_file(&snapshot, &path).unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.collections.goals, snapshot.collections.goals);

        assert!(matches!(
            read_document(dir.path().join("missing.txt")),
            Err(Error::FileRead { .. })
        ));
    }
}
