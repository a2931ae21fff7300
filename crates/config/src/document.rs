//! Format-preserving INI document
//!
//! Lines that are never touched are written back exactly as they were read,
//! line terminators included, so comments, ordering and spacing in a hand-edited
//! server configuration survive a rewrite. Only entries changed through
//! [`ConfigDocument::set`] are re-rendered, using the line ending of the file.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, Result};

/// A section/key-value configuration document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    /// Blank lines and comments before the first section header
    preamble: Vec<Line>,
    sections: Vec<Section>,
    eol: LineEnding,
}

/// Terminator used for lines the document renders itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Follow the first terminator in `text`
    fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if text[..i].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

// Source text is stored with its line terminator; the last line of a file may
// have none.

#[derive(Debug, Clone, PartialEq)]
struct Section {
    name: String,
    header: String,
    lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Blank line or comment, kept verbatim
    Raw(String),
    Entry(Entry),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: String,
    /// Original source lines (including continuations); `None` once modified
    source: Option<Vec<String>>,
}

impl Entry {
    fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

impl Section {
    fn new(name: &str, eol: LineEnding) -> Self {
        Self {
            name: name.to_string(),
            header: format!("[{name}]{}", eol.as_str()),
            lines: Vec::new(),
        }
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            Line::Raw(_) => None,
        })
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.lines
            .iter_mut()
            .rev()
            .find_map(|line| match line {
                Line::Entry(entry) if entry.matches(key) => Some(entry),
                _ => None,
            })
    }

    fn ends_with_blank(&self) -> bool {
        matches!(self.lines.last(), Some(Line::Raw(raw)) if raw.trim().is_empty())
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

fn strip_terminator(chunk: &str) -> &str {
    match chunk.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => chunk,
    }
}

/// Interpret a boolean-like INI value
///
/// Accepts `1/yes/true/on` and `0/no/false/off` in any case. Anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

impl ConfigDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from text
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Self {
            eol: LineEnding::detect(text),
            ..Self::default()
        };
        let mut in_entry = false;

        for (index, chunk) in text.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let raw = strip_terminator(chunk);
            let trimmed = raw.trim();

            if trimmed.is_empty() || is_comment(trimmed) {
                in_entry = false;
                doc.push_line(Line::Raw(chunk.to_string()));
                continue;
            }

            let indented = raw.starts_with(|c: char| c.is_whitespace());
            if indented && in_entry {
                if let Some(Line::Entry(entry)) = doc.current_lines().last_mut() {
                    entry.value.push('\n');
                    entry.value.push_str(trimmed);
                    if let Some(source) = entry.source.as_mut() {
                        source.push(chunk.to_string());
                    }
                    continue;
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                // Anything after the closing bracket, such as a comment, is ignored.
                let end = rest
                    .rfind(']')
                    .ok_or_else(|| ConfigError::parse(line_no, "unterminated section header"))?;
                let name = rest[..end].trim();
                if name.is_empty() {
                    return Err(ConfigError::parse(line_no, "empty section name"));
                }
                if doc.has_section(name) {
                    return Err(ConfigError::parse(
                        line_no,
                        format!("duplicate section `{name}`"),
                    ));
                }
                in_entry = false;
                doc.sections.push(Section {
                    name: name.to_string(),
                    header: chunk.to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            if doc.sections.is_empty() {
                return Err(ConfigError::parse(
                    line_no,
                    "entry appears before any section header",
                ));
            }

            let split = trimmed
                .find(['=', ':'])
                .ok_or_else(|| ConfigError::parse(line_no, format!("expected `key = value`, got `{trimmed}`")))?;
            let key = trimmed[..split].trim();
            if key.is_empty() {
                return Err(ConfigError::parse(line_no, "missing key before delimiter"));
            }
            let value = trimmed[split + 1..].trim();

            in_entry = true;
            doc.push_line(Line::Entry(Entry {
                key: key.to_string(),
                value: value.to_string(),
                source: Some(vec![chunk.to_string()]),
            }));
        }

        Ok(doc)
    }

    /// Load a document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| e.in_file(path))
    }

    /// Load a document from disk, treating a missing file as an empty document
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map_err(|e| e.in_file(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration file absent, starting empty");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Look up a value; keys are case-insensitive, the last duplicate wins
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries()
            .filter(|entry| entry.matches(key))
            .last()
            .map(|entry| entry.value.as_str())
    }

    /// Look up a boolean-like value
    ///
    /// Returns `None` when the section or key is missing or the value is not a
    /// recognised boolean.
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.get(section, key).and_then(parse_bool)
    }

    /// Set a value, creating the section and key as needed
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();

        if self.section(section).is_none() {
            self.append_section(section);
        }
        let Some(target) = self.sections.iter_mut().find(|s| s.name == section) else {
            return;
        };

        if let Some(entry) = target.find_mut(key) {
            if entry.value != value {
                entry.value = value;
                entry.source = None;
            }
            return;
        }

        // New keys go after the last entry so trailing blank lines and comments
        // stay attached to the end of the section.
        let position = target
            .lines
            .iter()
            .rposition(|line| matches!(line, Line::Entry(_)))
            .map(|i| i + 1)
            .unwrap_or(0);
        target.lines.insert(
            position,
            Line::Entry(Entry {
                key: key.to_string(),
                value,
                source: None,
            }),
        );
    }

    /// Store a filesystem path as a value
    ///
    /// Fails for paths that are not valid UTF-8 instead of writing a lossy copy.
    pub fn set_path(&mut self, section: &str, key: &str, path: &Path) -> Result<()> {
        let value = path.to_str().ok_or_else(|| ConfigError::NonUtf8Path {
            path: PathBuf::from(path),
        })?;
        self.set(section, key, value);
        Ok(())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Section names in document order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// `(key, value)` pairs of a section in document order
    pub fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        self.section(section)
            .into_iter()
            .flat_map(|s| s.entries())
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
            .collect()
    }

    /// Render the document back to INI text
    pub fn render(&self) -> String {
        let eol = self.eol.as_str();
        let mut out = String::new();
        for line in &self.preamble {
            render_line(&mut out, line, eol);
        }
        for section in &self.sections {
            push_chunk(&mut out, &section.header, eol);
            for line in &section.lines {
                render_line(&mut out, line, eol);
            }
        }
        out
    }

    /// Write the document to `path`, replacing the file atomically
    ///
    /// The contents are written to a temporary file next to `path` which is then
    /// renamed over it, so a crash never leaves a half-written configuration.
    /// Permissions of an existing file are carried over.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let write_err = |source: io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".davtls-")
            .tempfile_in(dir)
            .map_err(write_err)?;
        tmp.write_all(self.render().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
        }

        tmp.persist(path).map_err(|e| write_err(e.error))?;
        debug!(path = %path.display(), "configuration written");
        Ok(())
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn current_lines(&mut self) -> &mut Vec<Line> {
        match self.sections.last_mut() {
            Some(section) => &mut section.lines,
            None => &mut self.preamble,
        }
    }

    fn push_line(&mut self, line: Line) {
        self.current_lines().push(line);
    }

    fn append_section(&mut self, name: &str) {
        let needs_separator = match self.sections.last() {
            Some(last) => !last.ends_with_blank(),
            None => self
                .preamble
                .last()
                .is_some_and(|line| !matches!(line, Line::Raw(raw) if raw.trim().is_empty())),
        };
        if needs_separator {
            self.push_line(Line::Raw(self.eol.as_str().to_string()));
        }
        self.sections.push(Section::new(name, self.eol));
    }
}

/// Append a line, terminating an unterminated last line first
fn push_chunk(out: &mut String, chunk: &str, eol: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(chunk);
}

fn render_line(out: &mut String, line: &Line, eol: &str) {
    match line {
        Line::Raw(raw) => push_chunk(out, raw, eol),
        Line::Entry(Entry {
            source: Some(source),
            ..
        }) => {
            for chunk in source {
                push_chunk(out, chunk, eol);
            }
        }
        Line::Entry(Entry { key, value, .. }) => {
            let value = value.replace('\n', &format!("{eol}    "));
            push_chunk(out, &format!("{key} = {value}{eol}"), eol);
        }
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Radicale configuration
[server]
hosts = localhost:5232
# ssl = False
max_connections = 8

[auth]
type = htpasswd
htpasswd_filename = /etc/radicale/users

[storage]
filesystem_folder = ~/.var/lib/radicale/collections
";

    #[test]
    fn test_untouched_document_renders_identically() {
        let doc = ConfigDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_get_is_case_insensitive_on_keys() {
        let doc = ConfigDocument::parse("[server]\nSSL = yes\n").unwrap();
        assert_eq!(doc.get("server", "ssl"), Some("yes"));
        assert_eq!(doc.get_bool("server", "Ssl"), Some(true));
        assert_eq!(doc.get("Server", "ssl"), None);
    }

    #[test]
    fn test_colon_delimiter_and_continuation_lines() {
        let text = "[rights]\nfile: /etc/radicale/rights\nextra = first\n  second\n";
        let doc = ConfigDocument::parse(text).unwrap();
        assert_eq!(doc.get("rights", "file"), Some("/etc/radicale/rights"));
        assert_eq!(doc.get("rights", "extra"), Some("first\nsecond"));
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn test_set_existing_key_only_rewrites_that_line() {
        let mut doc = ConfigDocument::parse("[server]\nhosts=0.0.0.0:5232\nssl=False ; old\n").unwrap();
        doc.set("server", "ssl", "True");
        assert_eq!(doc.render(), "[server]\nhosts=0.0.0.0:5232\nssl = True\n");
    }

    #[test]
    fn test_set_same_value_keeps_original_formatting() {
        let mut doc = ConfigDocument::parse("[server]\nssl=True\n").unwrap();
        doc.set("server", "ssl", "True");
        assert_eq!(doc.render(), "[server]\nssl=True\n");
    }

    #[test]
    fn test_set_new_key_goes_after_last_entry() {
        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        doc.set("server", "certificate", "/tmp/server.crt");
        let rendered = doc.render();
        assert!(rendered.contains("max_connections = 8\ncertificate = /tmp/server.crt\n\n[auth]"));
    }

    #[test]
    fn test_set_missing_section_appends_it() {
        let mut doc = ConfigDocument::parse("[auth]\ntype = none").unwrap();
        doc.set("server", "ssl", "True");
        assert_eq!(doc.render(), "[auth]\ntype = none\n\n[server]\nssl = True\n");
        assert!(doc.has_section("server"));
        assert_eq!(doc.sections().collect::<Vec<_>>(), vec!["auth", "server"]);
    }

    #[test]
    fn test_set_on_empty_document() {
        let mut doc = ConfigDocument::new();
        doc.set("server", "ssl", "True");
        doc.set("server", "key", "/k");
        assert_eq!(doc.render(), "[server]\nssl = True\nkey = /k\n");
    }

    #[test]
    fn test_last_duplicate_wins() {
        let doc = ConfigDocument::parse("[server]\nssl = true\nssl = false\n").unwrap();
        assert_eq!(doc.get_bool("server", "ssl"), Some(false));
    }

    #[test]
    fn test_parse_bool_values() {
        for v in ["1", "yes", "TRUE", "On"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "No", "false", "OFF"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = ConfigDocument::parse("ssl = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));

        let err = ConfigDocument::parse("[server]\nhosts\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));

        let err = ConfigDocument::parse("[server\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_section_header_ignores_trailing_text() {
        let text = "[server] # radicale\nssl = True\n";
        let doc = ConfigDocument::parse(text).unwrap();
        assert_eq!(doc.sections().collect::<Vec<_>>(), vec!["server"]);
        assert_eq!(doc.get_bool("server", "ssl"), Some(true));
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn test_duplicate_section_is_rejected() {
        let err = ConfigDocument::parse("[server]\nssl = True\n[server]\nhosts = x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_crlf_lines_survive_a_rewrite() {
        let mut doc =
            ConfigDocument::parse("# c\r\n[auth]\r\ntype = none\r\n\r\n[server]\r\nhosts = x\r\n").unwrap();
        doc.set("server", "ssl", "True");
        doc.set("rights", "type", "owner_only");
        assert_eq!(
            doc.render(),
            "# c\r\n[auth]\r\ntype = none\r\n\r\n[server]\r\nhosts = x\r\nssl = True\r\n\r\n[rights]\r\ntype = owner_only\r\n"
        );
    }

    #[test]
    fn test_missing_final_newline_is_kept_until_something_follows() {
        let text = "[server]\nssl=True";
        let mut doc = ConfigDocument::parse(text).unwrap();
        assert_eq!(doc.render(), text);

        doc.set("server", "key", "/k");
        assert_eq!(doc.render(), "[server]\nssl=True\nkey = /k\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_set_path_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut doc = ConfigDocument::new();
        doc.set_path("server", "key", Path::new("/srv/dav/server.key")).unwrap();
        assert_eq!(doc.get("server", "key"), Some("/srv/dav/server.key"));

        let bad = Path::new(OsStr::from_bytes(b"/srv/dav/\xffserver.crt"));
        let err = doc.set_path("server", "certificate", bad).unwrap_err();
        assert!(matches!(err, ConfigError::NonUtf8Path { .. }));
        assert_eq!(doc.get("server", "certificate"), None);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ConfigDocument::load_or_default(dir.path().join("config")).unwrap();
        assert_eq!(doc, ConfigDocument::new());
        assert!(ConfigDocument::load(dir.path().join("config")).is_err());
    }

    #[test]
    fn test_save_round_trip_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config");

        let mut doc = ConfigDocument::parse(SAMPLE).unwrap();
        doc.set("server", "ssl", "True");
        doc.save(&path).unwrap();

        let reloaded = ConfigDocument::load(&path).unwrap();
        assert_eq!(reloaded, ConfigDocument::parse(&doc.render()).unwrap());
        assert_eq!(reloaded.get_bool("server", "ssl"), Some(true));
        assert_eq!(reloaded.entries("auth"), doc.entries("auth"));

        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "[server]\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let mut doc = ConfigDocument::load(&path).unwrap();
        doc.set("server", "ssl", "True");
        doc.save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
