use std::path::PathBuf;

/// Placeholder shown for any missing field.
pub const MISSING_FIELD: &str = "-";

/// Transcript stand-in when the engine failed or produced nothing usable.
pub const ENGINE_FAILURE_SENTINEL: &str = "[TRANSCRIPTION ERROR]";

/// Transcript stand-in when an item names no audio or the file is absent.
pub const MISSING_AUDIO_SENTINEL: &str = "[TRANSCRIPTION ERROR] (audio file not found)";

/// Body of the document emitted when full assembly fails.
pub const FALLBACK_MESSAGE: &str = "Transcript generated partially.";

/// One item's contribution to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub label: String,
    pub start: String,
    pub end: String,
    pub alias: String,
    pub unit_id: String,
    pub transcript: String,
}

impl ReportSection {
    /// Header lines in render order, as `(caption, value)`.
    pub fn header(&self) -> [(&'static str, &str); 5] {
        [
            ("Item", self.label.as_str()),
            ("Start", self.start.as_str()),
            ("End", self.end.as_str()),
            ("Alias", self.alias.as_str()),
            ("ID", self.unit_id.as_str()),
        ]
    }

    /// Transcript split into trimmed lines, blank lines kept.
    pub fn transcript_lines(&self) -> impl Iterator<Item = &str> {
        self.transcript.lines().map(str::trim)
    }

    /// Plain-text rendering, handy for logs and comparisons.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for (caption, value) in self.header() {
            out.push_str(caption);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push_str("Transcript:\n");
        for line in self.transcript_lines() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Fills a missing field with [`MISSING_FIELD`].
pub fn or_placeholder(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(MISSING_FIELD)
        .to_string()
}

/// Finished report location on disk plus whether it is the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledReport {
    pub path: PathBuf,
    pub sections: usize,
    pub fallback: bool,
}
