//! Recording-session export layout: scenario descriptor, item index and
//! per-item descriptors.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use walkdir::WalkDir;

use crate::processor::descriptor::Descriptor;

pub const SCENARIO_FILE_NAME: &str = "scenario.xml";

const INDEX_PATH: &str = "Scenario/Components/RecordedItems";
const INDEX_ITEM_PATH: &str = "RecordedItems/Item";
const WAVE_FILE_PATH: &str = "Item/AudioItem/LoggerRecordings/Recording/WaveFileName";
const START_TIME_PATH: &str = "Item/RecordedItem/SearchResults/SearchResult/CallId/StartTime";
const FIELD_PATH: &str = "Item/RecordedItem/SearchResults/SearchResult/Fields/Field";

/// Metadata fields copied from item descriptors; everything else is ignored.
pub const METADATA_FIELDS: [&str; 7] = [
    "CallType",
    "CallPriority",
    "TrunkGroup_Name",
    "IndividualAlias",
    "Agent_Name",
    "UnitID",
    "Stop_Time",
];

/// Recursive, case-insensitive search for the scenario descriptor.
/// Shallowest match wins; ties break by path order.
pub fn find_scenario(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(SCENARIO_FILE_NAME))
        })
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.into_path())
}

/// Converts `\`-separated references from the exporting system into local
/// paths.
pub fn normalize_separators(reference: &str) -> PathBuf {
    let normalized: String = reference
        .trim()
        .chars()
        .map(|c| if c == '\\' || c == '/' { MAIN_SEPARATOR } else { c })
        .collect();
    PathBuf::from(normalized)
}

/// Resolves `.` and `..` in `path` without touching the file system and
/// returns the result only when it stays under `root`.
pub fn contained_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = lexical_normalize(root);
    let resolved = lexical_normalize(path);
    resolved.starts_with(&root).then_some(resolved)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute path of the item index named by a scenario descriptor.
pub fn index_path(scenario: &Descriptor) -> Option<PathBuf> {
    let reference = scenario.text_at(INDEX_PATH)?;
    Some(scenario.directory().join(normalize_separators(reference)))
}

/// Number of items listed in an item index.
pub fn item_count(index: &Descriptor) -> usize {
    index.find_all(INDEX_ITEM_PATH).len()
}

/// Locates the descriptor for 1-based item `ordinal` next to the index:
/// the first `.xml` file (by name) inside directory `Item{n}`, otherwise
/// the flat file `Item{n}.xml`.
pub fn locate_item_descriptor(index_dir: &Path, ordinal: usize) -> Option<PathBuf> {
    let label = item_label(ordinal);

    let item_dir = index_dir.join(&label);
    if item_dir.is_dir() {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&item_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_xml_extension(path))
            .collect();
        candidates.sort();
        if let Some(first) = candidates.into_iter().next() {
            return Some(first);
        }
    }

    let flat = index_dir.join(format!("{}.xml", label));
    flat.is_file().then_some(flat)
}

pub fn item_label(ordinal: usize) -> String {
    format!("Item{}", ordinal)
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Facts pulled from one item descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemInfo {
    /// Audio file resolved against the descriptor's directory, if named.
    pub audio_path: Option<PathBuf>,
    pub start_time: Option<String>,
    /// Allow-listed metadata only.
    pub fields: BTreeMap<String, String>,
}

impl ItemInfo {
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        let audio_path = descriptor
            .text_at(WAVE_FILE_PATH)
            .filter(|name| *name != "-")
            .map(|name| descriptor.directory().join(normalize_separators(name)));

        let start_time = descriptor.text_at(START_TIME_PATH).map(str::to_string);

        let mut fields = BTreeMap::new();
        for field in descriptor.find_all(FIELD_PATH) {
            let Some(name) = field.attribute("Name") else {
                continue;
            };
            if !METADATA_FIELDS.contains(&name) || fields.contains_key(name) {
                continue;
            }
            if let Some(value) = field.text_at("Value") {
                fields.insert(name.to_string(), value.to_string());
            }
        }

        Self {
            audio_path,
            start_time,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
