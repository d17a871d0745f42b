//! Builders for recording-session exports.
//!
//! Layout produced (with the default `Export` root):
//!
//! ```text
//! Export/scenario.xml
//! Export/Items/RecordedItems.xml
//! Export/Items/Item1/item.xml        (directory layout)
//! Export/Items/Item1/call1.wav
//! Export/Items/Item2.xml             (flat layout)
//! Export/Items/call2.wav
//! ```

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Where an item's descriptor lives, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLayout {
    Directory,
    Flat,
    Missing,
}

#[derive(Debug, Clone)]
pub struct ItemSpec {
    pub layout: DescriptorLayout,
    /// Value of `WaveFileName`; `None` writes `-`.
    pub audio: Option<String>,
    /// Whether the referenced audio file is shipped in the archive.
    pub ship_audio: bool,
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    pub alias: Option<String>,
    pub unit_id: Option<String>,
}

impl ItemSpec {
    /// Item with audio `call{n}.wav` and full metadata.
    pub fn with_audio(n: usize) -> Self {
        Self {
            layout: DescriptorLayout::Directory,
            audio: Some(format!("call{}.wav", n)),
            ship_audio: true,
            start_time: Some(format!("2024-05-12 08:{:02}:00", n)),
            stop_time: Some(format!("2024-05-12 08:{:02}:30", n)),
            alias: Some(format!("Patrol {}", n)),
            unit_id: Some(format!("U-{}", n)),
        }
    }

    /// Descriptor names an audio file that is not in the archive.
    pub fn missing_audio(n: usize) -> Self {
        Self {
            ship_audio: false,
            ..Self::with_audio(n)
        }
    }

    /// No descriptor at all; the item is skipped.
    pub fn without_descriptor(n: usize) -> Self {
        Self {
            layout: DescriptorLayout::Missing,
            ..Self::with_audio(n)
        }
    }

    /// Descriptor points at an arbitrary `WaveFileName`; nothing is shipped.
    pub fn referencing(n: usize, reference: &str) -> Self {
        Self {
            audio: Some(reference.to_string()),
            ship_audio: false,
            ..Self::with_audio(n)
        }
    }

    pub fn flat(mut self) -> Self {
        self.layout = DescriptorLayout::Flat;
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.start_time = None;
        self.stop_time = None;
        self.alias = None;
        self.unit_id = None;
        self
    }
}

/// Builds the files of one export and writes them as a zip or a tree.
pub struct ScenarioBuilder {
    root: String,
    scenario_name: String,
    items: Vec<ItemSpec>,
    include_scenario: bool,
    include_index: bool,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            root: "Export".to_string(),
            scenario_name: "scenario.xml".to_string(),
            items: Vec::new(),
            include_scenario: true,
            include_index: true,
        }
    }

    /// `count` items, each with shipped audio and full metadata.
    pub fn with_items(count: usize) -> Self {
        let mut builder = Self::new();
        for n in 1..=count {
            builder = builder.item(ItemSpec::with_audio(n));
        }
        builder
    }

    pub fn item(mut self, item: ItemSpec) -> Self {
        self.items.push(item);
        self
    }

    pub fn root(mut self, root: &str) -> Self {
        self.root = root.to_string();
        self
    }

    pub fn scenario_name(mut self, name: &str) -> Self {
        self.scenario_name = name.to_string();
        self
    }

    pub fn without_scenario(mut self) -> Self {
        self.include_scenario = false;
        self
    }

    pub fn without_index(mut self) -> Self {
        self.include_index = false;
        self
    }

    fn prefixed(&self, path: &str) -> String {
        if self.root.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.root, path)
        }
    }

    /// `(relative path, content)` pairs of every file in the export.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();

        if self.include_scenario {
            let scenario = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                <Scenario>\n  <Name>Night shift</Name>\n  <Components>\n    \
                <RecordedItems>Items\\RecordedItems.xml</RecordedItems>\n  \
                </Components>\n</Scenario>\n";
            files.push((self.prefixed(&self.scenario_name), scenario.as_bytes().to_vec()));
        }

        if self.include_index {
            let mut index = String::from("<?xml version=\"1.0\"?>\n<RecordedItems>\n");
            for n in 1..=self.items.len() {
                index.push_str(&format!("  <Item Id=\"{}\"/>\n", n));
            }
            index.push_str("</RecordedItems>\n");
            files.push((self.prefixed("Items/RecordedItems.xml"), index.into_bytes()));
        }

        for (i, item) in self.items.iter().enumerate() {
            let n = i + 1;
            let dir = match item.layout {
                DescriptorLayout::Directory => format!("Items/Item{}/", n),
                DescriptorLayout::Flat | DescriptorLayout::Missing => "Items/".to_string(),
            };
            match item.layout {
                DescriptorLayout::Directory => {
                    files.push((self.prefixed(&format!("{}item.xml", dir)), item_xml(item)))
                }
                DescriptorLayout::Flat => files.push((
                    self.prefixed(&format!("Items/Item{}.xml", n)),
                    item_xml(item),
                )),
                DescriptorLayout::Missing => {}
            }
            if let (Some(audio), true) = (&item.audio, item.ship_audio) {
                files.push((
                    self.prefixed(&format!("{}{}", dir, audio)),
                    format!("RIFF fake audio {}", n).into_bytes(),
                ));
            }
        }

        files
    }

    pub fn write_zip(&self, path: &Path) -> PathBuf {
        let file = std::fs::File::create(path).expect("Failed to create archive");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in self.files() {
            zip.start_file(name, options).expect("Failed to start zip entry");
            zip.write_all(&content).expect("Failed to write zip entry");
        }
        zip.finish().expect("Failed to finish archive");
        path.to_path_buf()
    }

    /// Writes the export as an already-extracted tree under `dir`.
    pub fn write_tree(&self, dir: &Path) {
        for (name, content) in self.files() {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create directory");
            }
            std::fs::write(&path, content).expect("Failed to write file");
        }
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn item_xml(item: &ItemSpec) -> Vec<u8> {
    let wave = item.audio.as_deref().unwrap_or("-");
    let mut fields = String::new();
    for (name, value) in [
        ("IndividualAlias", &item.alias),
        ("UnitID", &item.unit_id),
        ("Stop_Time", &item.stop_time),
    ] {
        if let Some(value) = value {
            fields.push_str(&format!(
                "        <Field Name=\"{}\"><Value>{}</Value></Field>\n",
                name, value
            ));
        }
    }
    fields.push_str("        <Field Name=\"Operator_Notes\"><Value>ignored</Value></Field>\n");

    let start = item
        .start_time
        .as_ref()
        .map(|s| format!("<CallId><StartTime>{}</StartTime></CallId>", s))
        .unwrap_or_default();

    format!(
        "<?xml version=\"1.0\"?>\n<Item>\n  <AudioItem><LoggerRecordings><Recording>\
         <WaveFileName>{wave}</WaveFileName></Recording></LoggerRecordings></AudioItem>\n  \
         <RecordedItem><SearchResults><SearchResult>\n      {start}\n      <Fields>\n{fields}      \
         </Fields>\n  </SearchResult></SearchResults></RecordedItem>\n</Item>\n"
    )
    .into_bytes()
}
