//! Shared fixtures for integration tests.
//!
//! [`TestProject`] writes a small but complete project into a temp dir:
//!
//! ```text
//! master event folder
//! ├── Templates            (TEMPLATES)   holds Template_Hit (TEMPLATE)
//! └── Gameplay             (GAMEPLAY)
//!     └── Combat           (COMBAT)      holds Footstep (FOOTSTEP)
//! master bank folder
//! └── Main                 (BANK)
//! master bus               (MASTER_BUS)
//! └── SFX                  (BUS)
//! master asset folder
//! └── Sfx/                 (ASSET_SFX)
//! ```

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use eventforge::core::object::GraphObject;
use eventforge::core::paths::ProjectPaths;
use eventforge::core::store::ProjectStore;
use eventforge::core::types::{ObjectClass, ObjectId, SerializationModel};
use eventforge::core::xml::{write_document, ObjectDocument};

pub const MODEL: &str = "Studio.02.02.00";

pub const WORKSPACE: &str = "{workspace}";
pub const MASTER_EVENT_FOLDER: &str = "{master-event-folder}";
pub const MASTER_BANK_FOLDER: &str = "{master-bank-folder}";
pub const MASTER_ASSET_FOLDER: &str = "{master-asset-folder}";
pub const MASTER_BUS: &str = "{master-bus}";

pub const TEMPLATES: &str = "{folder-templates}";
pub const GAMEPLAY: &str = "{folder-gameplay}";
pub const COMBAT: &str = "{folder-combat}";
pub const BANK: &str = "{bank-main}";
pub const BUS: &str = "{bus-sfx}";
pub const ASSET_SFX: &str = "{asset-sfx}";

pub const TEMPLATE: &str = "{event-template}";
pub const FOOTSTEP: &str = "{event-footstep}";
pub const TEMPLATE_AUDIO: &str = "{audio-old}";

/// Number of objects in the template event's document closure.
pub const TEMPLATE_NODES: usize = 10;

pub fn id(s: &str) -> ObjectId {
    ObjectId::new(s).unwrap()
}

fn object(id_str: &str, class: ObjectClass) -> GraphObject {
    GraphObject::new(id(id_str), class)
}

/// A project on disk for one test.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// A project with masters, folders, a bank, a bus, an asset folder and
    /// two events.
    pub fn new() -> Self {
        let project = Self::bare();
        project.write_masters();
        project.write_hierarchy();
        project.write_template();
        project.write_footstep();
        project
    }

    /// An empty temp dir with no project files.
    pub fn bare() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::create_dir_all(dir.path().join("project")).unwrap();
        fs::create_dir_all(dir.path().join("media")).unwrap();
        Self { dir }
    }

    /// Project root.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    /// Directory for media sources, outside the project.
    pub fn media_dir(&self) -> PathBuf {
        self.dir.path().join("media")
    }

    /// Scratch directory used as HOME for CLI runs.
    pub fn home(&self) -> PathBuf {
        let home = self.dir.path().join("home");
        fs::create_dir_all(&home).unwrap();
        home
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(self.path())
    }

    pub fn open(&self) -> ProjectStore {
        ProjectStore::open(self.paths()).expect("failed to open project")
    }

    /// Write a document under `Metadata/`.
    pub fn write(&self, relative: &str, objects: Vec<GraphObject>) {
        let doc = ObjectDocument::new(SerializationModel::new(MODEL).unwrap(), objects);
        let path = self.path().join("Metadata").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, write_document(&doc).unwrap()).unwrap();
    }

    /// Write a silent 16-bit WAV into the media directory.
    pub fn write_wav(&self, name: &str, sample_rate: u32, channels: u16, frames: u32) -> PathBuf {
        let path = self.media_dir().join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..frames * u32::from(channels) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    /// Every file in the project, project-relative, excluding tool state.
    pub fn files(&self) -> BTreeSet<PathBuf> {
        let root = self.path();
        let mut files = BTreeSet::new();
        collect_files(&root, &root, &mut files);
        files
    }

    fn write_masters(&self) {
        self.write(
            "Workspace.xml",
            vec![
                object(WORKSPACE, ObjectClass::Workspace)
                    .with_edge("masterEventFolder", [id(MASTER_EVENT_FOLDER)])
                    .with_edge("masterBankFolder", [id(MASTER_BANK_FOLDER)])
                    .with_edge("masterAssetFolder", [id(MASTER_ASSET_FOLDER)]),
                object(MASTER_EVENT_FOLDER, ObjectClass::MasterEventFolder),
                object(MASTER_BANK_FOLDER, ObjectClass::MasterBankFolder),
                object(MASTER_ASSET_FOLDER, ObjectClass::MasterAssetFolder),
            ],
        );
        self.write(
            "Master.xml",
            vec![
                object(MASTER_BUS, ObjectClass::MixerMaster)
                    .with_property("name", "Master Bus")
                    .with_edge("effectChain", [id("{master-chain}")]),
                object("{master-chain}", ObjectClass::MixerBusEffectChain),
            ],
        );
    }

    fn write_hierarchy(&self) {
        for (folder, name, parent) in [
            (TEMPLATES, "Templates", MASTER_EVENT_FOLDER),
            (GAMEPLAY, "Gameplay", MASTER_EVENT_FOLDER),
            (COMBAT, "Combat", GAMEPLAY),
        ] {
            self.write(
                &format!("EventFolder/{folder}.xml"),
                vec![object(folder, ObjectClass::EventFolder)
                    .with_property("name", name)
                    .with_edge("folder", [id(parent)])],
            );
        }
        self.write(
            &format!("Bank/{BANK}.xml"),
            vec![object(BANK, ObjectClass::Bank)
                .with_property("name", "Main")
                .with_edge("folder", [id(MASTER_BANK_FOLDER)])],
        );
        self.write(
            &format!("Group/{BUS}.xml"),
            vec![object(BUS, ObjectClass::MixerGroup)
                .with_property("name", "SFX")
                .with_edge("output", [id(MASTER_BUS)])],
        );
        self.write(
            &format!("Asset/{ASSET_SFX}.xml"),
            vec![object(ASSET_SFX, ObjectClass::AssetFolder).with_property("assetPath", "Sfx/")],
        );
        self.write(
            &format!("AudioFile/{TEMPLATE_AUDIO}.xml"),
            vec![object(TEMPLATE_AUDIO, ObjectClass::AudioFile)
                .with_property("assetPath", "Sfx/old.wav")
                .with_edge("masterAssetFolder", [id(MASTER_ASSET_FOLDER)])],
        );
    }

    /// Template_Hit: a group track and the timeline both play one sound.
    fn write_template(&self) {
        self.write(
            &format!("Event/{TEMPLATE}.xml"),
            vec![
                object(TEMPLATE, ObjectClass::Event)
                    .with_property("name", "Template_Hit")
                    .with_edge("folder", [id(TEMPLATES)])
                    .with_edge("banks", [id(BANK)])
                    .with_edge("mixer", [id("{t-mixer}")])
                    .with_edge("masterTrack", [id("{t-master-track}")])
                    .with_edge("mixerInput", [id("{t-input}")])
                    .with_edge("groupTracks", [id("{t-track}")])
                    .with_edge("timeline", [id("{t-timeline}")])
                    .with_edge("automatableProperties", [id("{t-props}")]),
                object("{t-mixer}", ObjectClass::EventMixer)
                    .with_edge("masterBus", [id("{t-mixer-master}")]),
                object("{t-mixer-master}", ObjectClass::EventMixerMaster),
                object("{t-master-track}", ObjectClass::MasterTrack)
                    .with_edge("mixerGroup", [id("{t-mixer-master}")]),
                object("{t-input}", ObjectClass::MixerInput).with_edge("output", [id(BUS)]),
                object("{t-track}", ObjectClass::GroupTrack)
                    .with_edge("modules", [id("{t-sound}")])
                    .with_edge("mixerGroup", [id("{t-group}")]),
                object("{t-group}", ObjectClass::EventMixerGroup)
                    .with_property("name", "Audio 1")
                    .with_edge("output", [id("{t-mixer-master}")]),
                object("{t-timeline}", ObjectClass::Timeline)
                    .with_edge("modules", [id("{t-sound}")]),
                object("{t-sound}", ObjectClass::SingleSound)
                    .with_property("length", "1.5")
                    .with_edge("audioFile", [id(TEMPLATE_AUDIO)]),
                object("{t-props}", ObjectClass::parse("EventAutomatableProperties"))
                    .with_property("maxVoices", "4"),
            ],
        );
    }

    fn write_footstep(&self) {
        self.write(
            &format!("Event/{FOOTSTEP}.xml"),
            vec![object(FOOTSTEP, ObjectClass::Event)
                .with_property("name", "Footstep")
                .with_edge("folder", [id(COMBAT)])
                .with_edge("banks", [id(BANK)])],
        );
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut BTreeSet<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.file_name().is_some_and(|n| n == ".eventforge") {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, files);
        } else {
            files.insert(path.strip_prefix(root).unwrap().to_path_buf());
        }
    }
}
