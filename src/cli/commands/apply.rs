//! apply command - Stage, commit and instantiate a TOML batch plan
//!
//! # Plan format
//!
//! ```toml
//! [[event_folder]]
//! key = "boss"            # optional; lets later tables refer to this folder
//! name = "Boss"
//! parent = "{...}"        # optional; a plan key or existing id
//!
//! [[bank]]
//! key = "boss_bank"
//! name = "Boss"
//!
//! [[bus]]
//! name = "Boss Bus"
//! output = "{...}"        # optional; defaults to the master bus
//!
//! [[asset_folder]]
//! path = "Characters"
//!
//! [[asset_folder]]
//! path = "Characters/Boss"  # a parent path must exist or be in the plan
//!
//! [[event]]
//! template = "{...}"
//! name = "Boss_Attack"
//! folder = "boss"
//! bank = "boss_bank"
//! bus = "{...}"
//! media = ["atk1.wav=Characters/Boss"]
//! ```
//!
//! Keys are minted a fresh id before anything is staged, so a table may refer
//! to a key defined later in the file. Relative media sources are resolved
//! against the plan file's directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::Deserialize;

use crate::cli::args::MediaArg;
use crate::cli::Context;
use crate::core::ids::IdFactory;
use crate::core::staging::{PendingRecord, Staging};
use crate::core::store::ProjectStore;
use crate::core::types::{AssetPath, ManagedKind, ObjectId};
use crate::instantiate::{InstantiateRequest, Instantiator};
use crate::ui::output;

/// A parsed batch plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Plan {
    pub event_folder: Vec<FolderEntry>,
    pub bank_folder: Vec<FolderEntry>,
    pub bank: Vec<FolderEntry>,
    pub bus: Vec<BusEntry>,
    pub asset_folder: Vec<AssetFolderEntry>,
    pub event: Vec<EventEntry>,
}

/// An event folder, bank folder or bank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderEntry {
    pub key: Option<String>,
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusEntry {
    pub key: Option<String>,
    pub name: String,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetFolderEntry {
    pub key: Option<String>,
    pub path: AssetPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEntry {
    /// Key for the new event; a later event may use it as its template.
    pub key: Option<String>,
    pub template: String,
    pub name: String,
    pub folder: String,
    pub bank: String,
    pub bus: String,
    #[serde(default)]
    pub media: Vec<String>,
}

impl Plan {
    /// Parse a plan from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid plan")
    }

    /// Read and parse a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid plan {}", path.display()))
    }

    /// Every `key` in the plan, in file order by table.
    fn keys(&self) -> impl Iterator<Item = &str> {
        self.event_folder
            .iter()
            .chain(&self.bank_folder)
            .chain(&self.bank)
            .filter_map(|e| e.key.as_deref())
            .chain(self.bus.iter().filter_map(|e| e.key.as_deref()))
            .chain(self.asset_folder.iter().filter_map(|e| e.key.as_deref()))
            .chain(self.event.iter().filter_map(|e| e.key.as_deref()))
    }

    /// Number of folder, bank and bus records the plan stages.
    pub fn record_count(&self) -> usize {
        self.event_folder.len()
            + self.bank_folder.len()
            + self.bank.len()
            + self.bus.len()
            + self.asset_folder.len()
    }
}

/// Plan keys bound to minted ids.
#[derive(Debug, Default)]
struct Keys {
    ids: HashMap<String, ObjectId>,
}

impl Keys {
    fn mint(plan: &Plan, ids: &IdFactory) -> Result<Self> {
        let mut keys = Self::default();
        for key in plan.keys() {
            if keys.ids.insert(key.to_string(), ids.mint()).is_some() {
                bail!("Plan key '{}' is defined more than once", key);
            }
        }
        Ok(keys)
    }

    fn get(&self, key: &Option<String>) -> Option<&ObjectId> {
        key.as_ref().and_then(|k| self.ids.get(k))
    }

    /// A plan key's id, or the reference itself parsed as an id.
    fn resolve(&self, reference: &str) -> Result<ObjectId> {
        match self.ids.get(reference) {
            Some(id) => Ok(id.clone()),
            None => ObjectId::new(reference)
                .with_context(|| format!("'{}' is neither a plan key nor an object id", reference)),
        }
    }

    fn resolve_or(&self, reference: &Option<String>, default: &ObjectId) -> Result<ObjectId> {
        match reference {
            Some(r) => self.resolve(r),
            None => Ok(default.clone()),
        }
    }
}

/// Apply the plan at `path`.
pub fn apply(ctx: &Context, path: &Path, dry_run: bool) -> Result<()> {
    let plan = Plan::load(path)?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let _lock = if dry_run { None } else { Some(ctx.lock()?) };
    let mut store = ctx.open_store()?;

    let ids = IdFactory::new();
    let keys = Keys::mint(&plan, &ids)?;
    let mut staging = Staging::new();
    stage_plan(&plan, &keys, &ids, &store, &mut staging)?;
    let requests = event_requests(&plan, &keys, &base)?;

    if dry_run {
        for kind in ManagedKind::ALL {
            for entry in staging.entries(kind) {
                output::print(
                    format!("stage {} {} '{}'", kind, entry.id, entry.name),
                    ctx.verbosity,
                );
            }
        }
        for request in &requests {
            output::print(
                format!(
                    "instantiate '{}' from {} ({} media)",
                    request.name,
                    request.template,
                    request.media.len()
                ),
                ctx.verbosity,
            );
        }
        let discarded = staging.discard_all();
        output::print(
            format!("Dry run: {} record(s) discarded, nothing written.", discarded),
            ctx.verbosity,
        );
        return Ok(());
    }

    let counts = staging
        .commit_all(&mut store)
        .context("Failed to commit staged records")?;
    output::success(format!("Committed {}", counts), ctx.verbosity);

    let instantiator = Instantiator::new(&store, &ids).probe_media(ctx.config.probe_media());
    for (i, request) in requests.iter().enumerate() {
        let event = instantiator.instantiate(request).with_context(|| {
            format!(
                "Failed to instantiate '{}' ({} of {} events created)",
                request.name,
                i,
                requests.len()
            )
        })?;
        output::success(
            format!("Created event '{}' {}", request.name, event),
            ctx.verbosity,
        );
    }
    Ok(())
}

/// Stage every folder, bank, bus and asset folder record in the plan.
fn stage_plan(
    plan: &Plan,
    keys: &Keys,
    ids: &IdFactory,
    store: &ProjectStore,
    staging: &mut Staging,
) -> Result<()> {
    let masters = store.masters();

    let mut records: Vec<(ManagedKind, Option<&ObjectId>, PendingRecord)> =
        Vec::with_capacity(plan.record_count());
    for entry in &plan.event_folder {
        let parent = keys.resolve_or(&entry.parent, &masters.event_folder)?;
        records.push((
            ManagedKind::EventFolder,
            keys.get(&entry.key),
            PendingRecord::event_folder(ids, &entry.name, parent),
        ));
    }
    for entry in &plan.bank_folder {
        let parent = keys.resolve_or(&entry.parent, &masters.bank_folder)?;
        records.push((
            ManagedKind::Bank,
            keys.get(&entry.key),
            PendingRecord::bank_folder(ids, &entry.name, parent),
        ));
    }
    for entry in &plan.bank {
        let parent = keys.resolve_or(&entry.parent, &masters.bank_folder)?;
        records.push((
            ManagedKind::Bank,
            keys.get(&entry.key),
            PendingRecord::bank(ids, &entry.name, parent),
        ));
    }
    for entry in &plan.bus {
        let output = keys.resolve_or(&entry.output, store.master_bus())?;
        records.push((
            ManagedKind::Bus,
            keys.get(&entry.key),
            PendingRecord::bus(ids, &entry.name, output),
        ));
    }
    for entry in &plan.asset_folder {
        records.push((
            ManagedKind::AssetFolder,
            keys.get(&entry.key),
            PendingRecord::asset_folder(ids, &entry.path),
        ));
    }

    for (kind, key_id, mut record) in records {
        if let Some(id) = key_id {
            record.object.id = id.clone();
        }
        let id = record.id().clone();
        staging
            .stage(store, kind, record)
            .with_context(|| format!("Failed to stage {} {}", kind, id))?;
    }
    Ok(())
}

/// Build the plan's instantiate requests, resolving keys and media paths.
fn event_requests(plan: &Plan, keys: &Keys, base: &Path) -> Result<Vec<InstantiateRequest>> {
    plan.event
        .iter()
        .map(|entry| {
            let mut request = InstantiateRequest::new(
                keys.resolve(&entry.template)?,
                entry.name.clone(),
                keys.resolve(&entry.folder)?,
                keys.resolve(&entry.bank)?,
                keys.resolve(&entry.bus)?,
            );
            if let Some(id) = keys.get(&entry.key) {
                request = request.with_event_id(id.clone());
            }
            for media in &entry.media {
                let arg: MediaArg = media
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .with_context(|| format!("Invalid media for event '{}'", entry.name))?;
                request = request.with_media(resolve_source(base, arg.source), arg.target);
            }
            Ok(request)
        })
        .collect()
}

fn resolve_source(base: &Path, source: PathBuf) -> PathBuf {
    if source.is_absolute() {
        source
    } else {
        base.join(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
        [[event_folder]]
        key = "boss"
        name = "Boss"

        [[event_folder]]
        name = "Attacks"
        parent = "boss"

        [[bank]]
        key = "b"
        name = "Boss"

        [[asset_folder]]
        path = "Characters"

        [[asset_folder]]
        path = "Characters/Boss"

        [[event]]
        template = "{T}"
        name = "Boss_Attack"
        folder = "boss"
        bank = "b"
        bus = "{BUS}"
        media = ["sfx/atk1.wav=Characters/Boss"]
    "#;

    #[test]
    fn parses_plan() {
        let plan = Plan::parse(PLAN).unwrap();
        assert_eq!(plan.event_folder.len(), 2);
        assert_eq!(plan.bank.len(), 1);
        assert_eq!(plan.asset_folder[1].path.as_str(), "Characters/Boss/");
        assert_eq!(plan.event[0].media.len(), 1);
        assert_eq!(plan.record_count(), 5);
    }

    #[test]
    fn asset_folders_are_listed_parent_first() {
        let plan = Plan::parse(PLAN).unwrap();
        for (i, entry) in plan.asset_folder.iter().enumerate() {
            let parent = entry.path.parent().unwrap();
            let listed = plan.asset_folder[..i].iter().any(|e| e.path == parent);
            assert!(parent.is_root() || listed, "{} has no parent", entry.path);
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Plan::parse("[[bank]]\nname = \"x\"\ncolour = \"red\"\n").is_err());
        assert!(Plan::parse("[[widget]]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn keys_resolve_before_ids() {
        let plan = Plan::parse(PLAN).unwrap();
        let ids = IdFactory::new();
        let keys = Keys::mint(&plan, &ids).unwrap();
        assert_eq!(ids.issued(), 2);

        let boss = keys.resolve("boss").unwrap();
        assert!(boss.as_str().starts_with('{'));
        assert_eq!(keys.resolve("{BUS}").unwrap().as_str(), "{BUS}");
        assert!(keys.resolve("not an id").is_err());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let plan = Plan::parse(
            "[[bank]]\nkey = \"k\"\nname = \"a\"\n[[bus]]\nkey = \"k\"\nname = \"b\"\n",
        )
        .unwrap();
        assert!(Keys::mint(&plan, &IdFactory::new()).is_err());
    }

    #[test]
    fn event_requests_resolve_media_against_plan_dir() {
        let plan = Plan::parse(PLAN).unwrap();
        let keys = Keys::mint(&plan, &IdFactory::new()).unwrap();
        let requests = event_requests(&plan, &keys, Path::new("/plans")).unwrap();

        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.folder, keys.resolve("boss").unwrap());
        assert_eq!(request.bank, keys.resolve("b").unwrap());
        assert_eq!(request.template.as_str(), "{T}");
        assert_eq!(request.media[0].source, PathBuf::from("/plans/sfx/atk1.wav"));
        assert_eq!(request.media[0].target.as_str(), "Characters/Boss/");
        assert!(request.new_event_id.is_none());
    }
}
