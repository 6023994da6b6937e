//! instantiate::graft
//!
//! Builds the playback subgraph for a set of media files and attaches it to
//! a copied event.
//!
//! # Shape
//!
//! ```text
//! GroupTrack.modules ──┐
//! Timeline.modules ────┴─> MultiSound.sounds ─> SingleSound* ─> AudioFile*
//! ```
//!
//! AudioFile objects are returned separately; each lives in its own
//! document. Everything else joins the event graph. Template modules the
//! new `modules` edges no longer reach are removed by [`prune_unreachable`].

use std::collections::{HashSet, VecDeque};

use log::{debug, warn};

use super::probe::MediaInfo;
use crate::core::ids::IdFactory;
use crate::core::object::GraphObject;
use crate::core::store::EventGraph;
use crate::core::types::{ObjectClass, ObjectId};

/// One media file, resolved to its asset-relative path and probed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMedia {
    /// Asset path of the copied file, e.g. `Characters/Boss/atk1.wav`.
    pub asset_path: String,
    pub info: Option<MediaInfo>,
}

/// Build the AudioFile object for one media file.
pub fn audio_file(id: ObjectId, media: &PreparedMedia, master_asset_folder: &ObjectId) -> GraphObject {
    let mut object =
        GraphObject::new(id, ObjectClass::AudioFile).with_property("assetPath", &media.asset_path);
    match &media.info {
        Some(info) => {
            object.set_property("frequencyKHz", info.frequency_khz().to_string());
            object.set_property("channelCount", info.channels.to_string());
            object.set_property("length", info.duration_secs().to_string());
        }
        None => object.set_property("length", 0.0f64.to_string()),
    }
    object.with_edge("masterAssetFolder", [master_asset_folder.clone()])
}

/// Attach a MultiSound over `media` to `graph`'s group track and timeline.
///
/// Returns the AudioFile objects in media order. Does nothing for empty
/// media.
pub fn graft_media(
    graph: &mut EventGraph,
    media: &[PreparedMedia],
    ids: &IdFactory,
    master_asset_folder: &ObjectId,
) -> Vec<GraphObject> {
    let Some(first) = media.first() else {
        return Vec::new();
    };

    let mut audio_files = Vec::with_capacity(media.len());
    let mut sound_ids = Vec::with_capacity(media.len());
    for item in media {
        let audio = audio_file(ids.mint(), item, master_asset_folder);
        let sound = GraphObject::new(ids.mint(), ObjectClass::SingleSound)
            .with_edge("audioFile", [audio.id.clone()]);
        sound_ids.push(sound.id.clone());
        graph.nodes.insert(sound.id.clone(), sound);
        audio_files.push(audio);
    }

    let length = match &first.info {
        Some(info) => info.duration_secs(),
        None => {
            warn!(
                "no duration for {}; multi sound length set to 0",
                first.asset_path
            );
            0.0
        }
    };
    let multi = GraphObject::new(ids.mint(), ObjectClass::MultiSound)
        .with_property("length", length.to_string())
        .with_edge("sounds", sound_ids);
    let multi_id = multi.id.clone();
    graph.nodes.insert(multi_id.clone(), multi);

    let existing = graph
        .of_class(&ObjectClass::GroupTrack)
        .next()
        .map(|t| t.id.clone());
    let track = match existing {
        Some(track) => track,
        None => synthesize_group_track(graph, ids),
    };
    if let Some(track) = graph.nodes.get_mut(&track) {
        track.set_edge("modules", [multi_id.clone()]);
    }

    let timeline = graph
        .root_object()
        .and_then(|root| root.single_edge("timeline"))
        .filter(|id| graph.contains(id))
        .cloned()
        .or_else(|| {
            graph
                .of_class(&ObjectClass::Timeline)
                .next()
                .map(|t| t.id.clone())
        });
    if let Some(timeline) = timeline.and_then(|id| graph.nodes.get_mut(&id)) {
        timeline.set_edge("modules", [multi_id]);
    }

    debug!(
        "grafted {} sounds onto event {}",
        audio_files.len(),
        graph.root
    );
    audio_files
}

/// Create a group track with its own event mixer group and attach it to the
/// root. Returns the track id.
fn synthesize_group_track(graph: &mut EventGraph, ids: &IdFactory) -> ObjectId {
    let master = graph
        .of_class(&ObjectClass::EventMixerMaster)
        .next()
        .map(|m| m.id.clone());
    let name = graph
        .root_object()
        .and_then(GraphObject::name)
        .unwrap_or_default()
        .to_string();

    let fader = GraphObject::new(ids.mint(), ObjectClass::MixerBusFader);
    let panner = GraphObject::new(ids.mint(), ObjectClass::MixerBusPanner);
    let chain = GraphObject::new(ids.mint(), ObjectClass::MixerBusEffectChain)
        .with_edge("effects", [fader.id.clone()]);
    let mut group = GraphObject::new(ids.mint(), ObjectClass::EventMixerGroup)
        .with_property("name", name)
        .with_edge("effectChain", [chain.id.clone()])
        .with_edge("panner", [panner.id.clone()]);
    if let Some(master) = master {
        group.set_edge("output", [master]);
    }
    let track = GraphObject::new(ids.mint(), ObjectClass::GroupTrack)
        .with_edge("mixerGroup", [group.id.clone()]);
    let track_id = track.id.clone();

    let root_id = graph.root.clone();
    if let Some(root) = graph.nodes.get_mut(&root_id) {
        root.push_edge("groupTracks", track_id.clone());
    }
    for object in [track, group, chain, panner, fader] {
        graph.nodes.insert(object.id.clone(), object);
    }
    debug!("synthesized group track {} for event {}", track_id, root_id);
    track_id
}

/// Remove nodes no longer reachable from the root. Returns how many.
pub fn prune_unreachable(graph: &mut EventGraph) -> usize {
    let mut reached: HashSet<ObjectId> = HashSet::from([graph.root.clone()]);
    let mut queue = VecDeque::from([graph.root.clone()]);
    while let Some(id) = queue.pop_front() {
        let Some(node) = graph.nodes.get(&id) else {
            continue;
        };
        for (_, dest) in node.outgoing() {
            if graph.nodes.contains_key(dest) && reached.insert(dest.clone()) {
                queue.push_back(dest.clone());
            }
        }
    }

    let before = graph.nodes.len();
    graph.nodes.retain(|id, _| reached.contains(id));
    let pruned = before - graph.nodes.len();
    if pruned > 0 {
        debug!("pruned {} unreachable template nodes", pruned);
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SerializationModel;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    fn graph(objects: Vec<GraphObject>) -> EventGraph {
        EventGraph::extract(
            &id("E"),
            SerializationModel::new("Studio.02.02.00").unwrap(),
            &objects,
        )
        .unwrap()
    }

    fn media(names: &[&str]) -> Vec<PreparedMedia> {
        names
            .iter()
            .map(|n| PreparedMedia {
                asset_path: format!("Sfx/{n}"),
                info: Some(MediaInfo {
                    sample_rate: 48_000,
                    channels: 1,
                    frames: 96_000,
                }),
            })
            .collect()
    }

    fn with_track() -> EventGraph {
        graph(vec![
            GraphObject::new(id("E"), ObjectClass::Event)
                .with_edge("groupTracks", [id("GT")])
                .with_edge("timeline", [id("T")]),
            GraphObject::new(id("GT"), ObjectClass::GroupTrack).with_edge("modules", [id("OLD")]),
            GraphObject::new(id("T"), ObjectClass::Timeline).with_edge("modules", [id("OLD")]),
            GraphObject::new(id("OLD"), ObjectClass::SingleSound),
        ])
    }

    #[test]
    fn audio_file_properties() {
        let item = &media(&["a.wav"])[0];
        let audio = audio_file(id("A"), item, &id("MAF"));
        assert_eq!(audio.property("assetPath"), Some("Sfx/a.wav"));
        assert_eq!(audio.property("frequencyKHz"), Some("48"));
        assert_eq!(audio.property("channelCount"), Some("1"));
        assert_eq!(audio.property("length"), Some("2"));
        assert_eq!(audio.edge("masterAssetFolder"), &[id("MAF")]);
    }

    #[test]
    fn unprobed_audio_file_has_zero_length() {
        let item = PreparedMedia {
            asset_path: "x.ogg".into(),
            info: None,
        };
        let audio = audio_file(id("A"), &item, &id("MAF"));
        assert_eq!(audio.property("length"), Some("0"));
        assert!(audio.property("frequencyKHz").is_none());
    }

    #[test]
    fn graft_replaces_modules_in_order() {
        let mut g = with_track();
        let ids = IdFactory::new();
        let audio = graft_media(&mut g, &media(&["1.wav", "2.wav", "3.wav"]), &ids, &id("MAF"));
        assert_eq!(audio.len(), 3);

        let multi = g.of_class(&ObjectClass::MultiSound).next().unwrap().clone();
        assert_eq!(multi.property("length"), Some("2"));
        let sounds = multi.edge("sounds");
        assert_eq!(sounds.len(), 3);
        for (sound, file) in sounds.iter().zip(&audio) {
            assert_eq!(g.get(sound).unwrap().edge("audioFile"), &[file.id.clone()]);
        }
        assert_eq!(g.get(&id("GT")).unwrap().edge("modules"), &[multi.id.clone()]);
        assert_eq!(g.get(&id("T")).unwrap().edge("modules"), &[multi.id.clone()]);

        assert_eq!(prune_unreachable(&mut g), 1);
        assert!(!g.contains(&id("OLD")));
    }

    #[test]
    fn missing_group_track_is_synthesized() {
        let mut g = graph(vec![
            GraphObject::new(id("E"), ObjectClass::Event)
                .with_property("name", "Hit")
                .with_edge("mixer", [id("M")]),
            GraphObject::new(id("M"), ObjectClass::EventMixer).with_edge("masterBus", [id("EMM")]),
            GraphObject::new(id("EMM"), ObjectClass::EventMixerMaster),
        ]);
        graft_media(&mut g, &media(&["a.wav"]), &IdFactory::new(), &id("MAF"));

        let track_id = g.root_object().unwrap().single_edge("groupTracks").unwrap().clone();
        let track = g.get(&track_id).unwrap();
        assert_eq!(track.class, ObjectClass::GroupTrack);
        let group = g.get(track.single_edge("mixerGroup").unwrap()).unwrap();
        assert_eq!(group.class, ObjectClass::EventMixerGroup);
        assert_eq!(group.name(), Some("Hit"));
        assert_eq!(group.edge("output"), &[id("EMM")]);
        assert_eq!(prune_unreachable(&mut g), 0);
    }

    #[test]
    fn empty_media_is_a_no_op() {
        let mut g = with_track();
        let before = g.clone();
        assert!(graft_media(&mut g, &[], &IdFactory::new(), &id("MAF")).is_empty());
        assert_eq!(g, before);
    }
}
