//! Submix tree
//!
//! Submixes form a tree rooted at the master (always [`SubmixId::MASTER`]).
//! Every block the graph is processed children-first along a post-order
//! computed when the graph is built:
//!
//! ```text
//!   child output ──cos(w·π/2)──► parent dry ─────────────────┐
//!                └─sin(w·π/2)──► parent wet ──► effects ──► + ──► parent output
//!   sources ──dry──► parent dry     (w = child wet level)
//!           └─wet──► parent wet
//! ```
//!
//! The master's output is the device output.

use std::collections::HashMap;

use basedrop::{Handle, Owned};

use super::error::{SubmixError, SubmixResult};
use crate::config::SubmixConfig;
use crate::dsp::{constant_power_gains, InterpolatedParam};
use crate::effect::{EffectChain, EffectSlot, MAX_SUBMIX_EFFECTS};
use crate::source::SourceManager;
use crate::types::{AudioBuffer, RenderFormat, SourceId, SubmixId};

/// Name the master submix is addressed by in configuration
pub const MASTER_SUBMIX_NAME: &str = "master";

struct SubmixNode {
    name: String,
    parent: Option<SubmixId>,
    children: Vec<SubmixId>,
    /// Voices mixed directly into this submix
    sources: Vec<SourceId>,
    effects: EffectChain,
    dry: AudioBuffer,
    wet: AudioBuffer,
}

/// Arena of submixes plus their processing order
pub struct SubmixGraph {
    format: RenderFormat,
    nodes: Vec<SubmixNode>,
    /// Indexed like `nodes`; kept apart so a parent can ramp its children
    wet_levels: Vec<InterpolatedParam>,
    outputs: Vec<AudioBuffer>,
    /// Post-order: every child precedes its parent, master is last
    order: Vec<SubmixId>,
}

impl SubmixGraph {
    /// Build the tree described by `configs`
    ///
    /// The master always exists; a config entry named `master` only adds
    /// effects to it. Entries without a parent hang off the master.
    pub fn build(
        configs: &[SubmixConfig],
        format: RenderFormat,
        max_sources: usize,
        ramp_frames: u32,
        gc: &Handle,
    ) -> SubmixResult<Self> {
        let mut ids: HashMap<&str, SubmixId> = HashMap::new();
        ids.insert(MASTER_SUBMIX_NAME, SubmixId::MASTER);

        // Master first, then every other entry in declaration order
        let mut entries: Vec<Option<&SubmixConfig>> = vec![None];
        let mut master_seen = false;
        for config in configs {
            if config.name == MASTER_SUBMIX_NAME {
                if master_seen {
                    return Err(SubmixError::DuplicateName {
                        name: config.name.clone(),
                    });
                }
                if let Some(parent) = &config.parent {
                    return Err(SubmixError::MasterHasParent {
                        parent: parent.clone(),
                    });
                }
                master_seen = true;
                entries[0] = Some(config);
                continue;
            }
            if ids.contains_key(config.name.as_str()) {
                return Err(SubmixError::DuplicateName {
                    name: config.name.clone(),
                });
            }
            ids.insert(&config.name, SubmixId(entries.len()));
            entries.push(Some(config));
        }

        let mut nodes = Vec::with_capacity(entries.len());
        let mut wet_levels = Vec::with_capacity(entries.len());
        for entry in &entries {
            let name = entry.map_or(MASTER_SUBMIX_NAME, |c| c.name.as_str());
            let parent = match entry {
                None => None,
                Some(c) if c.name == MASTER_SUBMIX_NAME => None,
                Some(c) => {
                    let parent_name = c.parent.as_deref().unwrap_or(MASTER_SUBMIX_NAME);
                    let parent = ids.get(parent_name).copied().ok_or_else(|| {
                        SubmixError::UnknownParent {
                            name: c.name.clone(),
                            parent: parent_name.to_string(),
                        }
                    })?;
                    Some(parent)
                }
            };

            let effect_configs = entry.map_or(&[][..], |c| c.effects.as_slice());
            if effect_configs.len() > MAX_SUBMIX_EFFECTS {
                return Err(SubmixError::TooManyEffects {
                    name: name.to_string(),
                    count: effect_configs.len(),
                    max: MAX_SUBMIX_EFFECTS,
                });
            }
            let id = SubmixId(nodes.len());
            let mut effects = EffectChain::new();
            for effect_config in effect_configs {
                let effect = effect_config.build(format.sample_rate, format.num_channels);
                effects
                    .push(Owned::new(gc, effect))
                    .map_err(|source| SubmixError::Effect { submix: id, source })?;
            }

            let mut wet_level = InterpolatedParam::new(ramp_frames);
            wet_level.set_value(entry.map_or(0.0, |c| c.wet_level.clamp(0.0, 1.0)));
            wet_levels.push(wet_level);

            nodes.push(SubmixNode {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                sources: Vec::with_capacity(max_sources),
                effects,
                dry: AudioBuffer::with_capacity(format.num_channels, format.max_block_frames),
                wet: AudioBuffer::with_capacity(format.num_channels, format.max_block_frames),
            });
        }

        for index in 0..nodes.len() {
            if let Some(parent) = nodes[index].parent {
                nodes[parent.index()].children.push(SubmixId(index));
            }
        }

        let mut order = Vec::with_capacity(nodes.len());
        let mut visited = vec![false; nodes.len()];
        post_order(&nodes, SubmixId::MASTER, &mut visited, &mut order);
        if let Some(unreached) = visited.iter().position(|v| !v) {
            return Err(SubmixError::Cycle {
                name: nodes[unreached].name.clone(),
            });
        }

        let outputs = (0..nodes.len())
            .map(|_| AudioBuffer::with_capacity(format.num_channels, format.max_block_frames))
            .collect();

        log::debug!(
            "Submix graph built: {} submixes ({})",
            nodes.len(),
            nodes
                .iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            format,
            nodes,
            wet_levels,
            outputs,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, submix: SubmixId) -> bool {
        submix.index() < self.nodes.len()
    }

    pub fn name(&self, submix: SubmixId) -> Option<&str> {
        self.nodes.get(submix.index()).map(|n| n.name.as_str())
    }

    pub fn parent(&self, submix: SubmixId) -> Option<SubmixId> {
        self.nodes.get(submix.index()).and_then(|n| n.parent)
    }

    /// Look up a submix by its configured name
    pub fn find(&self, name: &str) -> Option<SubmixId> {
        self.nodes.iter().position(|n| n.name == name).map(SubmixId)
    }

    pub fn effect_count(&self, submix: SubmixId) -> usize {
        self.nodes
            .get(submix.index())
            .map_or(0, |n| n.effects.len())
    }

    /// Names of a submix's effects, in processing order
    pub fn effect_names(&self, submix: SubmixId) -> Vec<&str> {
        self.nodes
            .get(submix.index())
            .map(|n| n.effects.names().collect())
            .unwrap_or_default()
    }

    /// Processing order (children before parents)
    pub fn order(&self) -> &[SubmixId] {
        &self.order
    }

    // ─────────────────────────────────────────────────────────────
    // Source routing
    // ─────────────────────────────────────────────────────────────

    /// Route a voice into `submix` (unknown submixes fall back to master)
    pub fn attach(&mut self, source: SourceId, submix: SubmixId) -> SubmixId {
        let submix = if self.contains(submix) {
            submix
        } else {
            SubmixId::MASTER
        };
        let sources = &mut self.nodes[submix.index()].sources;
        debug_assert!(!sources.contains(&source), "{} attached twice", source);
        debug_assert!(sources.len() < sources.capacity());
        sources.push(source);
        submix
    }

    pub fn detach(&mut self, source: SourceId, submix: SubmixId) {
        if let Some(node) = self.nodes.get_mut(submix.index()) {
            if let Some(position) = node.sources.iter().position(|&s| s == source) {
                node.sources.swap_remove(position);
            }
        }
    }

    pub fn sources(&self, submix: SubmixId) -> &[SourceId] {
        self.nodes
            .get(submix.index())
            .map_or(&[][..], |n| n.sources.as_slice())
    }

    // ─────────────────────────────────────────────────────────────
    // Runtime edits
    // ─────────────────────────────────────────────────────────────

    /// Share of a submix's output sent to its parent's wet path
    pub fn set_wet_level(&mut self, submix: SubmixId, wet_level: f32) -> SubmixResult<()> {
        self.wet_levels
            .get_mut(submix.index())
            .ok_or(SubmixError::UnknownSubmix { submix })?
            .set_value(wet_level.clamp(0.0, 1.0));
        Ok(())
    }

    pub fn add_effect(&mut self, submix: SubmixId, effect: EffectSlot) -> SubmixResult<usize> {
        self.node_mut(submix)?
            .effects
            .push(effect)
            .map_err(|source| SubmixError::Effect { submix, source })
    }

    /// Remove an effect; the caller decides where it gets dropped
    pub fn remove_effect(&mut self, submix: SubmixId, index: usize) -> SubmixResult<EffectSlot> {
        self.node_mut(submix)?
            .effects
            .remove(index)
            .map_err(|source| SubmixError::Effect { submix, source })
    }

    pub fn set_effect_param(
        &mut self,
        submix: SubmixId,
        index: usize,
        param: usize,
        value: f32,
    ) -> SubmixResult<()> {
        self.node_mut(submix)?
            .effects
            .set_param(index, param, value)
            .map_err(|source| SubmixError::Effect { submix, source })
    }

    pub fn set_effect_bypass(
        &mut self,
        submix: SubmixId,
        index: usize,
        bypass: bool,
    ) -> SubmixResult<()> {
        self.node_mut(submix)?
            .effects
            .set_bypass(index, bypass)
            .map_err(|source| SubmixError::Effect { submix, source })
    }

    fn node_mut(&mut self, submix: SubmixId) -> SubmixResult<&mut SubmixNode> {
        self.nodes
            .get_mut(submix.index())
            .ok_or(SubmixError::UnknownSubmix { submix })
    }

    // ─────────────────────────────────────────────────────────────
    // Processing
    // ─────────────────────────────────────────────────────────────

    /// Mix one block; the result is available from [`Self::output`]
    ///
    /// `sources` must already have rendered the same `num_frames`.
    pub fn process(&mut self, sources: &SourceManager, num_frames: usize) {
        debug_assert!(num_frames <= self.format.max_block_frames);

        for position in 0..self.order.len() {
            let index = self.order[position].index();
            let node = &mut self.nodes[index];

            node.dry.set_num_frames(num_frames);
            node.dry.fill_silence();
            node.wet.set_num_frames(num_frames);
            node.wet.fill_silence();

            for child in &node.children {
                let child_output = &self.outputs[child.index()];
                let wet_level = &mut self.wet_levels[child.index()];
                for ((dry, wet), input) in node
                    .dry
                    .frames_mut()
                    .zip(node.wet.frames_mut())
                    .zip(child_output.frames())
                {
                    let (dry_gain, wet_gain) = constant_power_gains(wet_level.next_value());
                    for ((d, w), &s) in dry.iter_mut().zip(wet.iter_mut()).zip(input) {
                        *d += s * dry_gain;
                        *w += s * wet_gain;
                    }
                }
            }

            for &source in &node.sources {
                sources.mix_output_buffers(source, &mut node.dry, &mut node.wet);
            }

            node.effects.process(&mut node.wet);

            let output = &mut self.outputs[index];
            output.copy_from(&node.dry);
            output.add_buffer(&node.wet);
        }
    }

    /// Master output of the last processed block
    pub fn output(&self) -> &AudioBuffer {
        &self.outputs[SubmixId::MASTER.index()]
    }

    /// Output of any submix from the last processed block
    pub fn submix_output(&self, submix: SubmixId) -> Option<&AudioBuffer> {
        self.outputs.get(submix.index())
    }

    /// Clear effect state (delay lines, reverb tails)
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.effects.reset();
        }
    }
}

fn post_order(
    nodes: &[SubmixNode],
    id: SubmixId,
    visited: &mut [bool],
    order: &mut Vec<SubmixId>,
) {
    visited[id.index()] = true;
    for &child in &nodes[id.index()].children {
        if !visited[child.index()] {
            post_order(nodes, child, visited, order);
        }
    }
    order.push(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectConfig, EffectKind};
    use crate::source::{
        default_channel_map, ChannelLayout, PcmBuffer, SourceAtomics, SourceInit,
        SpatializationParams,
    };
    use basedrop::{Collector, Shared};

    const SR: u32 = 48000;

    fn format() -> RenderFormat {
        RenderFormat::new(SR, 2, 64)
    }

    fn submix(name: &str, parent: Option<&str>) -> SubmixConfig {
        SubmixConfig {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            wet_level: 0.0,
            effects: Vec::new(),
        }
    }

    fn build(configs: &[SubmixConfig], collector: &Collector) -> SubmixResult<SubmixGraph> {
        SubmixGraph::build(configs, format(), 4, 0, &collector.handle())
    }

    /// Source manager with one constant stereo voice on slot 0
    fn playing_source(collector: &Collector, level: f32, wet_level: f32) -> SourceManager {
        let handle = collector.handle();
        let mut manager = SourceManager::new(format(), 4, 0);
        let init = SourceInit {
            num_channels: 2,
            submix: SubmixId::MASTER,
            use_hrtf: false,
            volume: 1.0,
            pitch: 1.0,
            wet_level,
            lpf_frequency: SR as f32 / 2.0,
            spatialization: SpatializationParams::default(),
            channel_map: default_channel_map(2, &ChannelLayout::stereo()),
            atomics: Shared::new(&handle, SourceAtomics::new()),
        };
        manager.init(SourceId(0), Owned::new(&handle, init));
        let pcm = PcmBuffer::from_f32(2, vec![level; 2 * 256]);
        manager.submit_buffer(SourceId(0), Shared::new(&handle, pcm));
        manager.play(SourceId(0));
        manager
    }

    #[test]
    fn test_master_only_graph_is_silent() {
        let collector = Collector::new();
        let mut graph = build(&[], &collector).unwrap();
        let sources = SourceManager::new(format(), 4, 0);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.name(SubmixId::MASTER), Some("master"));

        graph.process(&sources, 32);
        assert_eq!(graph.output().num_frames(), 32);
        assert_eq!(graph.output().peak(), 0.0);
    }

    #[test]
    fn test_post_order_puts_children_first() {
        let collector = Collector::new();
        let graph = build(
            &[
                submix("music", None),
                submix("sfx", None),
                submix("footsteps", Some("sfx")),
            ],
            &collector,
        )
        .unwrap();

        let order = graph.order();
        let position = |name: &str| {
            let id = graph.find(name).unwrap();
            order.iter().position(|&o| o == id).unwrap()
        };
        assert!(position("footsteps") < position("sfx"));
        assert!(position("sfx") < position("master"));
        assert!(position("music") < position("master"));
        assert_eq!(*order.last().unwrap(), SubmixId::MASTER);
        assert_eq!(graph.parent(graph.find("footsteps").unwrap()), graph.find("sfx"));
    }

    #[test]
    fn test_validation_errors() {
        let collector = Collector::new();

        let duplicate = build(&[submix("a", None), submix("a", None)], &collector);
        assert!(matches!(duplicate, Err(SubmixError::DuplicateName { .. })));

        let unknown = build(&[submix("a", Some("nowhere"))], &collector);
        assert!(matches!(unknown, Err(SubmixError::UnknownParent { .. })));

        let cycle = build(&[submix("a", Some("b")), submix("b", Some("a"))], &collector);
        assert!(matches!(cycle, Err(SubmixError::Cycle { .. })));

        let master_parent = build(&[submix("master", Some("a")), submix("a", None)], &collector);
        assert!(matches!(master_parent, Err(SubmixError::MasterHasParent { .. })));

        let mut crowded = submix("crowded", None);
        crowded.effects = vec![EffectConfig::new(EffectKind::Gain); MAX_SUBMIX_EFFECTS + 1];
        let too_many = build(&[crowded], &collector);
        assert!(matches!(too_many, Err(SubmixError::TooManyEffects { count: 9, .. })));
    }

    #[test]
    fn test_source_in_child_reaches_master_dry() {
        let collector = Collector::new();
        let mut graph = build(&[submix("sfx", None)], &collector).unwrap();
        let sfx = graph.find("sfx").unwrap();

        let mut sources = playing_source(&collector, 0.5, 0.0);
        graph.attach(SourceId(0), sfx);
        sources.render(16);
        graph.process(&sources, 16);

        assert!(graph.output().as_slice().iter().all(|&s| (s - 0.5).abs() < 1e-6));
        let sfx_out = graph.submix_output(sfx).unwrap();
        assert!(sfx_out.as_slice().iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_effects_only_touch_wet_path() {
        let collector = Collector::new();
        let mut muted = submix("muted", None);
        muted.effects = vec![EffectConfig::new(EffectKind::Gain).with_param("gain", 0.0)];
        let mut graph = build(&[muted], &collector).unwrap();
        let id = graph.find("muted").unwrap();

        // Fully dry voice passes the muting effect untouched
        let mut dry_sources = playing_source(&collector, 0.5, 0.0);
        graph.attach(SourceId(0), id);
        dry_sources.render(16);
        graph.process(&dry_sources, 16);
        assert!(graph.output().as_slice().iter().all(|&s| (s - 0.5).abs() < 1e-6));

        // Fully wet voice goes through it and is silenced
        let mut wet_sources = playing_source(&collector, 0.5, 1.0);
        wet_sources.render(16);
        graph.process(&wet_sources, 16);
        assert!(graph.output().peak() < 1e-6);
    }

    #[test]
    fn test_child_wet_level_is_constant_power() {
        let collector = Collector::new();
        let mut child = submix("child", None);
        child.wet_level = 0.5;
        let mut graph = build(&[child], &collector).unwrap();
        let child_id = graph.find("child").unwrap();

        // Mute master's wet path to isolate the dry share
        let gc = collector.handle();
        let mute = EffectConfig::new(EffectKind::Gain).with_param("gain", 0.0);
        graph
            .add_effect(SubmixId::MASTER, Owned::new(&gc, mute.build(SR, 2)))
            .unwrap();

        let mut sources = playing_source(&collector, 1.0, 0.0);
        graph.attach(SourceId(0), child_id);
        sources.render(8);
        graph.process(&sources, 8);

        let expected = std::f32::consts::FRAC_1_SQRT_2;
        for &s in graph.output().as_slice() {
            assert!((s - expected).abs() < 1e-5, "{} != {}", s, expected);
        }
    }

    #[test]
    fn test_detach_and_effect_edits() {
        let collector = Collector::new();
        let mut graph = build(&[submix("bus", None)], &collector).unwrap();
        let bus = graph.find("bus").unwrap();
        let gc = collector.handle();

        graph.attach(SourceId(2), bus);
        graph.attach(SourceId(3), bus);
        graph.detach(SourceId(2), bus);
        assert_eq!(graph.sources(bus), &[SourceId(3)]);

        // Unknown submix routes to master
        assert_eq!(graph.attach(SourceId(1), SubmixId(42)), SubmixId::MASTER);

        let reverb = EffectConfig::new(EffectKind::Reverb).build(SR, 2);
        assert_eq!(graph.add_effect(bus, Owned::new(&gc, reverb)).unwrap(), 0);
        assert_eq!(graph.effect_names(bus), vec!["Reverb"]);
        graph.set_effect_bypass(bus, 0, true).unwrap();
        graph.set_effect_param(bus, 0, 0, 0.9).unwrap();
        assert!(graph.set_effect_param(bus, 3, 0, 0.9).is_err());

        let removed = graph.remove_effect(bus, 0).unwrap();
        assert!(removed.is_bypassed());
        assert_eq!(graph.effect_count(bus), 0);
        assert!(matches!(
            graph.set_wet_level(SubmixId(9), 0.5),
            Err(SubmixError::UnknownSubmix { .. })
        ));
    }
}
