//! Render sink that records everything it is sent.

use anabasis_core::{FeatureCollection, LayerVisibility, MarkerUpdate, RenderSink, SourceId};
use std::collections::BTreeMap;

/// In-memory map surface for simulation runs.
///
/// Keeps the latest data of every source, the full marker history and the
/// most recent visibility plan.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sources: BTreeMap<String, FeatureCollection>,
    source_updates: BTreeMap<String, u64>,
    markers: Vec<MarkerUpdate>,
    visibility: Vec<LayerVisibility>,
    visibility_updates: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest data pushed to the source named `id`.
    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    /// How often the source named `id` was replaced.
    pub fn source_updates(&self, id: &str) -> u64 {
        self.source_updates.get(id).copied().unwrap_or(0)
    }

    pub fn markers(&self) -> &[MarkerUpdate] {
        &self.markers
    }

    pub fn last_marker(&self) -> Option<&MarkerUpdate> {
        self.markers.last()
    }

    pub fn visibility(&self) -> &[LayerVisibility] {
        &self.visibility
    }

    pub fn visibility_updates(&self) -> u64 {
        self.visibility_updates
    }

    /// Visibility of the layer named `layer` in the latest plan.
    pub fn is_visible(&self, layer: &str) -> Option<bool> {
        self.visibility
            .iter()
            .find(|entry| entry.layer.to_string() == layer)
            .map(|entry| entry.visible)
    }
}

impl RenderSink for RecordingSink {
    fn set_source_data(&mut self, source: SourceId, features: FeatureCollection) {
        let name = source.to_string();
        *self.source_updates.entry(name.clone()).or_insert(0) += 1;
        self.sources.insert(name, features);
    }

    fn set_marker(&mut self, marker: MarkerUpdate) {
        self.markers.push(marker);
    }

    fn apply_visibility(&mut self, layers: &[LayerVisibility]) {
        self.visibility = layers.to_vec();
        self.visibility_updates += 1;
    }
}
