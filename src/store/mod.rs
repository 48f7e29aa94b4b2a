//! Local cache of controller state.
//!
//! The store holds the last authoritative snapshot (zones, queues, browsed
//! music nodes) together with the change cursor and any optimistic edits
//! still waiting for the controller to confirm them. It is owned by the
//! session behind a `tokio::sync::RwLock`; every mutation reports which
//! render targets actually changed so consumers only redraw those.

mod cursor;
mod optimistic;

pub use cursor::SyncCursor;
pub use optimistic::{clamp_volume, EditField, OptimisticEdit, PendingEdit, PendingValue};

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;
use zone_model::{MusicNode, RenderTarget, Zone, ZoneQueue};

use crate::error::{MergeError, SchemaError};
use crate::transport::{normalize, NormalizeContext, Snapshot, ZoneSection};

/// Render targets touched by one merge or optimistic edit, in notification
/// order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub targets: Vec<RenderTarget>,
    pub cursor_advanced: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn push(&mut self, target: RenderTarget) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied(ChangeSet),
    /// The snapshot predates the store's cursor. Its zone and queue sections
    /// were discarded; `changes` covers the music node, which is not tied to
    /// the cursor.
    Stale {
        snapshot: SyncCursor,
        current: SyncCursor,
        changes: ChangeSet,
    },
}

impl MergeOutcome {
    /// Targets to notify
    pub fn targets(&self) -> &[RenderTarget] {
        match self {
            Self::Applied(changes) | Self::Stale { changes, .. } => &changes.targets,
        }
    }
}

#[derive(Debug, Default)]
pub struct StateStore {
    /// Zone ids in controller order
    order: Vec<String>,
    zones: HashMap<String, Zone>,
    queues: HashMap<String, ZoneQueue>,
    music: HashMap<String, MusicNode>,
    cursor: Option<SyncCursor>,
    pending: HashMap<String, Vec<PendingEdit>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zones in controller order
    pub fn zones(&self) -> Vec<&Zone> {
        self.order.iter().filter_map(|id| self.zones.get(id)).collect()
    }

    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.get(zone_id)
    }

    pub fn queue(&self, zone_id: &str) -> Option<&ZoneQueue> {
        self.queues.get(zone_id)
    }

    pub fn music(&self, path: &str) -> Option<&MusicNode> {
        self.music.get(path)
    }

    pub fn cursor(&self) -> Option<SyncCursor> {
        self.cursor
    }

    pub fn pending_edits(&self, zone_id: &str) -> &[PendingEdit] {
        self.pending.get(zone_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Zones that follow `zone_id`: the linked zones listed right after it in
    /// controller order
    pub fn linked_members(&self, zone_id: &str) -> Vec<&Zone> {
        let Some(leader) = self.zones.get(zone_id) else {
            return Vec::new();
        };
        let Some(start) = self.order.iter().position(|id| id == zone_id) else {
            return Vec::new();
        };
        self.order[start + 1..]
            .iter()
            .filter_map(|id| self.zones.get(id))
            .take_while(|z| z.linked)
            .take(leader.num_linked as usize)
            .collect()
    }

    /// Normalize a response body and merge it
    pub fn merge_json(
        &mut self,
        body: &Value,
        ctx: &NormalizeContext,
    ) -> Result<MergeOutcome, MergeError> {
        let snapshot = normalize(body, ctx)?;
        self.merge(snapshot)
    }

    /// Merge a snapshot. Present sections replace the cached entries in full.
    ///
    /// The snapshot is validated before anything is touched: on error the
    /// store is unchanged. A snapshot older than the store's cursor only
    /// contributes its music node.
    pub fn merge(&mut self, snapshot: Snapshot) -> Result<MergeOutcome, MergeError> {
        if let (Some(incoming), Some(current)) = (snapshot.cursor, self.cursor) {
            if incoming < current {
                debug!(%incoming, %current, "Discarding zone data of stale snapshot");
                let mut changes = ChangeSet::default();
                if let Some(node) = snapshot.music {
                    self.merge_music(node, &mut changes);
                }
                return Ok(MergeOutcome::Stale {
                    snapshot: incoming,
                    current,
                    changes,
                });
            }
        }

        validate(&snapshot)?;

        let mut changes = ChangeSet::default();
        let Snapshot {
            cursor,
            zones,
            music,
            queues,
            ..
        } = snapshot;

        if let Some(section) = zones {
            self.merge_zones(section, &mut changes);
        }

        for queue in queues {
            let zone_id = queue.zone_id.clone();
            if self.queues.get(&zone_id) != Some(&queue) {
                self.queues.insert(zone_id.clone(), queue);
                changes.push(RenderTarget::Queue(zone_id));
            }
        }

        if let Some(node) = music {
            self.merge_music(node, &mut changes);
        }

        if let Some(incoming) = cursor {
            if self.cursor.map_or(true, |current| incoming > current) {
                self.cursor = Some(incoming);
                changes.cursor_advanced = true;
            }
        }

        Ok(MergeOutcome::Applied(changes))
    }

    fn merge_music(&mut self, node: MusicNode, changes: &mut ChangeSet) {
        if self.music.get(&node.path) != Some(&node) {
            let path = node.path.clone();
            self.music.insert(path.clone(), node);
            changes.push(RenderTarget::Music(path));
        }
    }

    fn merge_zones(&mut self, section: ZoneSection, changes: &mut ChangeSet) {
        let full = section.is_full();
        let incoming = match section {
            ZoneSection::Full(zones) | ZoneSection::Partial(zones) => zones,
        };

        let mut list_changed = false;
        let mut zone_targets = Vec::new();

        if full {
            let keep: HashSet<&str> = incoming.iter().map(|z| z.zone_id.as_str()).collect();
            let removed: Vec<String> = self
                .order
                .iter()
                .filter(|id| !keep.contains(id.as_str()))
                .cloned()
                .collect();
            for id in removed {
                debug!(zone_id = %id, "Zone removed");
                self.zones.remove(&id);
                self.queues.remove(&id);
                self.pending.remove(&id);
            }

            let order: Vec<String> = incoming.iter().map(|z| z.zone_id.clone()).collect();
            if order != self.order {
                self.order = order;
                list_changed = true;
            }
        }

        for zone in incoming {
            let id = zone.zone_id.clone();
            if !self.order.contains(&id) {
                self.order.push(id.clone());
                list_changed = true;
            }

            if let Some(edits) = self.pending.remove(&id) {
                debug!(zone_id = %id, discarded = edits.len(), "Authoritative zone data replaces optimistic edits");
            }

            // The zone list shows names and grouping only
            let (unchanged, list_entry_changed) = match self.zones.get(&id) {
                Some(existing) => (
                    *existing == zone,
                    existing.display_name() != zone.display_name()
                        || existing.linked != zone.linked,
                ),
                None => (false, true),
            };
            list_changed |= list_entry_changed;
            if !unchanged {
                self.zones.insert(id.clone(), zone);
                zone_targets.push(RenderTarget::Zone(id));
            }
        }

        if list_changed {
            changes.push(RenderTarget::Zones);
        }
        for target in zone_targets {
            changes.push(target);
        }
    }

    /// Apply a provisional edit to a cached zone. Returns `None` when the
    /// zone is unknown.
    pub fn apply_optimistic(
        &mut self,
        zone_id: &str,
        edit: OptimisticEdit,
        source: &str,
    ) -> Option<ChangeSet> {
        let zone = self.zones.get_mut(zone_id)?;
        let before = zone.clone();
        let pending = self.pending.entry(zone_id.to_string()).or_default();

        optimistic::apply(zone, pending, edit, source);
        debug!(zone_id, ?edit, volume = zone.volume, muted = zone.muted, "Optimistic edit");

        let mut changes = ChangeSet::default();
        if *zone != before {
            changes.push(RenderTarget::Zone(zone_id.to_string()));
        }
        Some(changes)
    }
}

fn validate(snapshot: &Snapshot) -> Result<(), MergeError> {
    if let Some(section) = &snapshot.zones {
        let mut seen = HashSet::new();
        for zone in section.zones() {
            if zone.zone_id.is_empty() {
                return Err(SchemaError::MissingId { section: "zone" }.into());
            }
            if !seen.insert(zone.zone_id.as_str()) {
                return Err(MergeError::DuplicateZone(zone.zone_id.clone()));
            }
        }
    }
    if snapshot.queues.iter().any(|q| q.zone_id.is_empty()) {
        return Err(SchemaError::OrphanQueue.into());
    }
    Ok(())
}
