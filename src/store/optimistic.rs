//! Provisional zone edits applied before the controller confirms them.

use zone_model::{Zone, MAX_VOLUME};

/// A local mutation requested by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticEdit {
    /// Relative volume change (positive = louder)
    VolumeStep(i16),
    /// Set the mute flag
    Mute(bool),
}

/// Field a pending edit overrides. At most one edit per field per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    Volume,
    Muted,
}

/// Override held until the next authoritative data for the zone arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingValue {
    /// Volume steps accumulate against the last authoritative volume so the
    /// displayed value is `clamp(base + offset)` however many steps were
    /// clipped along the way
    Volume { base: u8, offset: i32 },
    Muted(bool),
}

impl PendingValue {
    pub fn field(&self) -> EditField {
        match self {
            Self::Volume { .. } => EditField::Volume,
            Self::Muted(_) => EditField::Muted,
        }
    }
}

/// One pending edit on a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub value: PendingValue,
    /// Wire action that caused the edit
    pub source: String,
}

impl PendingEdit {
    /// Provisional volume, if this is a volume edit
    pub fn volume(&self) -> Option<u8> {
        match self.value {
            PendingValue::Volume { base, offset } => Some(clamp_volume(i32::from(base) + offset)),
            PendingValue::Muted(_) => None,
        }
    }

    /// Provisional mute flag, if this is a mute edit
    pub fn muted(&self) -> Option<bool> {
        match self.value {
            PendingValue::Muted(m) => Some(m),
            PendingValue::Volume { .. } => None,
        }
    }
}

/// Clamp to the controller's volume scale
pub fn clamp_volume(value: i32) -> u8 {
    value.clamp(0, i32::from(MAX_VOLUME)) as u8
}

/// Fold `edit` into the zone's pending list and apply the result to `zone`.
pub(crate) fn apply(
    zone: &mut Zone,
    pending: &mut Vec<PendingEdit>,
    edit: OptimisticEdit,
    source: &str,
) {
    let value = match edit {
        OptimisticEdit::VolumeStep(step) => {
            let (base, offset) = pending
                .iter()
                .find_map(|p| match p.value {
                    PendingValue::Volume { base, offset } => Some((base, offset)),
                    PendingValue::Muted(_) => None,
                })
                .unwrap_or((zone.volume, 0));
            PendingValue::Volume {
                base,
                offset: offset + i32::from(step),
            }
        }
        OptimisticEdit::Mute(muted) => PendingValue::Muted(muted),
    };

    let edit = PendingEdit {
        value,
        source: source.to_string(),
    };
    if let Some(v) = edit.volume() {
        zone.volume = v;
    }
    if let Some(m) = edit.muted() {
        zone.muted = m;
    }

    // Last write wins per field
    pending.retain(|p| p.value.field() != value.field());
    pending.push(edit);
}
