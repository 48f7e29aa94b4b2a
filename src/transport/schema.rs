//! Response normalization
//!
//! The controller has shipped several incompatible response shapes over the
//! years. They are all normalized here into one canonical [`Snapshot`]:
//!
//! - **Upper-snake flat**: `LAST_UPDATE`, `zones_loop` of `ZONE_ID`,
//!   `ACTIVE_VOLUME`, ... (zones possibly wrapped in `ZONE_MEMBERS`)
//! - **Lower-snake flat**: the same fields in lower case (`zone_id`,
//!   `active_volume`, `music_name`, ...). Real responses mix both cases, so
//!   flat field lookup is case-insensitive.
//! - **Nested**: `players` of `{zone, av, render, queue}` objects and a
//!   `music` object with an `items` array.
//!
//! Anything that does not fit is rejected with a [`SchemaError`]; nothing in
//! a response body is ever evaluated.

use serde_json::{Map, Value};
use zone_model::{
    CurrentTrack, MusicChild, MusicNode, NodeKind, PlaybackMode, QueueItem, Zone, ZoneQueue,
    MAX_VOLUME, SEARCH_PATH,
};

use crate::error::SchemaError;
use crate::store::SyncCursor;
use crate::transport::ApiRequest;

/// Response shape family, detected from the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    UpperSnake,
    LowerSnake,
    Nested,
}

/// Zone data carried by a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSection {
    /// The complete zone collection, in display order. Zones not listed no
    /// longer exist.
    Full(Vec<Zone>),
    /// Individual zones. Zones not listed are unchanged.
    Partial(Vec<Zone>),
}

impl ZoneSection {
    pub fn zones(&self) -> &[Zone] {
        match self {
            Self::Full(zones) | Self::Partial(zones) => zones,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

/// Canonical form of one response body. Absent sections mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub variant: Option<SchemaVariant>,
    pub cursor: Option<SyncCursor>,
    pub zones: Option<ZoneSection>,
    pub music: Option<MusicNode>,
    pub queues: Vec<ZoneQueue>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.zones.is_none() && self.music.is_none() && self.queues.is_empty()
    }
}

/// What the request that produced a body asked about. Used to fill in ids
/// the controller leaves implicit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeContext {
    pub zone: Option<String>,
    pub mpath: Option<String>,
    pub search: bool,
}

impl NormalizeContext {
    pub fn for_request(request: &ApiRequest) -> Self {
        Self {
            zone: request.zone.clone(),
            mpath: request.mpath.clone(),
            search: request.msearch.is_some(),
        }
    }

    fn music_path(&self) -> String {
        if self.search {
            SEARCH_PATH.to_string()
        } else {
            self.mpath.clone().unwrap_or_default()
        }
    }
}

/// Normalize a decoded response body.
pub fn normalize(body: &Value, ctx: &NormalizeContext) -> Result<Snapshot, SchemaError> {
    let map = body.as_object().ok_or(SchemaError::NotAnObject)?;
    let top = Fields::new(map);

    let mut snapshot = Snapshot {
        variant: detect_variant(map),
        cursor: parse_cursor(&top)?,
        ..Default::default()
    };

    // Zone collections
    if let Some(value) = top.get("zones_loop") {
        let entries = as_array(value, "zones_loop")?;
        let zones = entries
            .iter()
            .map(|entry| parse_zone_entry(entry, None))
            .collect::<Result<Vec<_>, _>>()?;
        snapshot.zones = Some(ZoneSection::Full(zones));
    } else if let Some(value) = top.get("players").or_else(|| top.get("zones")) {
        let entries = as_array(value, "players")?;
        let mut zones = Vec::with_capacity(entries.len());
        for entry in entries {
            let (zone, queue) = parse_player(entry, None)?;
            zones.push(zone);
            snapshot.queues.extend(queue);
        }
        snapshot.zones = Some(ZoneSection::Full(zones));
    }

    // Single zone answers
    if top.get("av").is_some() || top.get("render").is_some() {
        let (zone, queue) = parse_player(body, ctx.zone.as_deref())?;
        snapshot.queues.extend(queue);
        push_partial(&mut snapshot, zone);
    } else if let Some(player) = top.get("player") {
        let (zone, queue) = parse_player(player, ctx.zone.as_deref())?;
        snapshot.queues.extend(queue);
        push_partial(&mut snapshot, zone);
    } else if top.get("zone_id").is_some() || top.get("active_mode").is_some() {
        let zone = parse_flat_zone(&top, ctx.zone.as_deref())?;
        push_partial(&mut snapshot, zone);
    }

    // Flat queue
    if let Some(value) = top.get("queue_loop").or_else(|| top.get("queue").filter(|v| v.is_array())) {
        let owner = top
            .string("zone_id")
            .or_else(|| ctx.zone.clone())
            .ok_or(SchemaError::OrphanQueue)?;
        let items = parse_queue_items(as_array(value, "queue_loop")?)?;
        snapshot.queues.push(ZoneQueue::new(owner, items));
    }

    // Music
    if let Some(value) = top.get("music") {
        let music = value.as_object().ok_or_else(|| SchemaError::WrongType {
            section: "music".to_string(),
            expected: "object",
        })?;
        snapshot.music = Some(parse_music(&Fields::new(music), ctx)?);
    } else if top.get("music_loop").is_some() {
        snapshot.music = Some(parse_music(&top, ctx)?);
    }

    Ok(snapshot)
}

/// Add a single-zone answer. A zone collection in the same body wins over the
/// top-level copy of one of its zones.
fn push_partial(snapshot: &mut Snapshot, zone: Zone) {
    match snapshot.zones {
        Some(ZoneSection::Full(ref mut zones)) => {
            if !zones.iter().any(|z| z.zone_id == zone.zone_id) {
                zones.push(zone);
            }
        }
        Some(ZoneSection::Partial(ref mut zones)) => {
            if let Some(existing) = zones.iter_mut().find(|z| z.zone_id == zone.zone_id) {
                *existing = zone;
            } else {
                zones.push(zone);
            }
        }
        None => snapshot.zones = Some(ZoneSection::Partial(vec![zone])),
    }
}

fn detect_variant(map: &Map<String, Value>) -> Option<SchemaVariant> {
    if ["players", "player", "av"].iter().any(|k| map.contains_key(*k))
        || map
            .get("music")
            .and_then(|m| m.get("items"))
            .is_some()
    {
        return Some(SchemaVariant::Nested);
    }

    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    for section in ["zones_loop", "ZONES_LOOP", "queue_loop", "music_loop"] {
        if let Some(first) = map
            .get(section)
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(Value::as_object)
        {
            keys.extend(first.keys().map(String::as_str));
        }
    }

    let flat_prefixes = ["zone_", "active_", "music_", "queue_", "last_update"];
    let flat: Vec<&str> = keys
        .into_iter()
        .filter(|k| {
            let lower = k.to_ascii_lowercase();
            flat_prefixes.iter().any(|p| lower.starts_with(p)) && !lower.ends_with("_loop")
        })
        .collect();

    if flat.is_empty() {
        None
    } else if flat.iter().any(|k| k.chars().any(|c| c.is_ascii_uppercase())) {
        Some(SchemaVariant::UpperSnake)
    } else {
        Some(SchemaVariant::LowerSnake)
    }
}

fn parse_cursor(top: &Fields<'_>) -> Result<Option<SyncCursor>, SchemaError> {
    let Some(value) = top.get("last_update").or_else(|| top.get("lastupdate")) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .map(|v| Some(SyncCursor::new(v)))
            .ok_or_else(|| SchemaError::InvalidCursor(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map(|v| Some(SyncCursor::new(v)))
            .map_err(|_| SchemaError::InvalidCursor(s.clone())),
        other => Err(SchemaError::InvalidCursor(other.to_string())),
    }
}

/// One entry of a zone collection: nested player or flat zone
fn parse_zone_entry(entry: &Value, fallback_id: Option<&str>) -> Result<Zone, SchemaError> {
    let map = entry.as_object().ok_or_else(|| SchemaError::WrongType {
        section: "zones_loop".to_string(),
        expected: "array of objects",
    })?;
    let fields = Fields::new(map);

    if fields.get("av").is_some() || fields.get("render").is_some() {
        return parse_player(entry, fallback_id).map(|(zone, _)| zone);
    }

    // Grouped form: the group entry carries its members, the first is the zone
    if fields.get("zone_id").is_none() {
        if let Some(members) = fields.get("zone_members") {
            let first = members
                .as_array()
                .and_then(|m| m.first())
                .and_then(Value::as_object)
                .ok_or_else(|| SchemaError::WrongType {
                    section: "ZONE_MEMBERS".to_string(),
                    expected: "non-empty array of objects",
                })?;
            return parse_flat_zone(&Fields::new(first), fallback_id);
        }
    }

    parse_flat_zone(&fields, fallback_id)
}

fn parse_flat_zone(fields: &Fields<'_>, fallback_id: Option<&str>) -> Result<Zone, SchemaError> {
    let zone_id = fields
        .string("zone_id")
        .or_else(|| fallback_id.map(str::to_string))
        .ok_or(SchemaError::MissingId { section: "zone" })?;

    let mode = match fields.get("active_mode") {
        Some(Value::String(s)) if s.parse::<i64>().is_err() => PlaybackMode::from(s.as_str()),
        Some(_) => {
            let code = fields.int("active_mode").unwrap_or(0);
            PlaybackMode::from_code(code).ok_or(SchemaError::OutOfRange {
                field: "active_mode".to_string(),
                value: code,
            })?
        }
        None if fields.bool("active_playing") => PlaybackMode::Playing,
        None if fields.bool("active_paused_playback") => PlaybackMode::Paused,
        None => PlaybackMode::Stopped,
    };

    Ok(Zone {
        zone_name: fields.string("zone_name").unwrap_or_else(|| zone_id.clone()),
        icon: fields.string("zone_icon"),
        linked: fields.bool("zone_linked"),
        num_linked: non_negative(fields, "zone_numlinked")?.unwrap_or(0),
        mode,
        muted: fields.bool("active_muted"),
        volume: volume(fields.int("active_volume"))?,
        track: CurrentTrack {
            name: fields.string("active_name").unwrap_or_default(),
            album: fields.string("active_album").unwrap_or_default(),
            artist: fields.string("active_artist").unwrap_or_default(),
            album_art: fields.string("active_albumart"),
            is_radio: fields.bool("active_isradio"),
        },
        queue_position: non_negative(fields, "active_track_num")?,
        zone_id,
    })
}

/// Nested player object, with its inline queue if present
fn parse_player(
    entry: &Value,
    fallback_id: Option<&str>,
) -> Result<(Zone, Option<ZoneQueue>), SchemaError> {
    let map = entry.as_object().ok_or_else(|| SchemaError::WrongType {
        section: "players".to_string(),
        expected: "array of objects",
    })?;
    let player = Fields::new(map);

    // Flat entries can show up in a players array too
    if player.get("av").is_none() && player.get("render").is_none() {
        return parse_zone_entry(entry, fallback_id).map(|zone| (zone, None));
    }

    let info = player.object("zone", "players.zone")?;
    let av = player.object("av", "players.av")?;
    let render = player.object("render", "players.render")?;
    let current = av.object("current_track", "av.current_track")?;

    let zone_id = player
        .string("id")
        .or_else(|| player.string("zone_id"))
        .or_else(|| player.string("name"))
        .or_else(|| fallback_id.map(str::to_string))
        .ok_or(SchemaError::MissingId { section: "player" })?;

    let mode = if let Some(state) = av.string("transport_state") {
        PlaybackMode::from(state.as_str())
    } else if av.bool("isplaying") {
        PlaybackMode::Playing
    } else if av.bool("ispaused") {
        PlaybackMode::Paused
    } else {
        PlaybackMode::Stopped
    };

    let is_radio = av.bool("isradio");
    let name = av
        .string("track")
        .or_else(|| current.string("title"))
        .or_else(|| is_radio.then(|| current.string("stream_content")).flatten())
        .or_else(|| av.string("title"))
        .unwrap_or_default();

    let zone = Zone {
        zone_name: info
            .string("name")
            .or_else(|| player.string("name"))
            .unwrap_or_else(|| zone_id.clone()),
        icon: info.string("icon").or_else(|| info.string("img")),
        linked: player.bool("linked") || info.bool("linked"),
        num_linked: non_negative(&player, "numlinked")?
            .or(non_negative(&info, "numlinked")?)
            .unwrap_or(0),
        mode,
        muted: render.bool("muted") || render.bool("ismuted"),
        volume: volume(render.int("volume"))?,
        track: CurrentTrack {
            name,
            album: av.string("album").or_else(|| current.string("album")).unwrap_or_default(),
            artist: av
                .string("artist")
                .or_else(|| current.string("artist"))
                .unwrap_or_default(),
            album_art: av.string("albumart").or_else(|| current.string("albumart")),
            is_radio,
        },
        queue_position: non_negative(&player, "active_track_num")?,
        zone_id,
    };

    let queue = match player.get("queue") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(ZoneQueue::new(&zone.zone_id, parse_queue_items(items)?)),
        Some(Value::Object(obj)) => {
            let items = Fields::new(obj)
                .get("items")
                .map(|v| as_array(v, "queue.items"))
                .transpose()?
                .map(|items| parse_queue_items(items))
                .transpose()?
                .unwrap_or_default();
            Some(ZoneQueue::new(&zone.zone_id, items))
        }
        Some(_) => {
            return Err(SchemaError::WrongType {
                section: "queue".to_string(),
                expected: "array or object",
            })
        }
    };

    Ok((zone, queue))
}

fn parse_queue_items(items: &[Value]) -> Result<Vec<QueueItem>, SchemaError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let map = item.as_object().ok_or_else(|| SchemaError::WrongType {
                section: "queue".to_string(),
                expected: "array of objects",
            })?;
            let f = Fields::new(map);
            let track_num = match non_negative(&f, "queue_track_num")? {
                Some(n) => n,
                None => non_negative(&f, "track_num")?.unwrap_or(index as u32 + 1),
            };
            Ok(QueueItem {
                track_num,
                queue_id: f
                    .string("queue_id")
                    .or_else(|| f.string("id"))
                    .ok_or(SchemaError::MissingId { section: "queue" })?,
                name: f
                    .string("queue_name")
                    .or_else(|| f.string("title"))
                    .or_else(|| f.string("name"))
                    .unwrap_or_default(),
                artist: f
                    .string("queue_artist")
                    .or_else(|| f.string("artist"))
                    .unwrap_or_default(),
                album: f
                    .string("queue_album")
                    .or_else(|| f.string("album"))
                    .unwrap_or_default(),
                album_art: f.string("queue_albumart").or_else(|| f.string("albumart")),
            })
        })
        .collect()
}

fn parse_music(music: &Fields<'_>, ctx: &NormalizeContext) -> Result<MusicNode, SchemaError> {
    let path = if ctx.search {
        SEARCH_PATH.to_string()
    } else {
        music
            .string("music_path")
            .or_else(|| music.string("id"))
            .map(|p| decode(&p))
            .unwrap_or_else(|| ctx.music_path())
    };

    let children = match music.get("items").or_else(|| music.get("music_loop")) {
        Some(value) => as_array(value, "music_loop")?
            .iter()
            .map(parse_music_child)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let kind = music_kind(music, NodeKind::Container);

    Ok(MusicNode {
        name: music
            .string("music_name")
            .or_else(|| music.string("title"))
            .unwrap_or_default(),
        artist: music.string("music_artist").or_else(|| music.string("artist")),
        kind,
        album_art: music
            .string("music_albumart")
            .or_else(|| music.string("albumart"))
            .map(|a| decode(&a)),
        is_top: music.bool("istop") || path.is_empty(),
        children,
        path,
    })
}

fn parse_music_child(item: &Value) -> Result<MusicChild, SchemaError> {
    let map = item.as_object().ok_or_else(|| SchemaError::WrongType {
        section: "music_loop".to_string(),
        expected: "array of objects",
    })?;
    let f = Fields::new(map);

    let path = f
        .string("music_realpath")
        .or_else(|| f.string("music_path"))
        .or_else(|| f.string("id"))
        .or_else(|| f.string("path"))
        .map(|p| decode(&p))
        .ok_or(SchemaError::MissingId { section: "music" })?;

    Ok(MusicChild {
        path,
        name: f
            .string("music_name")
            .or_else(|| f.string("title"))
            .or_else(|| f.string("name"))
            .unwrap_or_default(),
        artist: f.string("music_artist").or_else(|| f.string("artist")),
        description: f.string("music_desc").or_else(|| f.string("desc")),
        kind: music_kind(&f, NodeKind::Track),
        album_art: f
            .string("music_albumart")
            .or_else(|| f.string("albumart"))
            .map(|a| decode(&a)),
    })
}

fn music_kind(f: &Fields<'_>, default: NodeKind) -> NodeKind {
    if let Some(class) = f.string("music_realclass").or_else(|| f.string("music_class")) {
        return NodeKind::from_upnp_class(&class);
    }
    if f.bool("isradio") {
        NodeKind::Radio
    } else if f.bool("isalbum") {
        NodeKind::Album
    } else if f.bool("iscontainer") {
        NodeKind::Container
    } else if f.get("iscontainer").is_some() {
        NodeKind::Track
    } else {
        default
    }
}

fn volume(value: Option<i64>) -> Result<u8, SchemaError> {
    match value {
        None => Ok(0),
        Some(v) if (0..=i64::from(MAX_VOLUME)).contains(&v) => Ok(v as u8),
        Some(v) => Err(SchemaError::OutOfRange {
            field: "volume".to_string(),
            value: v,
        }),
    }
}

fn non_negative(fields: &Fields<'_>, key: &str) -> Result<Option<u32>, SchemaError> {
    match fields.int(key) {
        None => Ok(None),
        Some(v) => u32::try_from(v).map(Some).map_err(|_| SchemaError::OutOfRange {
            field: key.to_string(),
            value: v,
        }),
    }
}

fn as_array<'a>(value: &'a Value, section: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value.as_array().ok_or_else(|| SchemaError::WrongType {
        section: section.to_string(),
        expected: "array",
    })
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Case-insensitive view over a JSON object
struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self { map: Some(map) }
    }

    fn empty() -> Self {
        Self { map: None }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        let map = self.map?;
        map.get(key)
            .or_else(|| map.get(&key.to_ascii_uppercase()))
            .or_else(|| {
                map.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
    }

    /// Nested object, or an empty view when absent or null
    fn object(&self, key: &str, section: &str) -> Result<Fields<'a>, SchemaError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(Fields::empty()),
            Some(Value::Object(map)) => Ok(Fields::new(map)),
            Some(_) => Err(SchemaError::WrongType {
                section: section.to_string(),
                expected: "object",
            }),
        }
    }

    /// Non-empty string; numbers are rendered as strings
    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "1" | "true"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> NormalizeContext {
        NormalizeContext::default()
    }

    #[test]
    fn test_upper_snake_zones() {
        let body = json!({
            "LAST_UPDATE": 100,
            "zones_loop": [
                {"ZONE_MEMBERS": [{
                    "ZONE_ID": "RINCON_1", "ZONE_NAME": "Kitchen", "ZONE_ICON": "kitchen",
                    "ZONE_LINKED": 0, "ZONE_NUMLINKED": 1,
                    "ACTIVE_MODE": 1, "ACTIVE_MUTED": 0, "ACTIVE_VOLUME": 50,
                    "ACTIVE_NAME": "So What", "ACTIVE_ALBUM": "Kind of Blue",
                    "ACTIVE_ARTIST": "Miles Davis", "ACTIVE_ALBUMART": "/getaa?u=1",
                    "ACTIVE_TRACK_NUM": 3
                }]}
            ]
        });

        let snapshot = normalize(&body, &ctx()).unwrap();
        assert_eq!(snapshot.variant, Some(SchemaVariant::UpperSnake));
        assert_eq!(snapshot.cursor, Some(SyncCursor::new(100)));

        let section = snapshot.zones.unwrap();
        assert!(section.is_full());
        let zone = &section.zones()[0];
        assert_eq!(zone.zone_id, "RINCON_1");
        assert_eq!(zone.display_name(), "Kitchen + 1");
        assert_eq!(zone.mode, PlaybackMode::Playing);
        assert_eq!(zone.volume, 50);
        assert_eq!(zone.track.artist, "Miles Davis");
        assert_eq!(zone.queue_position, Some(3));
    }

    #[test]
    fn test_variants_normalize_to_same_zone() {
        let upper = json!({"zones_loop": [{
            "ZONE_ID": "Z1", "ZONE_NAME": "Kitchen", "ACTIVE_MODE": 2,
            "ACTIVE_MUTED": 1, "ACTIVE_VOLUME": 30, "ACTIVE_NAME": "Track A",
            "ACTIVE_ALBUM": "Album", "ACTIVE_ARTIST": "Artist"
        }]});
        let lower = json!({"zones_loop": [{
            "zone_id": "Z1", "zone_name": "Kitchen", "active_mode": "2",
            "active_muted": true, "active_volume": "30", "active_name": "Track A",
            "active_album": "Album", "active_artist": "Artist"
        }]});
        let nested = json!({"players": [{
            "id": "Z1",
            "zone": {"name": "Kitchen"},
            "av": {"track": "Track A", "album": "Album", "artist": "Artist", "transport_state": "PAUSED_PLAYBACK"},
            "render": {"volume": 30, "ismuted": true}
        }]});

        let zones: Vec<Zone> = [upper, lower, nested]
            .iter()
            .map(|body| normalize(body, &ctx()).unwrap().zones.unwrap().zones()[0].clone())
            .collect();

        assert_eq!(zones[0], zones[1]);
        assert_eq!(zones[1], zones[2]);
        assert_eq!(zones[0].mode, PlaybackMode::Paused);
        assert!(zones[0].muted);
    }

    #[test]
    fn test_detect_variants() {
        assert_eq!(
            normalize(&json!({"last_update": 1, "zones_loop": []}), &ctx()).unwrap().variant,
            Some(SchemaVariant::LowerSnake)
        );
        assert_eq!(
            normalize(&json!({"players": []}), &ctx()).unwrap().variant,
            Some(SchemaVariant::Nested)
        );
        assert_eq!(normalize(&json!({}), &ctx()).unwrap().variant, None);
    }

    #[test]
    fn test_nested_player_with_queue() {
        let body = json!({
            "last_update": "105",
            "players": [{
                "name": "Den",
                "zone": {"name": "Den", "img": "den.png"},
                "av": {"title": "Radio Paradise", "isradio": true,
                       "current_track": {"stream_content": "Live"}},
                "render": {"volume": 12, "muted": false},
                "active_track_num": 2,
                "queue": {"items": [
                    {"title": "One", "artist": "A", "queue_id": "Q:0/1", "QUEUE_TRACK_NUM": 1},
                    {"title": "Two", "artist": "B", "queue_id": "Q:0/2", "QUEUE_TRACK_NUM": 2}
                ]}
            }]
        });

        let snapshot = normalize(&body, &ctx()).unwrap();
        assert_eq!(snapshot.cursor, Some(SyncCursor::new(105)));
        let zones = snapshot.zones.unwrap();
        let zone = &zones.zones()[0];
        assert_eq!(zone.zone_id, "Den");
        assert!(zone.track.is_radio);
        assert_eq!(zone.track.name, "Live");
        assert_eq!(zone.icon.as_deref(), Some("den.png"));

        assert_eq!(snapshot.queues.len(), 1);
        let queue = &snapshot.queues[0];
        assert_eq!(queue.zone_id, "Den");
        assert_eq!(queue.items[1].queue_id, "Q:0/2");
        assert!(zone.is_active_track(queue.items[1].track_num));
    }

    #[test]
    fn test_single_zone_uses_request_zone() {
        let body = json!({
            "last_update": 7,
            "av": {"transport_state": "PLAYING", "current_track": {"title": "T", "album": "Al"}},
            "render": {"volume": 40, "muted": false}
        });
        let ctx = NormalizeContext {
            zone: Some("Kitchen".to_string()),
            ..Default::default()
        };

        let snapshot = normalize(&body, &ctx).unwrap();
        let section = snapshot.zones.unwrap();
        assert!(!section.is_full());
        assert_eq!(section.zones()[0].zone_id, "Kitchen");
        assert_eq!(section.zones()[0].track.album, "Al");
    }

    #[test]
    fn test_flat_queue_and_music() {
        let body = json!({
            "zone_id": "Z1",
            "active_mode": 0,
            "queue_loop": [
                {"QUEUE_TRACK_NUM": 1, "queue_id": "Q:0/1", "queue_name": "Intro", "QUEUE_ARTIST": "X"}
            ],
            "music_name": "Kind of Blue",
            "MUSIC_ARTIST": "Miles Davis",
            "MUSIC_CLASS": "object.container.album.musicAlbum",
            "music_loop": [
                {"MUSIC_REALPATH": "A%3AALBUM%2FKind%20of%20Blue%2F1", "music_name": "So What",
                 "MUSIC_REALCLASS": "object.item.audioItem.musicTrack"},
                {"MUSIC_REALPATH": "R%3A0%2F0%2F1", "music_name": "Jazz FM",
                 "MUSIC_REALCLASS": "object.item.audioItem.audioBroadcast", "MUSIC_DESC": "Radio"}
            ]
        });
        let ctx = NormalizeContext {
            mpath: Some("A:ALBUM/Kind of Blue".to_string()),
            ..Default::default()
        };

        let snapshot = normalize(&body, &ctx).unwrap();
        assert_eq!(snapshot.queues[0].zone_id, "Z1");
        assert_eq!(snapshot.queues[0].items[0].name, "Intro");

        let music = snapshot.music.unwrap();
        assert_eq!(music.path, "A:ALBUM/Kind of Blue");
        assert_eq!(music.kind, NodeKind::Album);
        assert!(!music.is_top);
        assert_eq!(music.children[0].path, "A:ALBUM/Kind of Blue/1");
        assert_eq!(music.children[1].kind, NodeKind::Radio);
        assert_eq!(music.children[1].description.as_deref(), Some("Radio"));
    }

    #[test]
    fn test_nested_music() {
        let body = json!({"music": {
            "id": "", "title": "Music", "istop": true,
            "items": [
                {"id": "A%3AARTIST", "title": "Artists", "iscontainer": true, "albumart": ""},
                {"id": "S%3A", "title": "Song", "iscontainer": false}
            ]
        }});

        let music = normalize(&body, &ctx()).unwrap().music.unwrap();
        assert!(music.is_top);
        assert_eq!(music.path, "");
        assert_eq!(music.children[0].path, "A:ARTIST");
        assert_eq!(music.children[0].kind, NodeKind::Container);
        assert_eq!(music.children[0].album_art, None);
        assert_eq!(music.children[1].kind, NodeKind::Track);
    }

    #[test]
    fn test_search_results_use_reserved_path() {
        let body = json!({"music": {"id": "whatever", "items": []}});
        let ctx = NormalizeContext {
            search: true,
            ..Default::default()
        };
        assert_eq!(normalize(&body, &ctx).unwrap().music.unwrap().path, SEARCH_PATH);
    }

    #[test]
    fn test_rejects_malformed_bodies() {
        assert_eq!(normalize(&json!([1, 2]), &ctx()), Err(SchemaError::NotAnObject));
        assert!(matches!(
            normalize(&json!({"zones_loop": {"a": 1}}), &ctx()),
            Err(SchemaError::WrongType { .. })
        ));
        assert_eq!(
            normalize(&json!({"zones_loop": [{"zone_name": "No id"}]}), &ctx()),
            Err(SchemaError::MissingId { section: "zone" })
        );
        assert!(matches!(
            normalize(&json!({"zones_loop": [{"zone_id": "Z", "active_volume": 140}]}), &ctx()),
            Err(SchemaError::OutOfRange { .. })
        ));
        assert_eq!(
            normalize(&json!({"queue_loop": []}), &ctx()),
            Err(SchemaError::OrphanQueue)
        );
        assert!(matches!(
            normalize(&json!({"last_update": "soon"}), &ctx()),
            Err(SchemaError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_empty_body_is_empty_snapshot() {
        let snapshot = normalize(&json!({"status": "ok"}), &ctx()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.cursor, None);
    }
}
