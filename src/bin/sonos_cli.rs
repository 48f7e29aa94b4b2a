//! sonos-cli - issue one API request and pretty-print the answer.
//!
//! Collections come out as grid tables, everything else as indented JSON.
//! No state is kept between runs.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use sonos_web_client::config;
use sonos_web_client::{ApiRequest, HttpTransport, RequestKind, SyncCursor, What};

/// One-shot Sonos Web API client.
#[derive(Parser, Debug)]
#[command(name = "sonos-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Zone name or id (e.g. Kitchen)
    #[arg(long)]
    zone: Option<String>,

    /// Music path (e.g. A:ALBUMARTIST)
    #[arg(long)]
    mpath: Option<String>,

    /// Queue entry id
    #[arg(long)]
    queue: Option<String>,

    /// Sections to return: globals, music, zones, zone, queue, none, all
    #[arg(long)]
    what: Option<What>,

    /// Action to perform (e.g. Start, MuchLouder, Browse)
    #[arg(long)]
    action: Option<String>,

    /// Cursor of the last update seen
    #[arg(long)]
    lastupdate: Option<u64>,

    /// Zone to link with the given zone
    #[arg(long)]
    link: Option<String>,

    /// Volume to set (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Save the queue under this name
    #[arg(long)]
    savename: Option<String>,

    /// 1 to answer without waiting for an update, 0 to wait
    #[arg(long, alias = "NoWait", value_parser = clap::value_parser!(u8).range(0..=1))]
    nowait: Option<u8>,

    /// Search the music library
    #[arg(long)]
    search: Option<String>,

    /// Controller API endpoint (defaults to the configured one)
    #[arg(long, env = "SONOS_WEB_BASE_URL")]
    base_url: Option<String>,

    /// Print the response as JSON only
    #[arg(long)]
    raw: bool,
}

impl Args {
    fn request(&self) -> ApiRequest {
        ApiRequest {
            what: self.what,
            action: self.action.clone(),
            zone: self.zone.clone(),
            mpath: self.mpath.clone(),
            msearch: self.search.clone(),
            queue: self.queue.clone(),
            lastupdate: self.lastupdate.map(SyncCursor::new),
            volume: self.volume,
            link: self.link.clone(),
            savename: self.savename.clone(),
        }
    }

    fn kind(&self) -> Option<RequestKind> {
        self.nowait.map(|n| {
            if n == 1 {
                RequestKind::Immediate
            } else {
                RequestKind::Wait
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config()?;
    if let Some(base_url) = args.base_url.clone() {
        config.base_url = base_url;
    }

    let transport = HttpTransport::from_config(&config)?;
    let data = transport
        .fetch(args.kind(), &args.request())
        .await
        .with_context(|| format!("request to {} failed", config.base_url))?;

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    print!("{}", render(&data)?);
    Ok(())
}

/// Tables for every array of objects, then the remaining fields as JSON
fn render(data: &Value) -> Result<String> {
    let Some(map) = data.as_object() else {
        return Ok(format!("{}\n", serde_json::to_string_pretty(data)?));
    };

    let mut out = String::new();
    let mut rest = Map::new();

    for (key, value) in map {
        match value.as_array() {
            Some(items) if items.iter().all(Value::is_object) => {
                let rows: Vec<&Map<String, Value>> = items
                    .iter()
                    .filter_map(|item| table_row(key, item))
                    .collect();
                out.push_str(&table(title(key), &rows));
            }
            _ => {
                rest.insert(key.clone(), value.clone());
            }
        }
    }

    if !rest.is_empty() {
        out.push_str("\n=== Raw Data ===\n");
        out.push_str(&serde_json::to_string_pretty(&Value::Object(rest))?);
        out.push('\n');
    }
    Ok(out)
}

fn title(key: &str) -> &str {
    match key.to_ascii_lowercase().as_str() {
        "music_loop" => "Music Library",
        "queue_loop" => "Queue",
        "zones_loop" => "Zones",
        "players" => "Players",
        _ => key,
    }
}

/// Zone collections wrap each zone in a members list: show the first member
fn table_row<'a>(key: &str, item: &'a Value) -> Option<&'a Map<String, Value>> {
    let object = item.as_object()?;
    if key.eq_ignore_ascii_case("zones_loop") {
        let members = object
            .get("ZONE_MEMBERS")
            .or_else(|| object.get("zone_members"))
            .and_then(Value::as_array)
            .and_then(|m| m.first())
            .and_then(Value::as_object);
        if let Some(first) = members {
            return Some(first);
        }
    }
    Some(object)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Grid table with the first row's keys as header
fn table(title: &str, rows: &[&Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return format!("\n{}: No data\n", title);
    };
    let keys: Vec<&String> = first.keys().collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| keys.iter().map(|k| cell(row.get(*k))).collect())
        .collect();

    let widths: Vec<usize> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(k.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = {
        let parts: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        format!("+{}+\n", parts.join("+"))
    };
    let line = |values: Vec<&str>| {
        let parts: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {}{} ", v, " ".repeat(w - v.chars().count())))
            .collect();
        format!("|{}|\n", parts.join("|"))
    };

    let mut out = format!("\n=== {} ===\n", title);
    out.push_str(&border);
    out.push_str(&line(keys.iter().map(|k| k.as_str()).collect()));
    out.push_str(&border);
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out.push_str(&border);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_args_build_request() {
        let args = Args::parse_from([
            "sonos-cli",
            "--zone",
            "Kitchen",
            "--what",
            "music",
            "--action",
            "Browse",
            "--mpath",
            "A:ALBUM",
            "--NoWait",
            "1",
        ]);
        let request = args.request();
        assert_eq!(request.what, Some(What::Music));
        assert_eq!(request.zone.as_deref(), Some("Kitchen"));
        assert_eq!(args.kind(), Some(RequestKind::Immediate));
    }

    #[test]
    fn test_volume_out_of_range_rejected() {
        assert!(Args::try_parse_from(["sonos-cli", "--volume", "101"]).is_err());
    }

    #[test]
    fn test_render_tables_and_raw_rest() {
        let data = json!({
            "last_update": 12,
            "zones_loop": [
                {"ZONE_MEMBERS": [{"ZONE_ID": "RINCON_1", "ZONE_NAME": "Kitchen"}]}
            ],
            "queue_loop": []
        });
        let out = render(&data).unwrap();

        assert!(out.contains("=== Zones ==="));
        assert!(out.contains("| ZONE_ID  | ZONE_NAME |"));
        assert!(out.contains("| RINCON_1 | Kitchen   |"));
        assert!(out.contains("Queue: No data"));
        assert!(out.contains("=== Raw Data ==="));
        assert!(out.contains("\"last_update\": 12"));
    }
}
