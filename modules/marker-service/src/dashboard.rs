//! Dashboard HTML page handler for the marker service.

use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use marker_types::{MarkerRecord, DEFAULT_MAP_CENTER};
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (markers, load_error) = match state.markers.list() {
        Ok(m) => (m, None),
        Err(e) => {
            log::error!("Dashboard could not read markers: {}", e);
            (Vec::new(), Some("Failed to read markers"))
        }
    };
    let uptime = state.start_time.elapsed().as_secs();

    let with_photo = markers.iter().filter(|m| m.image_url.is_some()).count();
    let mut per_species: BTreeMap<&str, usize> = BTreeMap::new();
    for m in &markers {
        *per_species.entry(m.title.as_str()).or_default() += 1;
    }

    let stats_html = format!(
        r#"<div class="stats">
            <div class="stat"><span class="val">{}</span><span class="lbl">Markers</span></div>
            <div class="stat green"><span class="val">{}</span><span class="lbl">With Photo</span></div>
            <div class="stat yellow"><span class="val">{}</span><span class="lbl">Categories</span></div>
        </div>"#,
        markers.len(),
        with_photo,
        per_species.len()
    );

    let species_chips: String = per_species
        .iter()
        .map(|(title, n)| format!("<span class=\"chip\">{} ({})</span>\n", escape_html(title), n))
        .collect();

    let mut rows: String = markers.iter().map(marker_row).collect();
    if rows.is_empty() {
        rows = format!(
            "<tr><td colspan=\"5\">{}</td></tr>",
            load_error.unwrap_or("No markers yet.")
        );
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Marker Dashboard</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #0f1117; color: #e0e0e0; padding: 20px; }}
  h1 {{ color: #3fb950; margin-bottom: 8px; }}
  .meta {{ color: #8b949e; font-size: 0.85em; margin-bottom: 20px; }}
  .stats {{ display: flex; gap: 16px; margin-bottom: 24px; flex-wrap: wrap; }}
  .stat {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 16px 24px; text-align: center; min-width: 140px; }}
  .stat .val {{ display: block; font-size: 2em; font-weight: bold; color: #58a6ff; }}
  .stat.green .val {{ color: #3fb950; }}
  .stat.yellow .val {{ color: #d29922; }}
  .stat .lbl {{ display: block; font-size: 0.85em; color: #8b949e; margin-top: 4px; }}
  table {{ width: 100%; border-collapse: collapse; margin-bottom: 24px; }}
  th {{ background: #161b22; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.85em; text-transform: uppercase; border-bottom: 1px solid #30363d; }}
  td {{ padding: 8px 12px; border-bottom: 1px solid #21262d; font-size: 0.9em; }}
  tr:hover {{ background: #161b22; }}
  a {{ color: #58a6ff; }}
  .mono {{ font-family: 'SF Mono', 'Consolas', monospace; font-size: 0.85em; }}
  h2 {{ color: #c9d1d9; margin-bottom: 12px; font-size: 1.1em; }}
  .section {{ margin-bottom: 28px; }}
  .chip {{ display: inline-block; background: #21262d; border: 1px solid #30363d; color: #8b949e; padding: 4px 10px; border-radius: 12px; font-size: 0.8em; margin: 3px; }}
</style>
</head>
<body>
  <h1>Markers</h1>
  <p class="meta">Store: {backend} &middot; Uptime: {uptime_str} &middot; Map center: {center_lat}, {center_lng}</p>

  {stats_html}

  <div class="section">
    <h2>Categories</h2>
    <div>{species_chips}</div>
  </div>

  <div class="section">
    <h2>All Markers</h2>
    <table>
      <thead><tr><th>Category</th><th>Position</th><th>Observed</th><th>Description</th><th>Photo</th></tr></thead>
      <tbody>{rows}</tbody>
    </table>
  </div>

  <script>setTimeout(() => location.reload(), 30000);</script>
</body>
</html>"#,
        backend = state.markers.backend(),
        uptime_str = format_uptime(uptime),
        center_lat = DEFAULT_MAP_CENTER.0,
        center_lng = DEFAULT_MAP_CENTER.1,
        stats_html = stats_html,
        species_chips = species_chips,
        rows = rows,
    );

    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn marker_row(m: &MarkerRecord) -> String {
    let photo = match &m.image_url {
        Some(url) => format!("<a href=\"{0}\">view</a>", escape_html(url)),
        None => "-".to_string(),
    };
    format!(
        "<tr><td>{}</td><td class=\"mono\">{:.5}, {:.5}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        escape_html(&m.title),
        m.lat,
        m.lng,
        m.observed_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        escape_html(m.description.as_deref().unwrap_or("-")),
        photo,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
