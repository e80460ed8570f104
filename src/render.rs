//! Server-side HTML for the chat dashboard.
//!
//! Pure string building over the transcript. The newest assistant turn gets
//! the full panel set (Overview, Wind, Air & Sun, Map, Raw JSON); earlier
//! turns are collapsed to their header line and condition.

use serde_json::Value;
use uuid::Uuid;

use crate::services::chat::{ChatMessage, Role, TurnResult};
use crate::services::metrics::CoreMetrics;
use crate::services::pipeline::LocationSource;

/// Placeholder for values the provider did not send.
pub const MISSING: &str = "—";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 1100px; margin: 0 auto; padding: 24px; color: #111827; }
.caption, .small-note { color: #6b7280; font-size: 0.9rem; }
.msg { margin: 14px 0; padding: 12px 14px; border-radius: 12px; }
.msg.user { background: #eef2ff; }
.msg.assistant { background: #f9fafb; border: 1px solid rgba(0,0,0,0.05); }
.error { color: #b91c1c; background: #fef2f2; padding: 8px 10px; border-radius: 8px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 12px; margin: 10px 0; }
.metric-card { background: linear-gradient(135deg, #f0f4ff 0%, #f8fffb 100%); padding: 14px 16px;
  border-radius: 16px; box-shadow: 0 1px 6px rgba(0,0,0,0.06); border: 1px solid rgba(0,0,0,0.05); }
.section-title { font-weight: 700; font-size: 1.1rem; margin-bottom: 0.4rem; }
.metric-label { color: #6b7280; font-size: 0.85rem; }
.metric-value { font-size: 1.5rem; font-weight: 600; }
.cond { display: flex; align-items: center; gap: 8px; padding: 8px 10px; border-radius: 12px;
  background: #fffdf5; border: 1px solid #ffe8a3; width: fit-content; }
details { margin: 8px 0; }
summary { cursor: pointer; font-weight: 600; }
pre { background: #111827; color: #e5e7eb; padding: 12px; border-radius: 8px; overflow-x: auto; }
form.ask { display: flex; gap: 8px; margin-top: 20px; }
form.ask input[type=text] { flex: 1; padding: 10px; border-radius: 8px; border: 1px solid #d1d5db; }
"#;

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
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

/// Display string for a metric value; strings unquoted, absent as `MISSING`.
pub fn display_value(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) if s.is_empty() => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// "name, region, country" with empty parts skipped.
pub fn place_line(metrics: &CoreMetrics) -> String {
    [&metrics.name, &metrics.region, &metrics.country]
        .into_iter()
        .filter_map(|v| v.as_ref().and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// OpenStreetMap link centred on the reported coordinates.
pub fn map_url(lat: f64, lon: f64) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=11/{lat}/{lon}",
        lat = lat,
        lon = lon
    )
}

/// Full dashboard page for one session.
pub fn page(session: Option<Uuid>, history: &[ChatMessage]) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    html.push_str("<title>WeatherBot</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body>");
    html.push_str("<h1>⛅ WeatherBot</h1>");
    html.push_str(
        "<p class=\"caption\">Ask about the weather anywhere. The location is extracted \
         from your question, live data is fetched, and the essentials are shown.</p>",
    );

    let latest_assistant = history.iter().rposition(|m| m.role == Role::Assistant);
    for (i, message) in history.iter().enumerate() {
        html.push_str(&message_html(message, Some(i) == latest_assistant));
    }

    let session_field = session
        .map(|s| format!("<input type=\"hidden\" name=\"session\" value=\"{}\">", s))
        .unwrap_or_default();

    html.push_str(&format!(
        "<form class=\"ask\" method=\"post\" action=\"/chat\">{}\
         <input type=\"text\" name=\"query\" autofocus \
         placeholder=\"Ask e.g. 'What's the weather in Lahore right now?'\">\
         <button type=\"submit\">Ask</button></form>",
        session_field
    ));

    if let Some(s) = session {
        html.push_str(&format!(
            "<form method=\"post\" action=\"/chat/clear\">\
             <input type=\"hidden\" name=\"session\" value=\"{}\">\
             <button type=\"submit\">Clear conversation</button></form>",
            s
        ));
    }

    html.push_str(
        "<p class=\"caption\">Weather data by <a href=\"https://www.weatherapi.com/\">\
         WeatherAPI.com</a></p></body></html>",
    );
    html
}

fn message_html(message: &ChatMessage, expanded: bool) -> String {
    match (&message.role, &message.result) {
        (Role::User, _) => format!(
            "<div class=\"msg user\"><strong>You:</strong> {}</div>",
            escape_html(message.content.as_deref().unwrap_or_default())
        ),
        (Role::Assistant, Some(result)) => format!(
            "<div class=\"msg assistant\">{}</div>",
            turn_html(result, expanded)
        ),
        (Role::Assistant, None) => String::new(),
    }
}

/// One assistant answer.
pub fn turn_html(result: &TurnResult, expanded: bool) -> String {
    match result {
        TurnResult::Error {
            location,
            location_source,
            error,
        } => format!(
            "{}<div class=\"error\">Error fetching weather: {}</div>",
            detected_note(location, *location_source),
            escape_html(error)
        ),
        TurnResult::Ok {
            location,
            location_source,
            metrics,
            raw,
        } => {
            let mut html = detected_note(location, *location_source);
            let place = place_line(metrics);
            html.push_str(&format!(
                "<p><strong>Location:</strong> {}<br><em>Local time:</em> {}</p>",
                escape_html(if place.is_empty() { MISSING } else { place.as_str() }),
                escape_html(&display_value(&metrics.localtime))
            ));
            html.push_str(&condition_badge(metrics));
            if expanded {
                html.push_str(&panels(metrics, raw));
            }
            html
        }
    }
}

fn detected_note(location: &str, source: LocationSource) -> String {
    let suffix = match source {
        LocationSource::Extracted => "",
        LocationSource::Default => " (default)",
    };
    format!(
        "<p class=\"small-note\">🌍 Detected location: {}{}</p>",
        escape_html(location),
        suffix
    )
}

fn condition_badge(metrics: &CoreMetrics) -> String {
    let cond = escape_html(&display_value(&metrics.condition_text));
    match metrics.icon.as_ref().and_then(Value::as_str) {
        Some(icon) if !icon.is_empty() => format!(
            "<div class=\"cond\"><img src=\"{}\" width=\"28\" alt=\"\"><span>{}</span></div>",
            escape_html(&icon_url(icon)),
            cond
        ),
        _ => format!("<p><strong>Condition:</strong> {}</p>", cond),
    }
}

// WeatherAPI.com icons are protocol-relative ("//cdn.weatherapi.com/...").
fn icon_url(icon: &str) -> String {
    if icon.starts_with("//") {
        format!("https:{}", icon)
    } else {
        icon.to_string()
    }
}

fn card(title: &str, rows: &[(&str, &Option<Value>)]) -> String {
    let mut html = format!(
        "<div class=\"metric-card\"><div class=\"section-title\">{}</div>",
        escape_html(title)
    );
    for (label, value) in rows {
        html.push_str(&format!(
            "<div class=\"metric-label\">{}</div><div class=\"metric-value\">{}</div>",
            escape_html(label),
            escape_html(&display_value(value))
        ));
    }
    html.push_str("</div>");
    html
}

fn panels(m: &CoreMetrics, raw: &Value) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        "<details open><summary>🌤️ Overview</summary><div class=\"grid\">{}{}{}{}</div></details>",
        card(
            "Temperature",
            &[("Now (°C)", &m.temp_c), ("Feels like (°C)", &m.feelslike_c)]
        ),
        card("Humidity", &[("Relative Humidity (%)", &m.humidity)]),
        card("Visibility", &[("Vis (km)", &m.vis_km)]),
        card("Updated", &[("Last Updated", &m.last_updated)])
    ));

    html.push_str(&format!(
        "<details><summary>🍃 Wind</summary><div class=\"grid\">{}{}{}</div></details>",
        card("Wind", &[("Wind (kph)", &m.wind_kph), ("Direction", &m.wind_dir)]),
        card("Gusts", &[("Gust (kph)", &m.gust_kph)]),
        card("Pressure", &[("Pressure (mb)", &m.pressure_mb)])
    ));

    html.push_str(&format!(
        "<details><summary>🌞 Air &amp; Sun</summary><div class=\"grid\">{}{}{}{}</div>\
         <p class=\"small-note\">Only key indicators shown. See Raw JSON for the full payload.</p>\
         </details>",
        card("UV Index", &[("UV", &m.uv)]),
        card("Cloud", &[("Cloud (%)", &m.cloud)]),
        card("Dew Point", &[("Dew (°C)", &m.dewpoint_c)]),
        card("Feels Like", &[("Feels (°C)", &m.feelslike_c)])
    ));

    html.push_str("<details><summary>🗺️ Map</summary>");
    match m.coordinates() {
        Some((lat, lon)) => {
            html.push_str(&format!(
                "<p>{lat}, {lon}: <a href=\"{url}\" target=\"_blank\" rel=\"noopener\">\
                 open in OpenStreetMap</a></p>",
                lat = lat,
                lon = lon,
                url = escape_html(&map_url(lat, lon))
            ));
        }
        None => html.push_str("<p>No coordinates available to render the map.</p>"),
    }
    html.push_str("</details>");

    let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
    html.push_str(&format!(
        "<details><summary>🧩 Raw JSON</summary><pre>{}</pre></details>",
        escape_html(&pretty)
    ));

    html
}
