//! Server-rendered HTML page

use std::fmt::Write;

use super::{MapView, RenderOutcome};
use crate::models::LabEntry;

pub const PAGE_TITLE: &str = "Soil Testing Labs Finder";
pub const RESULTS_HEADING: &str = "Nearby Soil Testing Labs:";
pub const LINK_TEXT: &str = "Google Maps Link";

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const STYLE: &str = "body{font-family:sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem}\
.error{background:#fdecea;color:#611a15;padding:.75rem 1rem;border-radius:.25rem}\
.note{color:#555}input[type=text]{width:100%;padding:.5rem;margin:.25rem 0 .75rem}";

// Tooltips get a text node so lab names are never parsed as HTML.
const MAP_SCRIPT: &str = r"<script>
(function () {
  const view = __VIEW__;
  const map = L.map('lab-map').setView([view.center_latitude, view.center_longitude], view.zoom);
  L.tileLayer(view.tiles, { attribution: view.attribution, maxZoom: 19 }).addTo(map);
  for (const m of view.markers) {
    const tip = document.createElement('span');
    tip.textContent = m.label;
    L.circleMarker([m.latitude, m.longitude], {
      radius: view.marker_size,
      color: view.marker_color,
      fillColor: view.marker_color,
      fillOpacity: 0.8
    }).bindTooltip(tip).addTo(map);
  }
})();
</script>";

/// Escape text for use in HTML content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Full page: the search form, then the outcome of the last submission if any.
#[must_use]
pub fn render_page(location: &str, outcome: Option<&RenderOutcome>) -> String {
    let map = match outcome {
        Some(RenderOutcome::Labs(report)) => report.map.as_ref(),
        _ => None,
    };

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{PAGE_TITLE}</title>");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    if map.is_some() {
        let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">");
        let _ = writeln!(html, "<script src=\"{LEAFLET_JS}\"></script>");
    }
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{PAGE_TITLE}</h1>");

    html.push_str("<form method=\"post\" action=\"/\">\n");
    html.push_str("<label for=\"location\">Enter your location: </label>\n");
    let _ = writeln!(
        html,
        "<input type=\"text\" id=\"location\" name=\"location\" value=\"{}\">",
        escape_html(location)
    );
    html.push_str("<button type=\"submit\">Find Soil Testing Labs</button>\n</form>\n");

    if let Some(outcome) = outcome {
        render_outcome(&mut html, outcome);
    }

    html.push_str("<hr>\n</body>\n</html>\n");
    html
}

fn render_outcome(html: &mut String, outcome: &RenderOutcome) {
    if let Some(message) = outcome.error_message() {
        let _ = writeln!(
            html,
            "<div class=\"error\" role=\"alert\">{}</div>",
            escape_html(message)
        );
        return;
    }

    let RenderOutcome::Labs(report) = outcome else {
        return;
    };

    let _ = writeln!(html, "<h3>{RESULTS_HEADING}</h3>");

    if let Some(map) = &report.map {
        render_map(html, map);
    }

    if report.labs.is_empty() {
        html.push_str("<p class=\"note\">No labs were listed for this location.</p>\n");
    } else {
        html.push_str("<ul class=\"labs\">\n");
        for lab in &report.labs {
            render_lab(html, lab);
        }
        html.push_str("</ul>\n");
    }

    if report.skipped > 0 {
        let _ = writeln!(
            html,
            "<p class=\"note\">{} incomplete {} left out.</p>",
            report.skipped,
            if report.skipped == 1 { "entry was" } else { "entries were" }
        );
    }
}

fn render_map(html: &mut String, map: &MapView) {
    let Some(view) = map.to_script_json() else {
        return;
    };
    let _ = writeln!(
        html,
        "<div id=\"lab-map\" style=\"height: {}px;\"></div>",
        map.height
    );
    html.push_str(&MAP_SCRIPT.replace("__VIEW__", &view));
    html.push('\n');
}

fn render_lab(html: &mut String, lab: &LabEntry) {
    let name = escape_html(&lab.name);
    match safe_href(&lab.link) {
        Some(href) => {
            let _ = writeln!(
                html,
                "<li><strong>{name}</strong> - <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{LINK_TEXT}</a></li>",
                escape_html(href)
            );
        }
        None => {
            let _ = writeln!(
                html,
                "<li><strong>{name}</strong> - {}</li>",
                escape_html(&lab.link)
            );
        }
    }
}

/// Only plain web links become anchors
fn safe_href(link: &str) -> Option<&str> {
    let link = link.trim();
    let lower = link.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")).then_some(link)
}
