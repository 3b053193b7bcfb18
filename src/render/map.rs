//! Map plot of labs with coordinates

use serde::Serialize;

use crate::models::MappedLab;

/// Initial zoom level
pub const MAP_ZOOM: u8 = 10;
/// Map height in CSS pixels
pub const MAP_HEIGHT_PX: u32 = 600;
pub const MARKER_COLOR: &str = "blue";
/// Marker radius in CSS pixels
pub const MARKER_SIZE: u32 = 10;
pub const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// One plotted lab, hover text is the lab name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

/// Everything the page needs to draw the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
    pub height: u32,
    pub marker_color: &'static str,
    pub marker_size: u32,
    pub tiles: &'static str,
    pub attribution: &'static str,
    pub markers: Vec<Marker>,
}

impl MapView {
    /// Map centred on the mean position of `labs`, `None` when there are none
    #[must_use]
    pub fn from_labs(labs: &[MappedLab]) -> Option<Self> {
        if labs.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let count = labs.len() as f64;
        let center_latitude = labs.iter().map(|lab| lab.latitude).sum::<f64>() / count;
        let center_longitude = labs.iter().map(|lab| lab.longitude).sum::<f64>() / count;

        Some(Self {
            center_latitude,
            center_longitude,
            zoom: MAP_ZOOM,
            height: MAP_HEIGHT_PX,
            marker_color: MARKER_COLOR,
            marker_size: MARKER_SIZE,
            tiles: TILE_URL,
            attribution: TILE_ATTRIBUTION,
            markers: labs
                .iter()
                .map(|lab| Marker {
                    latitude: lab.latitude,
                    longitude: lab.longitude,
                    label: lab.name.clone(),
                })
                .collect(),
        })
    }

    /// View as JSON that is safe to inline in a `<script>` element
    #[must_use]
    pub fn to_script_json(&self) -> Option<String> {
        let json = serde_json::to_string(self).ok()?;
        Some(
            json.replace('<', "\\u003c")
                .replace('>', "\\u003e")
                .replace('&', "\\u0026"),
        )
    }
}
