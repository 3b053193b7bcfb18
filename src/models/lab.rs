//! Lab entries returned by the model

use serde::{Deserialize, Serialize};

/// Which shape of answer the finder asks for and renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Name and link per lab
    List,
    /// Name, link and coordinates per lab, plotted on a map
    Map,
}

/// One testing lab with a navigation link
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LabEntry {
    /// Lab name as given by the model
    pub name: String,
    /// Google Maps link (not validated)
    pub link: String,
}

/// A lab that also carries coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MappedLab {
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    pub link: String,
}

impl From<MappedLab> for LabEntry {
    fn from(lab: MappedLab) -> Self {
        Self {
            name: lab.name,
            link: lab.link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapped_lab_accepts_integer_coordinates() {
        let lab: MappedLab = serde_json::from_value(json!({
            "name": "B Lab",
            "latitude": 30,
            "longitude": -97,
            "link": "https://x"
        }))
        .unwrap();
        assert_eq!(lab.latitude, 30.0);
        assert_eq!(lab.longitude, -97.0);
    }

    #[test]
    fn test_lab_entry_requires_link() {
        let result = serde_json::from_value::<LabEntry>(json!({ "name": "A Lab" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_variant_from_lowercase() {
        let variant: Variant = serde_json::from_str("\"list\"").unwrap();
        assert_eq!(variant, Variant::List);
    }
}
