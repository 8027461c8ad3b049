//! Nearby clinic lookup: Nominatim for geocoding, Overpass for facilities.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::LocatorConfig;
use crate::error::{AppError, Result};

pub const DEFAULT_LOCATION: &str = "India";
pub const MAX_CLINICS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clinic {
    pub id: i64,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    pub id: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

pub struct ClinicLocator {
    http: reqwest::Client,
    config: LocatorConfig,
}

impl ClinicLocator {
    pub fn new(http: reqwest::Client, config: LocatorConfig) -> Self {
        Self { http, config }
    }

    pub async fn find_nearby(&self, location: &str) -> Result<Vec<Clinic>> {
        let Some(coords) = self.geocode(location).await? else {
            tracing::info!("📍 No geocoding match for {:?}", location);
            return Ok(Vec::new());
        };

        let response: OverpassResponse = self
            .http
            .get(&self.config.overpass_url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .query(&[("data", overpass_query(coords))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(collect_clinics(response.elements))
    }

    async fn geocode(&self, location: &str) -> Result<Option<Coordinates>> {
        let hits: Vec<GeocodeHit> = self
            .http
            .get(&self.config.nominatim_url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .query(&[("format", "json"), ("q", location), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        hits.first()
            .map(|hit| {
                let parse = |raw: &str| {
                    raw.parse::<f64>().map_err(|_| {
                        AppError::UpstreamResponse(format!("Bad coordinate from geocoder: {raw}"))
                    })
                };
                Ok::<_, AppError>(Coordinates {
                    lat: parse(&hit.lat)?,
                    lon: parse(&hit.lon)?,
                })
            })
            .transpose()
    }
}

/// Gynecology/obstetrics and women's-health facilities within 10 km, plus
/// hospitals within 5 km.
pub fn overpass_query(coords: Coordinates) -> String {
    let Coordinates { lat, lon } = coords;
    format!(
        "[out:json];\n\
         (\n\
         node[\"healthcare:speciality\"~\"gynecology|obstetrics\"](around:10000,{lat},{lon});\n\
         node[\"name\"~\"Maternity|Women|Nursing Home|Hospital|Clinic\",i](around:10000,{lat},{lon});\n\
         node[\"amenity\"=\"hospital\"](around:5000,{lat},{lon});\n\
         );\n\
         out body 10;"
    )
}

pub fn classify_facility(tags: &HashMap<String, String>) -> &'static str {
    let name = tags.get("name").map(|n| n.to_lowercase()).unwrap_or_default();
    let speciality = tags.get("healthcare:speciality").map(String::as_str);

    if name.contains("maternity") || name.contains("women") || speciality == Some("gynecology") {
        "Gynecology & Maternity"
    } else if tags.get("amenity").map(String::as_str) == Some("clinic") {
        "Clinic"
    } else {
        "General Hospital"
    }
}

/// De-duplicate by element id, keeping arrival order, and cap the list.
pub fn collect_clinics(elements: Vec<OverpassElement>) -> Vec<Clinic> {
    let mut seen = HashSet::new();

    elements
        .into_iter()
        .filter(|el| seen.insert(el.id))
        .take(MAX_CLINICS)
        .map(|el| Clinic {
            id: el.id,
            kind: classify_facility(&el.tags).to_string(),
            name: el
                .tags
                .get("name")
                .cloned()
                .unwrap_or_else(|| "Medical Health Center".to_string()),
            address: el
                .tags
                .get("addr:full")
                .or_else(|| el.tags.get("addr:city"))
                .cloned()
                .unwrap_or_else(|| "Tap 'View Map' for location".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(id: i64, tags: &[(&str, &str)]) -> OverpassElement {
        OverpassElement {
            id,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn facility_types() {
        let maternity = element(1, &[("name", "City Maternity Home")]);
        let gyn = element(2, &[("healthcare:speciality", "gynecology")]);
        let clinic = element(3, &[("name", "Family Care"), ("amenity", "clinic")]);
        let hospital = element(4, &[("amenity", "hospital")]);

        assert_eq!(classify_facility(&maternity.tags), "Gynecology & Maternity");
        assert_eq!(classify_facility(&gyn.tags), "Gynecology & Maternity");
        assert_eq!(classify_facility(&clinic.tags), "Clinic");
        assert_eq!(classify_facility(&hospital.tags), "General Hospital");
    }

    #[test]
    fn duplicates_are_dropped_and_defaults_filled() {
        let clinics = collect_clinics(vec![
            element(7, &[("name", "Women's Clinic"), ("addr:city", "Pune")]),
            element(7, &[("name", "Women's Clinic")]),
            element(8, &[]),
        ]);

        assert_eq!(
            clinics,
            vec![
                Clinic {
                    id: 7,
                    name: "Women's Clinic".into(),
                    address: "Pune".into(),
                    kind: "Gynecology & Maternity".into(),
                },
                Clinic {
                    id: 8,
                    name: "Medical Health Center".into(),
                    address: "Tap 'View Map' for location".into(),
                    kind: "General Hospital".into(),
                },
            ]
        );
    }

    #[test]
    fn full_address_wins_over_city() {
        let clinics = collect_clinics(vec![element(
            1,
            &[("addr:full", "12 Lake Rd"), ("addr:city", "Pune")],
        )]);
        assert_eq!(clinics[0].address, "12 Lake Rd");
    }

    #[test]
    fn list_is_capped() {
        let elements = (0..20).map(|id| element(id, &[])).collect();
        assert_eq!(collect_clinics(elements).len(), MAX_CLINICS);
    }

    #[test]
    fn query_uses_both_radii() {
        let query = overpass_query(Coordinates { lat: 22.5, lon: 88.3 });
        assert!(query.contains("around:10000,22.5,88.3"));
        assert!(query.contains("node[\"amenity\"=\"hospital\"](around:5000,22.5,88.3)"));
        assert!(query.ends_with("out body 10;"));
    }

    #[test]
    fn overpass_elements_without_tags_decode() {
        let response: OverpassResponse =
            serde_json::from_str(r#"{"elements":[{"id":5,"type":"node"}]}"#).unwrap();
        assert_eq!(response.elements[0].id, 5);
        assert!(response.elements[0].tags.is_empty());
    }
}
