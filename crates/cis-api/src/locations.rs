//! Administrative locations farmers and weather stations are attached to.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::request::{ListQuery, RequestOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Location {
    /// "Sector, District, Province" with missing parts left out
    pub fn display_path(&self) -> String {
        let parts: Vec<&str> = [&self.sector, &self.district, &self.province]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            self.name.clone()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ApiError> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {
            Ok(())
        }
        (Some(_), Some(_)) => Err(ApiError::InvalidRequest("Coordinates out of range".into())),
        _ => Err(ApiError::InvalidRequest(
            "Latitude and longitude must be given together".into(),
        )),
    }
}

impl ApiClient {
    pub async fn list_locations(&self, query: &ListQuery) -> Result<Vec<Location>, ApiError> {
        self.get_with("/locations", query.apply(RequestOptions::new()))
            .await
    }

    pub async fn get_location(&self, id: i64) -> Result<Location, ApiError> {
        self.get(&format!("/locations/{}", id)).await
    }

    pub async fn create_location(&self, location: &NewLocation) -> Result<Location, ApiError> {
        if location.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Location name is required".into()));
        }
        validate_coordinates(location.latitude, location.longitude)?;

        self.post("/locations", location).await
    }

    pub async fn delete_location(&self, id: i64) -> Result<(), ApiError> {
        self.delete::<IgnoredAny>(&format!("/locations/{}", id))
            .await
            .map(|_| ())
    }
}
