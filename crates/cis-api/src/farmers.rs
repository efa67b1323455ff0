//! Farmer records.

use std::path::{Path, PathBuf};

use cis_core::AppError;
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::export;
use crate::request::{ListQuery, RequestOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub crops: Vec<String>,
    /// Language the farmer receives messages in (`en` or `rw`)
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Request to register a farmer
#[derive(Debug, Clone, Serialize)]
pub struct NewFarmer {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub crops: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Partial update of a farmer
#[derive(Debug, Clone, Default, Serialize)]
pub struct FarmerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Flat row used for CSV export.
#[derive(Debug, Serialize)]
struct FarmerRow<'a> {
    id: i64,
    name: &'a str,
    phone: &'a str,
    gender: &'a str,
    location_id: Option<i64>,
    crops: String,
    language: &'a str,
}

impl<'a> From<&'a Farmer> for FarmerRow<'a> {
    fn from(farmer: &'a Farmer) -> Self {
        Self {
            id: farmer.id,
            name: &farmer.name,
            phone: &farmer.phone,
            gender: farmer.gender.as_deref().unwrap_or_default(),
            location_id: farmer.location_id,
            crops: farmer.crops.join("; "),
            language: farmer.language.as_deref().unwrap_or_default(),
        }
    }
}

fn validate_phone(phone: &str) -> Result<(), ApiError> {
    let digits = phone.trim().trim_start_matches('+');
    if digits.len() < 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::InvalidRequest(format!(
            "Invalid phone number: {}",
            phone
        )));
    }
    Ok(())
}

impl ApiClient {
    pub async fn list_farmers(&self, query: &ListQuery) -> Result<Vec<Farmer>, ApiError> {
        let farmers: Vec<Farmer> = self
            .get_with("/farmers", query.apply(RequestOptions::new()))
            .await?;
        tracing::debug!("Fetched {} farmers", farmers.len());
        Ok(farmers)
    }

    pub async fn get_farmer(&self, id: i64) -> Result<Farmer, ApiError> {
        self.get(&format!("/farmers/{}", id)).await
    }

    pub async fn create_farmer(&self, farmer: &NewFarmer) -> Result<Farmer, ApiError> {
        if farmer.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Farmer name is required".into()));
        }
        validate_phone(&farmer.phone)?;

        let created: Farmer = self.post("/farmers", farmer).await?;
        tracing::info!("Registered farmer {}", created.id);
        Ok(created)
    }

    /// Partial update. Safe to retry: re-applying the same fields is a no-op.
    pub async fn update_farmer(&self, id: i64, update: &FarmerUpdate) -> Result<Farmer, ApiError> {
        if let Some(phone) = &update.phone {
            validate_phone(phone)?;
        }

        let options = RequestOptions::new().json(update)?.idempotent(true);
        self.request(Method::PUT, &format!("/farmers/{}", id), options)
            .await
    }

    pub async fn delete_farmer(&self, id: i64) -> Result<(), ApiError> {
        self.delete::<IgnoredAny>(&format!("/farmers/{}", id)).await?;
        tracing::info!("Deleted farmer {}", id);
        Ok(())
    }

    /// Fetch farmers matching `query` and save them as CSV.
    pub async fn export_farmers(
        &self,
        query: &ListQuery,
        filename: impl AsRef<Path>,
    ) -> Result<PathBuf, AppError> {
        let farmers = self.list_farmers(query).await?;
        let rows: Vec<FarmerRow<'_>> = farmers.iter().map(FarmerRow::from).collect();
        let records = export::to_records(&rows)?;
        Ok(export::export_csv(&records, filename)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farmer_deserialization_with_defaults() {
        let json = r#"{"id": 12, "name": "Mukamana Alice", "phone": "0788123456"}"#;
        let farmer: Farmer = serde_json::from_str(json).unwrap();
        assert_eq!(farmer.id, 12);
        assert!(farmer.crops.is_empty());
        assert!(farmer.location_id.is_none());
    }

    #[test]
    fn test_new_farmer_skips_empty_fields() {
        let req = NewFarmer {
            name: "Habimana Eric".into(),
            phone: "+250788123456".into(),
            gender: None,
            location_id: Some(3),
            crops: vec![],
            language: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Habimana Eric","phone":"+250788123456","location_id":3}"#
        );
    }

    #[test]
    fn test_update_skips_none() {
        let update = FarmerUpdate {
            crops: Some(vec!["maize".into()]),
            ..FarmerUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"crops":["maize"]}"#);
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("0788123456").is_ok());
        assert!(validate_phone("+250788123456").is_ok());
        assert!(validate_phone("0788").is_err());
        assert!(validate_phone("07881234ab").is_err());
    }

    #[test]
    fn test_export_row_flattens_crops() {
        let farmer = Farmer {
            id: 1,
            name: "Uwase".into(),
            phone: "0788000000".into(),
            gender: Some("F".into()),
            location_id: None,
            crops: vec!["maize".into(), "beans".into()],
            language: None,
            created_at: None,
        };
        let records = export::to_records(&[FarmerRow::from(&farmer)]).unwrap();
        let csv = export::records_to_csv(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,name,phone,gender,location_id,crops,language");
        assert_eq!(lines[1], "1,Uwase,0788000000,F,,maize; beans,");
    }
}
