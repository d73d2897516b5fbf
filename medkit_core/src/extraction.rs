//! Typed boundary to the image extraction service.
//!
//! The service itself is a black box: it receives an image as a base64 data
//! URI and answers with JSON. This module builds the request bodies and
//! parses the answers strictly, so anything the store consumes has a known
//! shape.

use crate::repository::InventoryRepository;
use crate::store::InventoryStore;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

// ============================================================================
// Data URIs
// ============================================================================

/// An image encoded as `data:<mime>;base64,<payload>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: Vec<u8>,
}

impl DataUri {
    pub fn from_bytes(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read an image file, taking the MIME type from its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let mime_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            other => {
                return Err(Error::Extraction(format!(
                    "unsupported image type {:?} for {:?}",
                    other, path
                )))
            }
        };

        let data = std::fs::read(path)?;
        tracing::debug!("Read {} bytes of {} from {:?}", data.len(), mime_type, path);
        Ok(Self::from_bytes(mime_type, data))
    }

    /// Parse a `data:` URI; only base64 payloads are accepted
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::Extraction("data URI must start with \"data:\"".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::Extraction("data URI has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::Extraction("data URI must be base64 encoded".into()))?;
        if mime_type.is_empty() || !mime_type.contains('/') {
            return Err(Error::Extraction(format!(
                "data URI has no MIME type: {:?}",
                mime_type
            )));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|e| Error::Extraction(format!("invalid base64 payload: {}", e)))?;
        Ok(Self::from_bytes(mime_type, data))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        DataUri::parse(&uri).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Body of a prescription analysis request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionAnalysisRequest {
    pub prescription_image: DataUri,
}

/// Body of a pill identification request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PillIdentificationRequest {
    pub photo_data_uri: DataUri,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub existing_medicines: Vec<String>,
}

impl PillIdentificationRequest {
    /// Request that lists every medicine already in the inventory
    pub fn for_inventory<R: InventoryRepository>(
        photo: DataUri,
        store: &InventoryStore<R>,
    ) -> Self {
        Self {
            photo_data_uri: photo,
            existing_medicines: store.medicines().iter().map(|m| m.name.clone()).collect(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// One medicine read off a prescription
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionItem {
    pub name: String,
    pub dosage: String,
    /// When to take it, in the prescriber's words
    pub timing: String,
}

/// Result of analysing a prescription image
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionAnalysis {
    pub medicines: Vec<PrescriptionItem>,
}

/// Result of identifying a pill package
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PillIdentification {
    /// Empty when the package could not be identified
    pub medicine_name: String,
    pub usage: String,
    pub is_new_medicine: bool,
}

impl PillIdentification {
    pub fn is_identified(&self) -> bool {
        !self.medicine_name.trim().is_empty()
    }

    /// Recompute `is_new_medicine` against the local inventory
    ///
    /// The service only sees the names we sent it, so its answer can be stale.
    pub fn reconcile<R: InventoryRepository>(mut self, store: &InventoryStore<R>) -> Self {
        let is_new = self.is_identified() && !store.is_known(&self.medicine_name);
        if is_new != self.is_new_medicine {
            tracing::debug!(
                "Service marked {:?} new={}, inventory says new={}",
                self.medicine_name,
                self.is_new_medicine,
                is_new
            );
        }
        self.is_new_medicine = is_new;
        self
    }
}

/// Parse and validate a prescription analysis response
///
/// Unknown or missing fields and blank medicine names are rejected; nothing
/// is partially accepted.
pub fn parse_prescription_analysis(json: &str) -> Result<PrescriptionAnalysis> {
    let mut analysis: PrescriptionAnalysis = serde_json::from_str(json)
        .map_err(|e| Error::Extraction(format!("malformed prescription analysis: {}", e)))?;

    for (index, item) in analysis.medicines.iter_mut().enumerate() {
        item.name = item.name.trim().to_string();
        item.dosage = item.dosage.trim().to_string();
        item.timing = item.timing.trim().to_string();
        if item.name.is_empty() {
            return Err(Error::Extraction(format!(
                "medicine {} in prescription has no name",
                index + 1
            )));
        }
    }

    tracing::debug!(
        "Parsed prescription with {} medicines",
        analysis.medicines.len()
    );
    Ok(analysis)
}

/// Parse and validate a pill identification response
pub fn parse_pill_identification(json: &str) -> Result<PillIdentification> {
    let mut identification: PillIdentification = serde_json::from_str(json)
        .map_err(|e| Error::Extraction(format!("malformed pill identification: {}", e)))?;
    identification.medicine_name = identification.medicine_name.trim().to_string();
    Ok(identification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use chrono::NaiveDate;

    #[test]
    fn test_data_uri_display_and_parse() {
        let uri = DataUri::from_bytes("image/png", b"hello".to_vec());
        let text = uri.to_string();
        assert_eq!(text, "data:image/png;base64,aGVsbG8=");
        assert_eq!(DataUri::parse(&text).unwrap(), uri);
    }

    #[test]
    fn test_data_uri_rejects_malformed() {
        for bad in [
            "image/png;base64,aGVsbG8=",
            "data:image/png;base64",
            "data:image/png,aGVsbG8=",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64,not base64!",
        ] {
            assert!(
                matches!(DataUri::parse(bad), Err(Error::Extraction(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_data_uri_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("box.JPG");
        std::fs::write(&path, [0xffu8, 0xd8, 0xff]).unwrap();

        let uri = DataUri::from_path(&path).unwrap();
        assert_eq!(uri.mime_type(), "image/jpeg");
        assert_eq!(uri.data(), &[0xff, 0xd8, 0xff]);

        let text_path = temp_dir.path().join("notes.txt");
        std::fs::write(&text_path, "hi").unwrap();
        assert!(DataUri::from_path(&text_path).is_err());
    }

    #[test]
    fn test_request_wire_format() {
        let request = PillIdentificationRequest {
            photo_data_uri: DataUri::from_bytes("image/png", b"hello".to_vec()),
            existing_medicines: vec!["Metformin".into()],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["photoDataUri"], "data:image/png;base64,aGVsbG8=");
        assert_eq!(value["existingMedicines"][0], "Metformin");

        let request = PrescriptionAnalysisRequest {
            prescription_image: DataUri::from_bytes("image/jpeg", vec![1, 2, 3]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["prescriptionImage"], "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_parse_prescription_analysis() {
        let json = r#"{"medicines": [
            {"name": " Metformin ", "dosage": "500mg", "timing": "1-0-1"},
            {"name": "Atorvastatin", "dosage": "10mg", "timing": "at night"}
        ]}"#;
        let analysis = parse_prescription_analysis(json).unwrap();
        assert_eq!(analysis.medicines.len(), 2);
        assert_eq!(analysis.medicines[0].name, "Metformin");
        assert_eq!(analysis.medicines[1].timing, "at night");
    }

    #[test]
    fn test_parse_prescription_analysis_rejects_bad_shapes() {
        for bad in [
            r#"{"medicines": [{"name": "A", "dosage": "1"}]}"#,
            r#"{"medicines": [{"name": "A", "dosage": "1", "timing": "x", "extra": 1}]}"#,
            r#"{"medicines": [{"name": "  ", "dosage": "1", "timing": "x"}]}"#,
            r#"{"items": []}"#,
            "not json",
        ] {
            assert!(
                matches!(parse_prescription_analysis(bad), Err(Error::Extraction(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_pill_identification() {
        let json = r#"{"medicineName": "Ibuprofen", "usage": "Pain relief.", "isNewMedicine": true}"#;
        let pill = parse_pill_identification(json).unwrap();
        assert!(pill.is_identified());
        assert_eq!(pill.medicine_name, "Ibuprofen");

        let unknown = r#"{"medicineName": "", "usage": "", "isNewMedicine": false}"#;
        assert!(!parse_pill_identification(unknown).unwrap().is_identified());

        let missing = r#"{"medicineName": "Ibuprofen"}"#;
        assert!(parse_pill_identification(missing).is_err());
    }

    #[test]
    fn test_reconcile_against_inventory() {
        let repo = MemoryRepository::new();
        let mut store =
            InventoryStore::open(&repo, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        store
            .add_from_prescription(&[PrescriptionItem {
                name: "Ibuprofen".into(),
                dosage: "200mg".into(),
                timing: "twice a day".into(),
            }])
            .unwrap();

        let pill = PillIdentification {
            medicine_name: "IBUPROFEN".into(),
            usage: "Pain relief.".into(),
            is_new_medicine: true,
        };
        assert!(!pill.reconcile(&store).is_new_medicine);

        let pill = PillIdentification {
            medicine_name: "Cetirizine".into(),
            usage: "Allergies.".into(),
            is_new_medicine: false,
        };
        assert!(pill.reconcile(&store).is_new_medicine);

        let request = PillIdentificationRequest::for_inventory(
            DataUri::from_bytes("image/png", vec![]),
            &store,
        );
        assert_eq!(request.existing_medicines, vec!["Ibuprofen".to_string()]);
    }
}
