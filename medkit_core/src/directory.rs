//! Pharmacy directory.
//!
//! The directory is a read-only list of pharmacies. Distance filtering and
//! ordering happen in [`crate::proximity`], not here.

use crate::proximity::{Coordinate, Located};
use crate::Result;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A pharmacy record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
}

impl Located for Pharmacy {
    fn coordinate(&self) -> Coordinate {
        self.location
    }
}

/// Source of pharmacy records
pub trait PharmacyDirectory {
    /// Every pharmacy in the directory
    fn all(&self) -> Result<Vec<Pharmacy>>;
}

/// CSV row format: `id,name,latitude,longitude`
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl TryFrom<CsvRow> for Pharmacy {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        Ok(Pharmacy {
            location: Coordinate::new(row.latitude, row.longitude)?,
            id: row.id,
            name: row.name,
        })
    }
}

/// Directory stored as a CSV file
pub struct CsvDirectory {
    path: PathBuf,
}

impl CsvDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PharmacyDirectory for CsvDirectory {
    /// Read all pharmacies
    ///
    /// A missing file is an empty directory. Rows that fail to parse are
    /// logged and skipped.
    fn all(&self) -> Result<Vec<Pharmacy>> {
        if !self.path.exists() {
            tracing::info!("No pharmacy directory found at {:?}", self.path);
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut pharmacies = Vec::new();
        for result in reader.deserialize::<CsvRow>() {
            match result {
                Ok(row) => match Pharmacy::try_from(row) {
                    Ok(pharmacy) => pharmacies.push(pharmacy),
                    Err(e) => tracing::warn!("Skipping pharmacy row: {}", e),
                },
                Err(e) => {
                    tracing::warn!("Failed to deserialize pharmacy row: {}", e);
                }
            }
        }

        tracing::debug!(
            "Read {} pharmacies from {:?}",
            pharmacies.len(),
            self.path
        );
        Ok(pharmacies)
    }
}
