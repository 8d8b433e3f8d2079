use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("The file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("The file {} is empty", .0.display())]
    Empty(PathBuf),
    #[error("The file {} could not be parsed", .0.display())]
    Malformed(PathBuf, #[source] csv::Error),
    #[error("An unexpected error occurred while loading {}", .0.display())]
    Unexpected(PathBuf, #[source] csv::Error),
    #[error("No data found for sector: {0}")]
    EmptySector(String),
    #[error("An error occurred while fetching sector data for {sector}")]
    SectorFetch {
        sector: String,
        #[source]
        source: Box<ReferenceError>,
    },
}

/// One row of the approved-equities reference table. Descriptive columns
/// beyond the ticker and sector are not used and are dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "GICS Sector")]
    pub sector: String,
}

/// In-memory reference table of equities, grouped on demand by GICS sector.
///
/// `load` is the only constructor, so a `ReferenceTable` value is always
/// fully loaded; there is no "query before load" state.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReferenceError::NotFound(path.to_path_buf()));
        }

        let mut reader = csv::Reader::from_path(path).map_err(|e| load_error(path, e))?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: ReferenceRow = result.map_err(|e| load_error(path, e))?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(ReferenceError::Empty(path.to_path_buf()));
        }

        debug!("Loaded {} reference rows from {}", rows.len(), path.display());
        Ok(ReferenceTable { rows })
    }

    /// Distinct sector values in first-seen order.
    pub fn unique_sectors(&self) -> Vec<&str> {
        let mut sectors: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !sectors.contains(&row.sector.as_str()) {
                sectors.push(row.sector.as_str());
            }
        }
        sectors
    }

    /// Rows whose sector equals `sector` exactly (case-sensitive). An empty
    /// result is not an error; the caller decides what it means.
    pub fn rows_in_sector(&self, sector: &str) -> Vec<&ReferenceRow> {
        self.rows.iter().filter(|r| r.sector == sector).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn load_error(path: &Path, err: csv::Error) -> ReferenceError {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        ReferenceError::Unexpected(path.to_path_buf(), err)
    } else {
        ReferenceError::Malformed(path.to_path_buf(), err)
    }
}

/// Standalone convenience: load the table at `path` and return the rows for
/// one sector. Unlike [`ReferenceTable::rows_in_sector`], an empty match is
/// an error here, and every underlying failure is wrapped into a single
/// [`ReferenceError::SectorFetch`].
pub fn fetch_sector_rows<P: AsRef<Path>>(
    path: P,
    sector: &str,
) -> Result<Vec<ReferenceRow>, ReferenceError> {
    let wrap = |source: ReferenceError| ReferenceError::SectorFetch {
        sector: sector.to_string(),
        source: Box::new(source),
    };

    let table = ReferenceTable::load(path).map_err(&wrap)?;
    let rows: Vec<ReferenceRow> = table
        .rows_in_sector(sector)
        .into_iter()
        .cloned()
        .collect();

    if rows.is_empty() {
        return Err(wrap(ReferenceError::EmptySector(sector.to_string())));
    }
    Ok(rows)
}
