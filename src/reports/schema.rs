// src/reports/schema.rs

use crate::error::{Error, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

/// A column the ingestion step needs, with the header spellings it accepts
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub synonyms: &'a [&'a str],
}

impl<'a> Column<'a> {
    pub const fn named(name: &'a str) -> Self {
        Column { name, synonyms: &[] }
    }
}

pub const CLASS: Column<'static> = Column::named("class");
pub const TYPE: Column<'static> = Column::named("type");
pub const BUG_TYPE: Column<'static> = Column::named("bug_type");
pub const REFACTORING_TYPE: Column<'static> = Column::named("refactoring_type");
pub const QTD_REFACTORINGS: Column<'static> = Column {
    name: "qtd_refactorings",
    synonyms: &["qtd.refactorings", "qtd refactorings"],
};

/// A CSV table with case-insensitive header lookup
#[derive(Debug, Clone)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::missing(path));
        }
        let file = std::fs::File::open(path)?;
        RawTable::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(RawTable {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn find(&self, column: Column<'_>) -> Option<usize> {
        std::iter::once(column.name)
            .chain(column.synonyms.iter().copied())
            .find_map(|wanted| {
                let wanted = wanted.to_lowercase();
                self.headers.iter().position(|h| *h == wanted)
            })
    }

    /// Index of a required column, or a `Schema` error naming what was looked for.
    pub fn require(&self, column: Column<'_>) -> Result<usize> {
        self.find(column).ok_or_else(|| {
            let mut accepted = vec![column.name];
            accepted.extend_from_slice(column.synonyms);
            Error::schema(
                &self.name,
                format!(
                    "required column `{}` not found (accepted: {}; present: {})",
                    column.name,
                    accepted.join(", "),
                    self.headers.join(", ")
                ),
            )
        })
    }
}

/// Field of `row` at `idx`, trimmed; empty when the row is short.
pub fn field(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).map(str::trim).unwrap_or("")
}
