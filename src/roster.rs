use std::io;
use std::path::Path;

use crate::StudentRecord;

/// Possible errors to occur while reading the student table
///
/// Any of these fails the whole batch, individual bad rows never do.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Failed to open the student table {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to read the student table: {0}")]
    Read(#[from] csv::Error),
}

/// The valid students of one input table
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Roster {
    /// Valid records in source row order
    pub students: Vec<StudentRecord>,
    /// Number of non-blank rows rejected because of a missing name or id
    pub skipped: usize,
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Loads the roster from a table on disk
pub fn load_roster(path: impl AsRef<Path>) -> Result<Roster, RosterError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| RosterError::Open {
        path: path.display().to_string(),
        source: e.into(),
    })?;

    read_roster(file)
}

/// Reads the roster from any tabular source
///
/// The first row is always treated as the header. Blank rows are skipped
/// silently, rows without a name or id are skipped with a warning.
pub fn read_roster<R: io::Read>(reader: R) -> Result<Roster, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut roster = Roster::default();

    for row in reader.records().skip(1) {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());

        if row.iter().all(str::is_empty) {
            log::debug!("Skipping blank row on line {}", line);
            continue;
        }

        let name = row.get(0).unwrap_or_default();
        let identifier = row.get(1).unwrap_or_default();
        let phone = row.get(2).unwrap_or_default();
        log::debug!(
            "Row data - Name: '{}', ID: '{}', Phone: '{}'",
            name, identifier, phone,
        );

        match StudentRecord::new(name, identifier, phone) {
            Some(student) => roster.students.push(student),
            None => {
                log::warn!(
                    "Skipping invalid row on line {} - Name: '{}', ID: '{}'",
                    line, name, identifier,
                );
                roster.skipped += 1;
            }
        }
    }

    Ok(roster)
}
