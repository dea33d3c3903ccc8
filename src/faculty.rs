use crate::error::ExamError;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct FacultyRow {
    email: String,
    password: String,
}

/// Faculty logins keyed by email. Lookups are plain string comparison.
#[derive(Debug, Clone, Default)]
pub struct FacultyDirectory {
    accounts: HashMap<String, String>,
}

impl FacultyDirectory {
    pub fn from_pairs<I, E, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, P)>,
        E: Into<String>,
        P: Into<String>,
    {
        Self {
            accounts: pairs.into_iter().map(|(e, p)| (e.into(), p.into())).collect(),
        }
    }

    /// Reads an `email,password` CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut accounts = HashMap::new();
        for row in csv_reader.deserialize() {
            let row: FacultyRow = row?;
            accounts.insert(row.email, row.password);
        }
        Ok(Self { accounts })
    }

    /// A missing file gives an empty directory, so every login fails.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!("faculty credential file {} not found, faculty login disabled", path.display());
            return Ok(Self::default());
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn verify(&self, email: &str, password: &str) -> Result<(), ExamError> {
        match self.accounts.get(email) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(ExamError::InvalidCredentials),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
