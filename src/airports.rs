// Local airport directory, loaded from the IATA/ICAO CSV export
// Backs both free-text resolution in the normalizer and offline autocomplete

use crate::models::Location;
use crate::provider::{LocationResolver, ProviderError, MAX_SUGGESTIONS, MIN_FRAGMENT_LEN};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Airport file is empty or has no header row")]
    MissingHeader,

    #[error("Airport file header lacks column {0}")]
    MissingColumn(&'static str),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Synchronous lookup used while normalizing form input.
pub trait AirportLookup: Send + Sync {
    fn resolve(&self, text: &str) -> Option<Location>;
}

#[derive(Debug, Default, Clone)]
pub struct AirportDirectory {
    airports: Vec<Location>,
    by_code: HashMap<String, usize>,
}

impl AirportDirectory {
    pub fn from_locations(locations: Vec<Location>) -> Self {
        let mut directory = Self::default();
        for location in locations {
            let code = location.code.to_uppercase();
            if directory.by_code.contains_key(&code) {
                continue;
            }
            directory.by_code.insert(code, directory.airports.len());
            directory.airports.push(location);
        }
        directory
    }

    // Expected columns: country_code, region_name, iata, icao, airport, latitude, longitude
    pub fn from_csv(content: &str) -> Result<Self, DirectoryError> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(DirectoryError::MissingHeader)?;
        let columns = split_csv_line(header);
        let position = |name: &'static str| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .ok_or(DirectoryError::MissingColumn(name))
        };
        let country_col = position("country_code")?;
        let region_col = position("region_name")?;
        let iata_col = position("iata")?;
        let airport_col = position("airport")?;

        let mut locations = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let fields = split_csv_line(line);
            let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
            let (iata, airport, region) = (field(iata_col), field(airport_col), field(region_col));

            // Rows without a code, a name or a region cannot be searched meaningfully
            if iata.is_empty() || airport.is_empty() || region.is_empty() {
                skipped += 1;
                continue;
            }
            locations.push(Location {
                code: iata.to_uppercase(),
                name: airport.to_string(),
                locality: region.to_string(),
                country: field(country_col).to_string(),
            });
        }

        debug!(airports = locations.len(), skipped, "loaded airport directory");
        Ok(Self::from_locations(locations))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv(&content)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    pub fn by_code(&self, code: &str) -> Option<&Location> {
        self.by_code
            .get(&code.trim().to_uppercase())
            .map(|&i| &self.airports[i])
    }

    /// Ranked matches for a typed fragment: exact code, code prefix, name
    /// prefix, name substring, then region substring. Directory order breaks ties.
    pub fn search(&self, fragment: &str, limit: usize) -> Vec<Location> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(u8, &Location)> = self
            .airports
            .iter()
            .filter_map(|airport| match_rank(airport, &needle).map(|rank| (rank, airport)))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked
            .into_iter()
            .take(limit)
            .map(|(_, airport)| airport.clone())
            .collect()
    }
}

fn match_rank(airport: &Location, needle: &str) -> Option<u8> {
    let code = airport.code.to_lowercase();
    let name = airport.name.to_lowercase();
    if code == needle {
        Some(0)
    } else if code.starts_with(needle) {
        Some(1)
    } else if name.starts_with(needle) {
        Some(2)
    } else if name.contains(needle) {
        Some(3)
    } else if airport.locality.to_lowercase().contains(needle) {
        Some(4)
    } else {
        None
    }
}

impl AirportLookup for AirportDirectory {
    fn resolve(&self, text: &str) -> Option<Location> {
        let text = text.trim();
        if text.chars().count() < MIN_FRAGMENT_LEN {
            return None;
        }
        if let Some(airport) = self.by_code(text) {
            return Some(airport.clone());
        }
        if let Some(airport) = self
            .airports
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(text))
        {
            return Some(airport.clone());
        }
        self.search(text, 1).into_iter().next()
    }
}

#[async_trait]
impl LocationResolver for AirportDirectory {
    async fn resolve(&self, fragment: &str) -> Result<Vec<Location>, ProviderError> {
        if fragment.trim().chars().count() < MIN_FRAGMENT_LEN {
            return Ok(Vec::new());
        }
        Ok(self.search(fragment, MAX_SUGGESTIONS))
    }
}

// Splits one CSV line, honouring double-quoted fields that contain commas
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_csv_loading_skips_rows_without_codes() {
        let directory = directory();
        assert_eq!(directory.len(), 5);
        let jfk = directory.by_code("jfk").unwrap();
        assert_eq!(jfk.name, "John F. Kennedy International Airport");
        assert_eq!(jfk.locality, "New York");
        assert_eq!(jfk.country, "US");
    }

    #[test]
    fn test_csv_requires_header_columns() {
        assert!(matches!(
            AirportDirectory::from_csv(""),
            Err(DirectoryError::MissingHeader)
        ));
        assert!(matches!(
            AirportDirectory::from_csv("\"iata\",\"airport\"\n"),
            Err(DirectoryError::MissingColumn("country_code"))
        ));
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        assert_eq!(
            split_csv_line(r#""a","b, c",d"#),
            vec!["a".to_string(), "b, c".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn test_search_ranks_code_matches_before_names() {
        let directory = directory();
        let codes: Vec<String> = directory
            .search("lon", 10)
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["LHR", "LGW"]);

        let exact = directory.search("DUB", 10);
        assert_eq!(exact[0].code, "DUB");
    }

    #[test]
    fn test_resolve_free_text() {
        let directory = directory();
        assert_eq!(
            AirportLookup::resolve(&directory, "Heathrow").map(|l| l.code),
            Some("LHR".to_string())
        );
        assert_eq!(
            AirportLookup::resolve(&directory, "paris charles de gaulle airport").map(|l| l.code),
            Some("CDG".to_string())
        );
        assert_eq!(AirportLookup::resolve(&directory, "Atlantis"), None);
    }

    #[tokio::test]
    async fn test_autocomplete_needs_two_characters() {
        let directory = directory();
        let short = LocationResolver::resolve(&directory, "L").await.unwrap();
        assert!(short.is_empty());

        let suggestions = LocationResolver::resolve(&directory, "England").await.unwrap();
        assert_eq!(suggestions.len(), 2);
    }
}
