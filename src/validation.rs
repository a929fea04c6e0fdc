// Field-level validation errors produced by the normalizer

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Domain,
    Origin,
    Destination,
    DepartureDate,
    ReturnDate,
    Adults,
    Rooms,
    MaxResults,
    Currency,
    HotelIds,
    CheckIn,
    CheckOut,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Domain => "domain",
            Field::Origin => "origin",
            Field::Destination => "destination",
            Field::DepartureDate => "departureDate",
            Field::ReturnDate => "returnDate",
            Field::Adults => "adults",
            Field::Rooms => "rooms",
            Field::MaxResults => "max",
            Field::Currency => "currency",
            Field::HotelIds => "hotelIds",
            Field::CheckIn => "checkInDate",
            Field::CheckOut => "checkOutDate",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Field::Domain => "Search type",
            Field::Origin => "Departure airport",
            Field::Destination => "Arrival airport",
            Field::DepartureDate => "Departure date",
            Field::ReturnDate => "Return date",
            Field::Adults => "Number of adults",
            Field::Rooms => "Number of rooms",
            Field::MaxResults => "Result limit",
            Field::Currency => "Currency",
            Field::HotelIds => "Hotel",
            Field::CheckIn => "Check-in date",
            Field::CheckOut => "Check-out date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    #[error("is required")]
    Missing,

    #[error("does not match any known location")]
    UnresolvedLocation,

    #[error("has an unrecognized format")]
    InvalidFormat,

    #[error("is outside the allowed date range")]
    InvalidDateRange,

    #[error("must be between {min} and {max}")]
    OutOfRange { min: u32, max: u32 },

    #[error("must differ from the departure airport")]
    SameAsOrigin,

    #[error("does not belong to this search page")]
    DomainMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {kind}")]
pub struct FieldError {
    pub field: Field,
    pub kind: FieldErrorKind,
}

impl FieldError {
    // Text shown inline under the offending input
    pub fn message(&self) -> String {
        match (self.field, &self.kind) {
            (Field::Origin, FieldErrorKind::Missing) => {
                "Please select a departure airport".to_string()
            }
            (Field::Destination, FieldErrorKind::Missing) => {
                "Please select an arrival airport".to_string()
            }
            (Field::DepartureDate, FieldErrorKind::Missing) => {
                "Please select a departure date".to_string()
            }
            (Field::DepartureDate, FieldErrorKind::InvalidDateRange) => {
                "Departure date cannot be in the past".to_string()
            }
            (Field::ReturnDate, FieldErrorKind::InvalidDateRange) => {
                "Return date must be on or after the departure date".to_string()
            }
            (Field::CheckOut, FieldErrorKind::InvalidDateRange) => {
                "Check-out date must be after the check-in date".to_string()
            }
            (field, kind) => format!("{} {}", field.label(), kind),
        }
    }
}

/// Every invalid field found while normalizing one query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: Field, kind: FieldErrorKind) -> Self {
        let mut error = Self::default();
        error.push(field, kind);
        error
    }

    pub fn push(&mut self, field: Field, kind: FieldErrorKind) {
        self.errors.push(FieldError { field, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn fields(&self) -> Vec<Field> {
        self.errors.iter().map(|e| e.field).collect()
    }

    pub fn kind_of(&self, field: Field) -> Option<&FieldErrorKind> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| &e.kind)
    }

    pub fn has(&self, field: Field, kind: &FieldErrorKind) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && &e.kind == kind)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid search input")?;
        for (i, error) in self.errors.iter().enumerate() {
            let separator = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", separator, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
