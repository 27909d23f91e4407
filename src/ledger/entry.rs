use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when creating a [`MilkEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("quantity must be a finite, non-negative number of litres")]
    InvalidQuantity,
}

/// One day's recorded milk transaction. The calendar date is the unique
/// key: saving an entry for a date that already has one replaces the old
/// record entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilkEntry {
    /// Opaque record identifier; regenerated when entries are imported.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Calendar date the milk changed hands. No time component.
    pub date: NaiveDate,
    /// Quantity in litres, always finite and non-negative.
    pub quantity: f64,
    /// True when the milk was borrowed (amount to pay); false when it
    /// was sold (amount to receive).
    #[serde(rename = "isBorrowed")]
    pub is_borrowed: bool,
}

impl MilkEntry {
    /// Creates a new entry after validating the quantity.
    pub fn new(date: NaiveDate, quantity: f64, is_borrowed: bool) -> Result<Self, EntryError> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(EntryError::InvalidQuantity);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            date,
            quantity,
            is_borrowed,
        })
    }

    /// Returns a copy of this entry under a freshly generated id.
    pub fn with_new_id(mut self) -> Self {
        self.id = Uuid::new_v4();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_negative_and_non_finite_quantities() {
        assert_eq!(
            MilkEntry::new(date(2024, 4, 1), -0.5, true),
            Err(EntryError::InvalidQuantity)
        );
        assert_eq!(
            MilkEntry::new(date(2024, 4, 1), f64::NAN, false),
            Err(EntryError::InvalidQuantity)
        );
        assert_eq!(
            MilkEntry::new(date(2024, 4, 1), f64::INFINITY, false),
            Err(EntryError::InvalidQuantity)
        );
    }

    #[test]
    fn zero_quantity_is_valid() {
        let entry = MilkEntry::new(date(2024, 4, 1), 0.0, true).unwrap();
        assert_eq!(entry.quantity, 0.0);
    }

    #[test]
    fn serializes_with_interchange_field_names() {
        let entry = MilkEntry::new(date(2024, 4, 2), 1.5, true).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2024-04-02");
        assert_eq!(json["isBorrowed"], true);
        assert!(json.get("id").is_some());
    }

    #[test]
    fn deserializes_without_id() {
        let entry: MilkEntry = serde_json::from_str(
            r#"{"date":"2024-04-02","quantity":2.0,"isBorrowed":false}"#,
        )
        .unwrap();
        assert_eq!(entry.date, date(2024, 4, 2));
        assert!(!entry.is_borrowed);
    }
}
