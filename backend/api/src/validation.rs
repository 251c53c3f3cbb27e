//! Declarative input checks applied before any write.
//!
//! A [`Validator`] collects every violation instead of stopping at the first,
//! so clients get the full field → messages map in one response.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::{ApiError, FieldErrors, Result};

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Character count within `[min, max]`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            if min == 1 {
                self.add(field, "is required");
            } else {
                self.add(field, format!("must be at least {min} characters"));
            }
        } else if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    pub fn optional_length(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, format!("must be at most {max} characters"));
            }
        }
    }

    /// A string that must be present.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>, max: usize) -> Option<&'a str> {
        match value {
            Some(v) => {
                self.length(field, v, 1, max);
                Some(v)
            }
            None => {
                self.add(field, "is required");
                None
            }
        }
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            self.add(field, format!("must be between {min} and {max}"));
        }
    }

    pub fn uuid(&mut self, field: &str, value: &str) -> Option<Uuid> {
        match Uuid::parse_str(value) {
            Ok(id) => Some(id),
            Err(_) => {
                self.add(field, "must be a valid UUID");
                None
            }
        }
    }

    /// `YYYY-MM-DD`.
    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = value?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.add(field, "must be a date in YYYY-MM-DD format");
                None
            }
        }
    }

    /// Enum membership via the type's `parse` function.
    pub fn one_of<T>(
        &mut self,
        field: &str,
        value: &str,
        allowed: &[&str],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let parsed = parse(value);
        if parsed.is_none() {
            self.add(field, format!("must be one of: {}", allowed.join(", ")));
        }
        parsed
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeup_protocol::PartyType;

    #[test]
    fn collects_every_violation() {
        let mut v = Validator::new();
        v.length("title", "  ", 1, 200);
        v.length("title", &"x".repeat(201), 1, 200);
        v.range("amount", -1i64, 1, 10);
        v.uuid("deal_id", "not-a-uuid");
        v.date("effective_date", Some("03/01/2025"));

        let Err(ApiError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["title"].len(), 2);
        assert_eq!(fields["title"][0], "is required");
        assert_eq!(fields["amount"], vec!["must be between 1 and 10"]);
        assert_eq!(fields["deal_id"], vec!["must be a valid UUID"]);
        assert!(fields.contains_key("effective_date"));
    }

    #[test]
    fn accepts_valid_input() {
        let mut v = Validator::new();
        v.length("title", "Campaign", 1, 200);
        let id = v.uuid("deal_id", "6f1c2a56-0c0e-4a47-9d1e-3d1f0f7c2b11");
        let date = v.date("effective_date", Some("2025-03-01"));
        assert!(v.date("expiration_date", None).is_none());
        let party = v.one_of("party_type", "athlete", &["athlete", "brand"], PartyType::parse);
        assert!(v.is_ok());
        assert!(id.is_some());
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(party, Some(PartyType::Athlete));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn enum_membership_lists_allowed_values() {
        let mut v = Validator::new();
        assert!(v
            .one_of("party_type", "notary", &["athlete", "brand"], PartyType::parse)
            .is_none());
        let Err(ApiError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["party_type"], vec!["must be one of: athlete, brand"]);
    }
}
