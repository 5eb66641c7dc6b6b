use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use galley_core::validation::{optional_text, required_text};
use galley_core::{CustomerId, DomainError, DomainResult, Entity, ValidationErrors};

pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 255;

/// Restaurant customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub loyalty_points: i64,
    pub preferences: Vec<String>,
    pub allergies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId, fields: CustomerFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            birthdate: fields.birthdate,
            loyalty_points: 0,
            preferences: fields.preferences,
            allergies: fields.allergies,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the profile; loyalty points are only changed through
    /// [`Customer::add_loyalty_points`].
    pub fn apply_fields(&mut self, fields: CustomerFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.email = fields.email;
        self.phone = fields.phone;
        self.address = fields.address;
        self.birthdate = fields.birthdate;
        self.preferences = fields.preferences;
        self.allergies = fields.allergies;
        self.updated_at = now;
    }

    pub fn add_loyalty_points(&mut self, points: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        if points <= 0 {
            return Err(DomainError::validation("points", "must be at least 1"));
        }
        self.loyalty_points = self
            .loyalty_points
            .checked_add(points)
            .ok_or_else(|| DomainError::validation("points", "loyalty balance overflow"))?;
        self.updated_at = now;
        Ok(self.loyalty_points)
    }

    pub fn formatted_phone(&self) -> Option<String> {
        self.phone.as_deref().map(format_phone)
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Render every run of ten consecutive digits as `(ddd) ddd-dddd`.
///
/// Runs are taken left to right without overlap, so surplus digits stay
/// as they are. Anything without such a run is returned unchanged.
pub fn format_phone(phone: &str) -> String {
    let mut out = String::with_capacity(phone.len() + 4);
    let mut rest = phone;
    while let Some(ch) = rest.chars().next() {
        match rest.as_bytes().get(..10) {
            Some(run) if run.iter().all(u8::is_ascii_digit) => {
                out.push_str(&format!("({}) {}-{}", &rest[..3], &rest[3..6], &rest[6..10]));
                rest = &rest[10..];
            }
            _ => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}

/// Unvalidated create/edit input for a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub preferences: Vec<String>,
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub preferences: Vec<String>,
    pub allergies: Vec<String>,
}

impl CustomerDraft {
    pub fn validate(&self) -> DomainResult<CustomerFields> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", &self.name, NAME_MAX_LEN);
        let email = required_text(&mut errors, "email", &self.email, EMAIL_MAX_LEN).filter(|e| {
            let valid = e
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                errors.push("email", "must be a valid email address");
            }
            valid
        });
        let phone = optional_text(&mut errors, "phone", self.phone.as_deref(), Some(32));
        let address = optional_text(&mut errors, "address", self.address.as_deref(), None);

        errors.into_result()?;
        match (name, email) {
            (Some(name), Some(email)) => Ok(CustomerFields {
                name,
                email,
                phone,
                address,
                birthdate: self.birthdate,
                preferences: clean_tags(&self.preferences),
                allergies: clean_tags(&self.allergies),
            }),
            _ => Err(DomainError::validation("customer", "incomplete input")),
        }
    }
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
