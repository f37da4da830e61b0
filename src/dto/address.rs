use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::FieldError, models::Address};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddAddressRequest {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub pincode: String,
}

/// Address fields after validation and normalization, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub pincode: String,
}

impl AddAddressRequest {
    /// Validates all fields at once. Phone is normalized by stripping
    /// separators and country-code characters and must leave exactly
    /// 10 digits; pincode is stripped of spaces and must leave exactly 6.
    pub fn validate(&self) -> Result<ValidatedAddress, Vec<FieldError>> {
        let mut errors = Vec::new();

        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            errors.push(FieldError::new("fullName", "Full name is required"));
        }

        let phone: String = self
            .phone
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'))
            .collect();
        if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new(
                "phone",
                "Valid 10-digit phone number is required",
            ));
        }

        let street = self.street.trim().to_string();
        if street.is_empty() {
            errors.push(FieldError::new("street", "Street is required"));
        }

        let city = self.city.trim().to_string();
        if city.is_empty() {
            errors.push(FieldError::new("city", "City is required"));
        }

        let pincode: String = self.pincode.trim().chars().filter(|c| *c != ' ').collect();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new(
                "pincode",
                "Valid 6-digit pincode is required",
            ));
        }

        if errors.is_empty() {
            Ok(ValidatedAddress {
                full_name,
                phone,
                street,
                city,
                pincode,
            })
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub addresses: Vec<Address>,
}
