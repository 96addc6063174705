//! Field validation for the customer/vehicle and payment steps.
//!
//! Every check runs before any network call. A step either yields a fully
//! normalized record or a single message; nothing is partially normalized.
//! Feeding a normalized record back through its validator returns it unchanged.

use super::customer::{Address, CustomerForm, CustomerProfile, VehicleInfo};
use super::payment::{PaymentForm, PaymentInstrument};
use crate::error::WorkflowError;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_VEHICLE_YEAR: i32 = 1900;
pub const MIN_PHONE_DIGITS: usize = 10;
pub const CARD_EXPIRY_HORIZON_YEARS: i32 = 20;

const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(-[0-9]{4})?$").expect("valid postal code regex"));

fn invalid(message: impl Into<String>) -> WorkflowError {
    WorkflowError::Validation(message.into())
}

/// Validates the customer/vehicle step and returns the normalized records.
pub fn validate_customer(
    form: &CustomerForm,
    today: NaiveDate,
) -> Result<(CustomerProfile, VehicleInfo), WorkflowError> {
    let required = [
        &form.first_name,
        &form.last_name,
        &form.email,
        &form.phone,
        &form.street,
        &form.city,
        &form.state,
        &form.zip_code,
        &form.vehicle_year,
        &form.vehicle_make,
        &form.vehicle_model,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(invalid(REQUIRED_FIELDS_MESSAGE));
    }

    let email = form.email.trim();
    if !is_valid_email(email) {
        return Err(invalid("Please enter a valid email address"));
    }

    let phone = normalize_phone(&form.phone).ok_or_else(|| {
        invalid("Please enter a valid phone number with at least 10 digits")
    })?;

    let zip_code = form.zip_code.trim();
    if !is_valid_postal_code(zip_code) {
        return Err(invalid(
            "Please enter a valid ZIP code (12345 or 12345-6789)",
        ));
    }

    let max_year = today.year() + 1;
    let year = parse_digits(&form.vehicle_year)
        .filter(|year| (MIN_VEHICLE_YEAR..=max_year).contains(year))
        .ok_or_else(|| {
            invalid(format!(
                "Please enter a valid vehicle year between {MIN_VEHICLE_YEAR} and {max_year}"
            ))
        })?;

    let vin = Some(form.vehicle_vin.trim())
        .filter(|vin| !vin.is_empty())
        .map(str::to_string);

    let customer = CustomerProfile {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        email: email.to_string(),
        phone,
        address: Address {
            street: form.street.trim().to_string(),
            city: form.city.trim().to_string(),
            state: form.state.trim().to_string(),
            zip_code: zip_code.to_string(),
        },
    };
    let vehicle = VehicleInfo {
        year,
        make: form.vehicle_make.trim().to_string(),
        model: form.vehicle_model.trim().to_string(),
        vin,
    };
    Ok((customer, vehicle))
}

/// Validates the payment step and returns the normalized card details.
pub fn validate_payment(
    form: &PaymentForm,
    today: NaiveDate,
) -> Result<PaymentInstrument, WorkflowError> {
    let required = [
        &form.card_number,
        &form.card_exp_month,
        &form.card_exp_year,
        &form.card_cvv,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(invalid(REQUIRED_FIELDS_MESSAGE));
    }

    let card_number = normalize_card_number(&form.card_number)
        .ok_or_else(|| invalid("Please enter a valid card number (13-19 digits)"))?;

    let exp_month = parse_digits(&form.card_exp_month)
        .filter(|month| (1..=12).contains(month))
        .ok_or_else(|| invalid("Please enter a valid expiry month (1-12)"))?;

    let current_year = today.year();
    let last_year = current_year + CARD_EXPIRY_HORIZON_YEARS;
    let exp_year = parse_digits(&form.card_exp_year)
        .filter(|year| (current_year..=last_year).contains(year))
        .ok_or_else(|| {
            invalid(format!(
                "Please enter a valid expiry year ({current_year}-{last_year})"
            ))
        })?;

    if exp_year == current_year && (exp_month as u32) < today.month() {
        return Err(invalid("This card has expired"));
    }

    let cvv = form.card_cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Please enter a valid CVV (3-4 digits)"));
    }

    Ok(PaymentInstrument {
        card_number,
        exp_month: exp_month as u32,
        exp_year,
        cvv: cvv.to_string(),
    })
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_postal_code(zip_code: &str) -> bool {
    POSTAL_CODE_RE.is_match(zip_code)
}

/// Returns the phone's digits (keeping a leading `+`) when it only contains
/// digits, `+`, `-`, parentheses, and spaces, and has enough digits.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ');
    if !phone.chars().all(allowed) {
        return None;
    }
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    if phone.starts_with('+') {
        Some(format!("+{digits}"))
    } else {
        Some(digits)
    }
}

/// Strips whitespace and returns the card number if 13 to 19 digits remain.
pub fn normalize_card_number(card_number: &str) -> Option<String> {
    let stripped: String = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    let all_digits = stripped.chars().all(|c| c.is_ascii_digit());
    (all_digits && (13..=19).contains(&stripped.len())).then_some(stripped)
}

fn parse_digits(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
