#![allow(dead_code)]

use chrono::{Datelike, Local};
use quotebind::domain::customer::CustomerForm;
use quotebind::domain::payment::PaymentForm;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 16] = [
    "first_name",
    "last_name",
    "email",
    "phone",
    "street",
    "city",
    "state",
    "zip_code",
    "vehicle_year",
    "vehicle_make",
    "vehicle_model",
    "vehicle_vin",
    "card_number",
    "card_exp_month",
    "card_exp_year",
    "card_cvv",
];

pub fn future_exp_year() -> String {
    (Local::now().year() + 2).to_string()
}

pub fn customer_form() -> CustomerForm {
    CustomerForm {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "(555) 123-4567".into(),
        street: "1 Main St".into(),
        city: "Springfield".into(),
        state: "IL".into(),
        zip_code: "62701".into(),
        vehicle_year: "2020".into(),
        vehicle_make: "Toyota".into(),
        vehicle_model: "Corolla".into(),
        vehicle_vin: String::new(),
    }
}

pub fn payment_form() -> PaymentForm {
    PaymentForm {
        card_number: "4111 1111 1111 1111".into(),
        card_exp_month: "12".into(),
        card_exp_year: future_exp_year(),
        card_cvv: "123".into(),
    }
}

/// A CSV row for `customer_form()` paying with `card_number`.
pub fn application_row(card_number: &str) -> Vec<String> {
    let c = customer_form();
    let p = payment_form();
    vec![
        c.first_name,
        c.last_name,
        c.email,
        c.phone,
        c.street,
        c.city,
        c.state,
        c.zip_code,
        c.vehicle_year,
        c.vehicle_make,
        c.vehicle_model,
        c.vehicle_vin,
        card_number.to_string(),
        p.card_exp_month,
        p.card_exp_year,
        p.card_cvv,
    ]
}

pub fn write_applications(path: &Path, rows: &[Vec<String>]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
