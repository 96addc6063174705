use crate::domain::customer::CustomerForm;
use crate::domain::payment::PaymentForm;
use crate::error::{AppError, Result};
use serde::Deserialize;
use std::io::Read;

/// One insurance application: the customer, vehicle, and card columns of a
/// single CSV row, kept as raw text for the field validator.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct ApplicationRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub vehicle_year: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_vin: String,
    pub card_number: String,
    pub card_exp_month: String,
    pub card_exp_year: String,
    pub card_cvv: String,
}

impl ApplicationRow {
    pub fn customer_form(&self) -> CustomerForm {
        CustomerForm {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            vehicle_year: self.vehicle_year.clone(),
            vehicle_make: self.vehicle_make.clone(),
            vehicle_model: self.vehicle_model.clone(),
            vehicle_vin: self.vehicle_vin.clone(),
        }
    }

    pub fn payment_form(&self) -> PaymentForm {
        PaymentForm {
            card_number: self.card_number.clone(),
            card_exp_month: self.card_exp_month.clone(),
            card_exp_year: self.card_exp_year.clone(),
            card_cvv: self.card_cvv.clone(),
        }
    }
}

/// Reads applications from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<ApplicationRow>`. Fields are trimmed and a missing `vehicle_vin`
/// column is tolerated.
pub struct ApplicationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ApplicationReader<R> {
    /// Wraps `source`, expecting a header row naming the application columns.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes applications.
    pub fn applications(self) -> impl Iterator<Item = Result<ApplicationRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(AppError::from))
    }
}
