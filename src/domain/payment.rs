use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw card input as typed into the payment step.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentForm {
    pub card_number: String,
    pub card_exp_month: String,
    pub card_exp_year: String,
    pub card_cvv: String,
}

impl PaymentForm {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_number", &mask(&self.card_number))
            .field("card_exp_month", &self.card_exp_month)
            .field("card_exp_year", &self.card_exp_year)
            .field("card_cvv", &"***")
            .finish()
    }
}

/// Validated card details.
///
/// Only ever handed to a single tokenization call; the card number and CVV
/// never appear in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentInstrument {
    pub card_number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvv: String,
}

impl PaymentInstrument {
    pub fn last_four(&self) -> &str {
        let len = self.card_number.len();
        &self.card_number[len.saturating_sub(4)..]
    }
}

impl fmt::Debug for PaymentInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentInstrument")
            .field("card_number", &mask(&self.card_number))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvv", &"***")
            .finish()
    }
}

impl From<&PaymentInstrument> for PaymentForm {
    fn from(instrument: &PaymentInstrument) -> Self {
        Self {
            card_number: instrument.card_number.clone(),
            card_exp_month: instrument.exp_month.to_string(),
            card_exp_year: instrument.exp_year.to_string(),
            card_cvv: instrument.cvv.clone(),
        }
    }
}

fn mask(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    let visible = digits.len().saturating_sub(4);
    let tail: String = digits[visible..].iter().collect();
    format!("****{tail}")
}
