use serde::{Deserialize, Serialize};

/// Raw customer and vehicle input exactly as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
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
    pub vehicle_vin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A validated person requesting insurance.
///
/// Serializes to the flat customer part of the carrier's quote payload, with
/// the address as a nested object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
}

/// A validated vehicle. `vin` is left out of the payload when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
}

impl From<(&CustomerProfile, &VehicleInfo)> for CustomerForm {
    fn from((customer, vehicle): (&CustomerProfile, &VehicleInfo)) -> Self {
        Self {
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            street: customer.address.street.clone(),
            city: customer.address.city.clone(),
            state: customer.address.state.clone(),
            zip_code: customer.address.zip_code.clone(),
            vehicle_year: vehicle.year.to_string(),
            vehicle_make: vehicle.make.clone(),
            vehicle_model: vehicle.model.clone(),
            vehicle_vin: vehicle.vin.clone().unwrap_or_default(),
        }
    }
}
