use crate::config::CarrierConfig;
use crate::domain::customer::{CustomerProfile, VehicleInfo};
use crate::domain::payment::PaymentInstrument;
use crate::domain::ports::CarrierGateway;
use crate::domain::records::{PaymentMethodRecord, PolicyRecord, QuoteRecord};
use crate::error::{self, CarrierError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PACKAGE_ID_HEADER: &str = "x-quote-package-id";
const CARD_INSTRUMENT_TYPE: &str = "card";

#[derive(Serialize)]
struct QuoteRequest<'a> {
    #[serde(flatten)]
    customer: &'a CustomerProfile,
    vehicle: &'a VehicleInfo,
}

#[derive(Serialize)]
struct PaymentMethodRequest<'a> {
    quote_id: &'a str,
    #[serde(rename = "type")]
    instrument_type: &'static str,
    card_number: &'a str,
    card_exp_month: u32,
    card_exp_year: i32,
    card_cvv: &'a str,
}

#[derive(Deserialize)]
struct PaymentMethodResponse {
    payment_method_id: String,
    #[serde(rename = "type", default)]
    instrument_type: Option<String>,
    #[serde(default)]
    last_four: Option<String>,
}

#[derive(Serialize)]
struct BindRequest<'a> {
    quote_id: &'a str,
    payment_method_id: &'a str,
}

/// `CarrierGateway` speaking JSON over HTTP to the carrier's quote/bind surface.
///
/// Every request carries the configured timeout. Responses with a status of
/// 500 or above, unreadable bodies, and network failures all map to
/// `CarrierError::Transport`; 4xx bodies are classified by [`classify_error_body`].
#[derive(Clone)]
pub struct HttpCarrierGateway {
    client: Client,
    config: CarrierConfig,
}

impl HttpCarrierGateway {
    pub fn new(config: CarrierConfig) -> error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self.client.request(method, url).timeout(self.config.timeout);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }
        if let Some(package_id) = &self.config.package_id {
            builder = builder.header(PACKAGE_ID_HEADER, package_id);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response, CarrierError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(operation, timeout_secs = self.config.timeout.as_secs(), "Carrier request timed out");
                CarrierError::Transport(format!(
                    "{operation} timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else {
                warn!(operation, error = %e, "Carrier request failed");
                CarrierError::Transport(format!("{operation} request failed: {e}"))
            }
        })?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "Carrier responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            return Err(CarrierError::Transport(format!(
                "{operation} failed with status {status}"
            )));
        }
        Err(classify_error_body(&body).unwrap_or_else(|| {
            CarrierError::Transport(format!("{operation} failed with status {status}"))
        }))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, operation: &str) -> Result<T, CarrierError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(builder, operation).await?;
        response.json::<T>().await.map_err(|e| {
            CarrierError::Transport(format!("{operation} returned an unreadable response: {e}"))
        })
    }
}

#[async_trait]
impl CarrierGateway for HttpCarrierGateway {
    async fn create_quote(
        &self,
        customer: &CustomerProfile,
        vehicle: &VehicleInfo,
    ) -> Result<QuoteRecord, CarrierError> {
        let body = QuoteRequest { customer, vehicle };
        self.post_json("/quote", &body, "create_quote").await
    }

    async fn create_payment_method(
        &self,
        quote_id: &str,
        instrument: &PaymentInstrument,
    ) -> Result<PaymentMethodRecord, CarrierError> {
        let body = PaymentMethodRequest {
            quote_id,
            instrument_type: CARD_INSTRUMENT_TYPE,
            card_number: &instrument.card_number,
            card_exp_month: instrument.exp_month,
            card_exp_year: instrument.exp_year,
            card_cvv: &instrument.cvv,
        };
        let response: PaymentMethodResponse = self
            .post_json("/payment-method", &body, "create_payment_method")
            .await?;
        Ok(PaymentMethodRecord {
            payment_method_id: response.payment_method_id,
            quote_id: quote_id.to_string(),
            instrument_type: response.instrument_type,
            last_four: response.last_four,
        })
    }

    async fn bind_policy(
        &self,
        quote_id: &str,
        payment_method_id: &str,
    ) -> Result<PolicyRecord, CarrierError> {
        let body = BindRequest {
            quote_id,
            payment_method_id,
        };
        self.post_json("/bind", &body, "bind_policy").await
    }

    async fn health(&self) -> Result<(), CarrierError> {
        let builder = self.request(Method::GET, "/health");
        self.send(builder, "health").await.map(|_| ())
    }
}

/// Classifies a 4xx error body.
///
/// A list of `{"msg": ...}` items (either at the top level or under `detail`)
/// becomes `FieldErrors`; a string under `detail` or `message` becomes
/// `Message`. Anything else yields `None`.
pub fn classify_error_body(body: &str) -> Option<CarrierError> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(items) = value.as_array() {
        return field_errors(items);
    }
    match value.get("detail") {
        Some(serde_json::Value::Array(items)) => return field_errors(items),
        Some(serde_json::Value::String(msg)) => return Some(CarrierError::Message(msg.clone())),
        _ => {}
    }
    value
        .get("message")
        .and_then(|msg| msg.as_str())
        .map(|msg| CarrierError::Message(msg.to_string()))
}

fn field_errors(items: &[serde_json::Value]) -> Option<CarrierError> {
    let messages: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(msg) => Some(msg.clone()),
            other => other.get("msg").and_then(|m| m.as_str()).map(str::to_string),
        })
        .collect();
    (!messages.is_empty()).then_some(CarrierError::FieldErrors(messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_list_becomes_field_errors() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"email invalid"},{"msg":"vin invalid"}]}"#;
        assert_eq!(
            classify_error_body(body),
            Some(CarrierError::FieldErrors(vec![
                "email invalid".into(),
                "vin invalid".into()
            ]))
        );
    }

    #[test]
    fn test_top_level_list_becomes_field_errors() {
        let body = r#"[{"msg":"email invalid"}]"#;
        assert_eq!(
            classify_error_body(body),
            Some(CarrierError::FieldErrors(vec!["email invalid".into()]))
        );
    }

    #[test]
    fn test_string_bodies_become_messages() {
        assert_eq!(
            classify_error_body(r#"{"detail":"Quote expired"}"#),
            Some(CarrierError::Message("Quote expired".into()))
        );
        assert_eq!(
            classify_error_body(r#"{"error":true,"message":"Card declined","status_code":402}"#),
            Some(CarrierError::Message("Card declined".into()))
        );
    }

    #[test]
    fn test_unrecognized_bodies() {
        assert_eq!(classify_error_body("<html>bad gateway</html>"), None);
        assert_eq!(classify_error_body(r#"{"detail":[]}"#), None);
        assert_eq!(classify_error_body(r#"{"status":"nope"}"#), None);
    }

    #[test]
    fn test_quote_request_shape() {
        let customer = CustomerProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "5551234567".into(),
            address: crate::domain::customer::Address {
                street: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "62701".into(),
            },
        };
        let vehicle = VehicleInfo {
            year: 2020,
            make: "Toyota".into(),
            model: "Corolla".into(),
            vin: None,
        };
        let json = serde_json::to_value(QuoteRequest {
            customer: &customer,
            vehicle: &vehicle,
        })
        .unwrap();
        assert_eq!(json["first_name"], "Ada");
        assert_eq!(json["address"]["street"], "1 Main St");
        assert_eq!(json["vehicle"]["year"], 2020);
        assert!(json["vehicle"].get("vin").is_none());
    }
}
