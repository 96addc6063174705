use super::customer::{CustomerProfile, VehicleInfo};
use super::payment::PaymentInstrument;
use super::records::{PaymentMethodRecord, PolicyRecord, QuoteRecord};
use crate::error::CarrierError;
use async_trait::async_trait;
use std::sync::Arc;

/// The three remote operations of the carrier, plus its liveness check.
///
/// Implementations shape requests and responses only: no retries, caching,
/// or deduplication. Every call is issued exactly once.
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    async fn create_quote(
        &self,
        customer: &CustomerProfile,
        vehicle: &VehicleInfo,
    ) -> Result<QuoteRecord, CarrierError>;

    async fn create_payment_method(
        &self,
        quote_id: &str,
        instrument: &PaymentInstrument,
    ) -> Result<PaymentMethodRecord, CarrierError>;

    async fn bind_policy(
        &self,
        quote_id: &str,
        payment_method_id: &str,
    ) -> Result<PolicyRecord, CarrierError>;

    async fn health(&self) -> Result<(), CarrierError>;
}

pub type CarrierGatewayRef = Arc<dyn CarrierGateway>;
