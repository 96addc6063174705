use crate::domain::customer::{CustomerProfile, VehicleInfo};
use crate::domain::payment::PaymentInstrument;
use crate::domain::ports::CarrierGateway;
use crate::domain::records::{PaymentMethodRecord, PolicyRecord, QuoteRecord};
use crate::error::CarrierError;
use async_trait::async_trait;
use chrono::{Local, Months};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Card number the sandbox always declines.
pub const DECLINED_CARD_NUMBER: &str = "4000000000000002";

pub const DEFAULT_SANDBOX_PREMIUM: Decimal = dec!(125.00);

/// Oldest calls are dropped from the log past this many entries.
pub const DEFAULT_CALL_LOG_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierOperation {
    CreateQuote,
    CreatePaymentMethod,
    BindPolicy,
    Health,
}

/// One call received by the sandbox, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierCall {
    CreateQuote {
        customer: CustomerProfile,
        vehicle: VehicleInfo,
    },
    CreatePaymentMethod {
        quote_id: String,
        last_four: String,
    },
    BindPolicy {
        quote_id: String,
        payment_method_id: String,
    },
    Health,
}

impl CarrierCall {
    pub fn operation(&self) -> CarrierOperation {
        match self {
            CarrierCall::CreateQuote { .. } => CarrierOperation::CreateQuote,
            CarrierCall::CreatePaymentMethod { .. } => CarrierOperation::CreatePaymentMethod,
            CarrierCall::BindPolicy { .. } => CarrierOperation::BindPolicy,
            CarrierCall::Health => CarrierOperation::Health,
        }
    }
}

#[derive(Default)]
struct SandboxState {
    calls: VecDeque<CarrierCall>,
    failures: HashMap<CarrierOperation, VecDeque<CarrierError>>,
    quotes: HashMap<String, QuoteRecord>,
    payment_methods: HashMap<String, PaymentMethodRecord>,
    next_id: u32,
}

impl SandboxState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn take_failure(&mut self, operation: CarrierOperation) -> Result<(), CarrierError> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// An in-process carrier with deterministic ids.
///
/// Keeps the most recent calls for inspection, can be scripted to fail the
/// next call of a given operation, and can delay each response. Backed by
/// `Arc<RwLock<..>>` so clones share the same sandbox.
///
/// A bind consumes its quote and payment method. Quotes that never bind and
/// orphaned payment methods stay until the sandbox is dropped, so memory
/// grows with the number of unbound applications in a run.
#[derive(Clone)]
pub struct InMemoryCarrier {
    state: Arc<RwLock<SandboxState>>,
    premium: Decimal,
    latency: Option<Duration>,
    call_log_limit: usize,
}

impl Default for InMemoryCarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCarrier {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SandboxState::default())),
            premium: DEFAULT_SANDBOX_PREMIUM,
            latency: None,
            call_log_limit: DEFAULT_CALL_LOG_LIMIT,
        }
    }

    pub fn with_call_log_limit(mut self, limit: usize) -> Self {
        self.call_log_limit = limit;
        self
    }

    pub fn with_premium(mut self, premium: Decimal) -> Self {
        self.premium = premium;
        self
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call of `operation` fail with `error`. Queued failures
    /// are consumed in order.
    pub async fn fail_next(&self, operation: CarrierOperation, error: CarrierError) {
        let mut state = self.state.write().await;
        state.failures.entry(operation).or_default().push_back(error);
    }

    pub async fn calls(&self) -> Vec<CarrierCall> {
        self.state.read().await.calls.iter().cloned().collect()
    }

    pub async fn call_count(&self, operation: CarrierOperation) -> usize {
        let state = self.state.read().await;
        state
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    async fn record(&self, call: CarrierCall) {
        {
            let mut state = self.state.write().await;
            state.calls.push_back(call);
            while state.calls.len() > self.call_log_limit {
                state.calls.pop_front();
            }
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl CarrierGateway for InMemoryCarrier {
    async fn create_quote(
        &self,
        customer: &CustomerProfile,
        vehicle: &VehicleInfo,
    ) -> Result<QuoteRecord, CarrierError> {
        self.record(CarrierCall::CreateQuote {
            customer: customer.clone(),
            vehicle: vehicle.clone(),
        })
        .await;

        let mut state = self.state.write().await;
        state.take_failure(CarrierOperation::CreateQuote)?;

        let id = state.next_id();
        let quote = QuoteRecord {
            quote_id: format!("quote-{id:04}"),
            premium_amount: self.premium,
            coverage_details: serde_json::json!({
                "liability": "100/300/100",
                "collision_deductible": 500,
                "vehicle": format!("{} {} {}", vehicle.year, vehicle.make, vehicle.model),
            }),
            valid_until: None,
        };
        state.quotes.insert(quote.quote_id.clone(), quote.clone());
        Ok(quote)
    }

    async fn create_payment_method(
        &self,
        quote_id: &str,
        instrument: &PaymentInstrument,
    ) -> Result<PaymentMethodRecord, CarrierError> {
        self.record(CarrierCall::CreatePaymentMethod {
            quote_id: quote_id.to_string(),
            last_four: instrument.last_four().to_string(),
        })
        .await;

        let mut state = self.state.write().await;
        state.take_failure(CarrierOperation::CreatePaymentMethod)?;

        if !state.quotes.contains_key(quote_id) {
            return Err(CarrierError::Message(format!("Unknown quote: {quote_id}")));
        }
        if instrument.card_number == DECLINED_CARD_NUMBER {
            return Err(CarrierError::FieldErrors(vec!["card declined".to_string()]));
        }

        let id = state.next_id();
        let record = PaymentMethodRecord {
            payment_method_id: format!("pm-{id:04}"),
            quote_id: quote_id.to_string(),
            instrument_type: Some("card".to_string()),
            last_four: Some(instrument.last_four().to_string()),
        };
        state
            .payment_methods
            .insert(record.payment_method_id.clone(), record.clone());
        Ok(record)
    }

    async fn bind_policy(
        &self,
        quote_id: &str,
        payment_method_id: &str,
    ) -> Result<PolicyRecord, CarrierError> {
        self.record(CarrierCall::BindPolicy {
            quote_id: quote_id.to_string(),
            payment_method_id: payment_method_id.to_string(),
        })
        .await;

        let mut state = self.state.write().await;
        state.take_failure(CarrierOperation::BindPolicy)?;

        let premium_amount = state
            .quotes
            .get(quote_id)
            .map(|quote| quote.premium_amount)
            .ok_or_else(|| CarrierError::Message(format!("Unknown quote: {quote_id}")))?;
        match state.payment_methods.get(payment_method_id) {
            Some(method) if method.quote_id == quote_id => {}
            _ => {
                return Err(CarrierError::Message(format!(
                    "Unknown payment method for quote {quote_id}: {payment_method_id}"
                )));
            }
        }
        state.quotes.remove(quote_id);
        state.payment_methods.remove(payment_method_id);

        let id = state.next_id();
        let effective_date = Local::now().date_naive();
        Ok(PolicyRecord {
            policy_number: format!("POL-{id:04}"),
            policy_id: format!("pol-{id:04}"),
            effective_date,
            premium_amount,
            expiration_date: effective_date.checked_add_months(Months::new(12)),
            status: Some("active".to_string()),
        })
    }

    async fn health(&self) -> Result<(), CarrierError> {
        self.record(CarrierCall::Health).await;
        self.state
            .write()
            .await
            .take_failure(CarrierOperation::Health)
    }
}
