use crate::config::DEFAULT_TIMEOUT;
use crate::domain::customer::CustomerForm;
use crate::domain::payment::PaymentForm;
use crate::domain::ports::CarrierGatewayRef;
use crate::domain::records::{PaymentMethodRecord, PolicyRecord, QuoteRecord};
use crate::domain::validation::{validate_customer, validate_payment};
use crate::error::{CarrierError, WorkflowError};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, oneshot};
use tracing::{info, warn};

/// Supplies "today" to the field validator.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CollectingInfo,
    Quoted,
    Bound,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::CollectingInfo => "collecting_info",
            Step::Quoted => "quoted",
            Step::Bound => "bound",
        };
        f.write_str(name)
    }
}

/// Where the workflow is, together with exactly the records valid there.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    #[default]
    CollectingInfo,
    Quoted {
        quote: QuoteRecord,
    },
    Bound {
        quote: QuoteRecord,
        payment_method: PaymentMethodRecord,
        policy: PolicyRecord,
    },
}

impl Stage {
    pub fn step(&self) -> Step {
        match self {
            Stage::CollectingInfo => Step::CollectingInfo,
            Stage::Quoted { .. } => Step::Quoted,
            Stage::Bound { .. } => Step::Bound,
        }
    }

    pub fn quote(&self) -> Option<&QuoteRecord> {
        match self {
            Stage::CollectingInfo => None,
            Stage::Quoted { quote } | Stage::Bound { quote, .. } => Some(quote),
        }
    }

    pub fn payment_method(&self) -> Option<&PaymentMethodRecord> {
        match self {
            Stage::Bound { payment_method, .. } => Some(payment_method),
            _ => None,
        }
    }

    pub fn policy(&self) -> Option<&PolicyRecord> {
        match self {
            Stage::Bound { policy, .. } => Some(policy),
            _ => None,
        }
    }
}

/// Everything the presentation layer needs to render the current step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub customer_form: CustomerForm,
    pub payment_form: PaymentForm,
    /// User-facing message from the last failed action, if any.
    pub error: Option<String>,
    pub busy: bool,
    /// Payment methods created on the carrier whose bind then failed.
    pub orphaned_payment_methods: Vec<String>,
}

impl WorkflowSnapshot {
    pub fn step(&self) -> Step {
        self.stage.step()
    }
}

#[derive(Default)]
struct Session {
    stage: Stage,
    customer_form: CustomerForm,
    payment_form: PaymentForm,
    error: Option<String>,
    orphaned_payment_methods: Vec<String>,
}

impl Session {
    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        warn!(step = %self.stage.step(), error = %err, "Workflow step failed");
        self.error = Some(err.display_message());
        err
    }
}

/// Clears the busy flag and the pending cancel handle on every exit path.
struct InFlight<'a> {
    workflow: &'a QuoteWorkflow,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.workflow
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.workflow.busy.store(false, Ordering::Release);
    }
}

/// Drives one user through quote → payment method → bind.
///
/// State changes only through `submit_customer_info`, `submit_payment`, and
/// `reset`. Failures leave the step where it was and record a single
/// user-facing message. At most one action runs at a time; a second one
/// started while the first awaits the carrier fails with
/// [`WorkflowError::Busy`]. Each carrier call is bounded by the call timeout
/// and can be aborted with [`QuoteWorkflow::cancel`].
pub struct QuoteWorkflow {
    gateway: CarrierGatewayRef,
    session: RwLock<Session>,
    busy: AtomicBool,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    call_timeout: Duration,
    clock: Clock,
}

impl QuoteWorkflow {
    pub fn new(gateway: CarrierGatewayRef) -> Self {
        Self {
            gateway,
            session: RwLock::new(Session::default()),
            busy: AtomicBool::new(false),
            cancel: Mutex::new(None),
            call_timeout: DEFAULT_TIMEOUT,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn step(&self) -> Step {
        self.session.read().await.stage.step()
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.session.read().await;
        WorkflowSnapshot {
            stage: session.stage.clone(),
            customer_form: session.customer_form.clone(),
            payment_form: session.payment_form.clone(),
            error: session.error.clone(),
            busy: self.is_busy(),
            orphaned_payment_methods: session.orphaned_payment_methods.clone(),
        }
    }

    /// Aborts the carrier call currently in flight, if any. The aborted
    /// action fails with a transport error and leaves the step unchanged.
    pub fn cancel(&self) -> bool {
        let sender = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                info!("Cancelling in-flight carrier call");
                sender.send(()).is_ok()
            }
            None => false,
        }
    }

    /// Validates customer and vehicle input and requests a quote.
    pub async fn submit_customer_info(&self, form: CustomerForm) -> Result<Step, WorkflowError> {
        let (_in_flight, mut cancel) = self.begin()?;
        let today = (self.clock)();

        let (customer, vehicle) = {
            let mut session = self.session.write().await;
            if session.stage.step() != Step::CollectingInfo {
                return Err(session.fail(WorkflowError::InconsistentState(
                    "A quote has already been issued. Start over to request a new one.".into(),
                )));
            }
            session.customer_form = form;
            session.error = None;
            match validate_customer(&session.customer_form, today) {
                Ok(validated) => validated,
                Err(err) => return Err(session.fail(err)),
            }
        };

        info!(vehicle_year = vehicle.year, has_vin = vehicle.vin.is_some(), "Requesting quote");
        let result = self
            .guarded(
                &mut cancel,
                "create_quote",
                self.gateway.create_quote(&customer, &vehicle),
            )
            .await;

        let mut session = self.session.write().await;
        match result {
            Ok(quote) => {
                info!(quote_id = %quote.quote_id, premium = %quote.premium_amount, "Quote issued");
                session.stage = Stage::Quoted { quote };
                Ok(Step::Quoted)
            }
            Err(err) => Err(session.fail(err.into())),
        }
    }

    /// Validates card input, tokenizes it, and binds the quoted policy.
    ///
    /// The two carrier calls are not atomic. If the bind fails after the
    /// payment method was created, that payment method stays on the carrier
    /// unused and a retry creates a new one.
    pub async fn submit_payment(&self, form: PaymentForm) -> Result<Step, WorkflowError> {
        let (_in_flight, mut cancel) = self.begin()?;
        let today = (self.clock)();

        let (quote_id, instrument) = {
            let mut session = self.session.write().await;
            let quote_id = match session.stage.step() {
                Step::Quoted => session.stage.quote().map(|quote| quote.quote_id.clone()),
                _ => None,
            };
            let Some(quote_id) = quote_id else {
                let message = if session.stage.step() == Step::Bound {
                    "This policy is already bound. Start over to buy another."
                } else {
                    "No quote is available yet. Submit your details first."
                };
                return Err(session.fail(WorkflowError::InconsistentState(message.into())));
            };
            session.payment_form = form;
            session.error = None;
            let validated = validate_payment(&session.payment_form, today);
            match validated {
                Ok(instrument) => (quote_id, instrument),
                Err(err) => return Err(session.fail(err)),
            }
        };

        info!(quote_id = %quote_id, "Creating payment method");
        let payment_method = match self
            .guarded(
                &mut cancel,
                "create_payment_method",
                self.gateway.create_payment_method(&quote_id, &instrument),
            )
            .await
        {
            Ok(payment_method) => payment_method,
            Err(err) => return Err(self.session.write().await.fail(err.into())),
        };

        info!(
            quote_id = %quote_id,
            payment_method_id = %payment_method.payment_method_id,
            "Binding policy"
        );
        let result = self
            .guarded(
                &mut cancel,
                "bind_policy",
                self.gateway
                    .bind_policy(&quote_id, &payment_method.payment_method_id),
            )
            .await;

        let mut session = self.session.write().await;
        match result {
            Ok(policy) => {
                let quote = match session.stage.step() {
                    Step::Quoted => session.stage.quote().cloned(),
                    _ => None,
                };
                let Some(quote) = quote else {
                    return Err(session.fail(WorkflowError::InconsistentState(
                        "The quote changed while the policy was being bound.".into(),
                    )));
                };
                info!(
                    policy_number = %policy.policy_number,
                    effective_date = %policy.effective_date,
                    "Policy bound"
                );
                session.stage = Stage::Bound {
                    quote,
                    payment_method,
                    policy,
                };
                session.payment_form = PaymentForm::default();
                Ok(Step::Bound)
            }
            Err(err) => {
                warn!(
                    quote_id = %quote_id,
                    payment_method_id = %payment_method.payment_method_id,
                    "Bind failed; payment method left orphaned on the carrier"
                );
                session
                    .orphaned_payment_methods
                    .push(payment_method.payment_method_id);
                Err(session.fail(err.into()))
            }
        }
    }

    /// Discards every record and form field and returns to the first step.
    pub async fn reset(&self) -> Result<(), WorkflowError> {
        let (_in_flight, _cancel) = self.begin()?;
        let mut session = self.session.write().await;
        info!(from = %session.stage.step(), "Resetting workflow");
        *session = Session::default();
        Ok(())
    }

    fn begin(&self) -> Result<(InFlight<'_>, oneshot::Receiver<()>), WorkflowError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkflowError::Busy);
        }
        let (sender, receiver) = oneshot::channel();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
        Ok((InFlight { workflow: self }, receiver))
    }

    async fn guarded<T, F>(
        &self,
        cancel: &mut oneshot::Receiver<()>,
        operation: &'static str,
        call: F,
    ) -> Result<T, CarrierError>
    where
        F: Future<Output = Result<T, CarrierError>>,
    {
        tokio::select! {
            result = tokio::time::timeout(self.call_timeout, call) => match result {
                Ok(result) => result,
                Err(_) => {
                    warn!(operation, timeout = ?self.call_timeout, "Carrier call timed out");
                    Err(CarrierError::Transport(format!("{operation} timed out")))
                }
            },
            _ = cancel => Err(CarrierError::Transport(format!("{operation} was cancelled"))),
        }
    }
}
