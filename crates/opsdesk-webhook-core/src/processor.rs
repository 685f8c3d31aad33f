//! Event routing and domain mutators
//!
//! `WebhookProcessor` dispatches a verified event to the mutator matching
//! its declared type and applies the business mutation. Live ingestion and
//! DLQ replay both go through this type; there is deliberately no second
//! copy of any handler.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use opsdesk_db::{
    ClientRepository, EstimateRepository, InvoiceRepository, NewExternalInvoice, NewPayment,
    PaymentRepository,
};
use opsdesk_types::{InvoiceStatus, PaymentStatus};

use crate::error::ProcessError;
use crate::event::{
    ninja_invoice_status, Charge, NinjaEvent, NinjaEventType, PaymentIntent, StripeEvent,
    StripeEventData, StripeEventType,
};
use crate::trigger::WorkflowTrigger;

/// Routes verified events to domain mutators.
///
/// Mutators defensively re-fetch current state rather than assuming event
/// arrival order; no sequencing is enforced across events for the same
/// entity.
pub struct WebhookProcessor {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    estimates: Arc<dyn EstimateRepository>,
    clients: Arc<dyn ClientRepository>,
    trigger: WorkflowTrigger,
}

impl WebhookProcessor {
    /// Create a processor over the given repositories
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        estimates: Arc<dyn EstimateRepository>,
        clients: Arc<dyn ClientRepository>,
        trigger: WorkflowTrigger,
    ) -> Self {
        Self {
            payments,
            invoices,
            estimates,
            clients,
            trigger,
        }
    }

    /// Process a verified Stripe event
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn process_stripe(&self, event: &StripeEvent) -> Result<(), ProcessError> {
        match (&event.event_type, &event.data) {
            (StripeEventType::PaymentIntentSucceeded, StripeEventData::PaymentIntent(pi)) => {
                self.payment_intent_succeeded(pi).await
            }
            (StripeEventType::PaymentIntentFailed, StripeEventData::PaymentIntent(pi)) => {
                self.payment_intent_failed(pi).await
            }
            (StripeEventType::ChargeSucceeded, StripeEventData::Charge(charge)) => {
                self.charge_succeeded(charge)
            }
            (StripeEventType::ChargeRefunded, StripeEventData::Charge(charge)) => {
                self.charge_refunded(charge).await
            }
            (StripeEventType::Unknown(event_type), _) => {
                // Expected as Stripe adds event types; never a failure.
                info!(event_type, "Unhandled Stripe event type");
                Ok(())
            }
            _ => Err(ProcessError::MalformedPayload(
                "event data does not match event type".to_string(),
            )),
        }
    }

    /// Process a verified Invoice Ninja event
    #[instrument(skip(self, event), fields(event_type = %event.event))]
    pub async fn process_ninja(&self, event: &NinjaEvent) -> Result<(), ProcessError> {
        match event.event_type() {
            NinjaEventType::QuoteApproved => self.quote_approved(event).await,
            NinjaEventType::InvoiceCreated => self.invoice_created(event).await,
            NinjaEventType::InvoiceUpdated => self.invoice_updated(event).await,
            NinjaEventType::PaymentCreated => self.payment_created(event).await,
            NinjaEventType::Unknown(event_type) => {
                info!(event_type, "Unhandled Invoice Ninja event type");
                Ok(())
            }
        }
    }

    /// Insert the payment and recompute the invoice's paid/partial status.
    ///
    /// The balance is re-read from the derived summary view after the
    /// insert, so replays see the balance at replay time rather than a
    /// value cached with the event.
    async fn payment_intent_succeeded(&self, pi: &PaymentIntent) -> Result<(), ProcessError> {
        let invoice_id = required_invoice_id(pi)?;

        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| ProcessError::RelatedRecordNotFound(format!("invoice {invoice_id}")))?;

        // Stripe amounts are minor units (cents); store major units.
        let amount = Decimal::new(pi.amount, 2);

        let inserted = self
            .payments
            .insert_if_absent(NewPayment {
                invoice_id: invoice.invoice_id,
                external_id: pi.id.clone(),
                amount,
                currency: pi.currency.to_uppercase(),
                method: pi.method().to_string(),
                paid_at: Some(timestamp_or_now(pi.created)),
                status: PaymentStatus::Applied,
            })
            .await?;

        let payment = match inserted {
            Some(payment) => {
                info!(
                    payment_id = %payment.payment_id,
                    invoice_id = %invoice.invoice_id,
                    %amount,
                    "Payment recorded"
                );
                payment
            }
            None => {
                // Duplicate delivery; the unique external_id already
                // absorbed it. The status recompute below still runs: a
                // prior attempt may have died between the insert and the
                // invoice update, and the recompute is idempotent.
                info!(external_id = %pi.id, "Payment already recorded (idempotent)");
                match self.payments.find_by_external_id(&pi.id).await? {
                    Some(payment) => payment,
                    None => {
                        warn!(external_id = %pi.id, "Recorded payment not found on re-read");
                        return Ok(());
                    }
                }
            }
        };

        match self.invoices.balance_due(invoice.invoice_id).await? {
            Some(balance) if balance <= Decimal::ZERO => {
                self.invoices
                    .update_status(invoice.invoice_id, InvoiceStatus::Paid)
                    .await?;
                info!(invoice_id = %invoice.invoice_id, "Invoice marked as paid");
                // Notify on the transition only; replaying against an
                // already-paid invoice stays quiet.
                if invoice.status != InvoiceStatus::Paid.as_str() {
                    self.trigger.fire(
                        "invoice_paid",
                        serde_json::json!({
                            "invoice_id": invoice.invoice_id,
                            "payment_id": payment.payment_id,
                            "amount": payment.amount,
                        }),
                    );
                }
            }
            Some(balance) => {
                self.invoices
                    .update_status(invoice.invoice_id, InvoiceStatus::Partial)
                    .await?;
                info!(
                    invoice_id = %invoice.invoice_id,
                    balance_due = %balance,
                    "Invoice marked as partially paid"
                );
            }
            None => {
                warn!(invoice_id = %invoice.invoice_id, "No balance summary for invoice");
            }
        }

        Ok(())
    }

    /// Record a failed payment attempt for audit (`paid_at` stays null)
    async fn payment_intent_failed(&self, pi: &PaymentIntent) -> Result<(), ProcessError> {
        let invoice_id = required_invoice_id(pi)?;

        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| ProcessError::RelatedRecordNotFound(format!("invoice {invoice_id}")))?;

        let inserted = self
            .payments
            .insert_if_absent(NewPayment {
                invoice_id: invoice.invoice_id,
                external_id: pi.id.clone(),
                amount: Decimal::new(pi.amount, 2),
                currency: pi.currency.to_uppercase(),
                method: pi.method().to_string(),
                paid_at: None,
                status: PaymentStatus::Failed,
            })
            .await?;

        if inserted.is_some() {
            warn!(
                invoice_id = %invoice.invoice_id,
                reason = pi
                    .last_payment_error
                    .as_ref()
                    .and_then(|e| e.message.as_deref())
                    .unwrap_or("unknown"),
                "Failed payment recorded"
            );
        } else {
            info!(external_id = %pi.id, "Failed payment already recorded (idempotent)");
        }

        Ok(())
    }

    /// Charges tied to a payment intent are handled by the intent events;
    /// standalone charges are only logged.
    fn charge_succeeded(&self, charge: &Charge) -> Result<(), ProcessError> {
        if let Some(payment_intent) = &charge.payment_intent {
            debug!(
                charge_id = %charge.id,
                payment_intent_id = %payment_intent,
                "Charge is part of a payment intent, skipping"
            );
            return Ok(());
        }
        info!(charge_id = %charge.id, "Standalone charge succeeded");
        Ok(())
    }

    /// Mark the original payment refunded and move the invoice back to sent.
    ///
    /// A refund for a payment we never recorded is a logged no-op: the
    /// source may emit refunds for transactions outside this system.
    async fn charge_refunded(&self, charge: &Charge) -> Result<(), ProcessError> {
        let Some(payment_intent_id) = charge.payment_intent.as_deref() else {
            warn!(charge_id = %charge.id, "Refunded charge has no payment intent");
            return Ok(());
        };

        let Some(payment) = self.payments.find_by_external_id(payment_intent_id).await? else {
            warn!(
                charge_id = %charge.id,
                payment_intent_id,
                "Original payment not found for refund"
            );
            return Ok(());
        };

        self.payments
            .update_status(payment.payment_id, PaymentStatus::Refunded)
            .await?;
        info!(payment_id = %payment.payment_id, "Payment marked as refunded");

        self.invoices
            .update_status(payment.invoice_id, InvoiceStatus::Sent)
            .await?;

        Ok(())
    }

    /// Sync a quote approval onto the local estimate.
    ///
    /// Invoice creation from the approval is delegated to the workflow
    /// automation, not done here.
    async fn quote_approved(&self, event: &NinjaEvent) -> Result<(), ProcessError> {
        let quote = event
            .quote
            .as_ref()
            .ok_or(ProcessError::MissingRequiredField("quote"))?;

        let Some(estimate) = self.estimates.find_by_external_id(&quote.id).await? else {
            // The quote may exist only upstream; nothing to reconcile yet.
            info!(quote_id = %quote.id, "No local estimate for approved quote");
            return Ok(());
        };

        self.estimates.mark_approved(estimate.estimate_id).await?;
        info!(
            estimate_id = %estimate.estimate_id,
            quote_id = %quote.id,
            "Estimate marked as approved"
        );

        self.trigger.fire(
            "quote_approved",
            serde_json::json!({
                "estimate_id": estimate.estimate_id,
                "quote_id": quote.id,
                "quote_number": quote.number,
            }),
        );

        Ok(())
    }

    /// Mirror an externally created invoice
    async fn invoice_created(&self, event: &NinjaEvent) -> Result<(), ProcessError> {
        let invoice = event
            .invoice
            .as_ref()
            .ok_or(ProcessError::MissingRequiredField("invoice"))?;

        // Resolve job/client through the originating quote when present.
        let mut job_id = None;
        let mut client_id = None;
        if let Some(quote_id) = &invoice.quote_id {
            if let Some(estimate) = self.estimates.find_by_external_id(quote_id).await? {
                job_id = estimate.job_id;
                client_id = estimate.client_id;
            }
        }

        // Fall back to matching the client by email.
        if client_id.is_none() {
            if let Some(email) = event.client.as_ref().and_then(|c| c.email.as_deref()) {
                client_id = self
                    .clients
                    .find_by_email(email)
                    .await?
                    .map(|c| c.client_id);
            }
        }

        let Some(client_id) = client_id else {
            // Upstream invoice for a client we do not mirror; by design.
            warn!(invoice_id = %invoice.id, "Cannot sync invoice without a local client");
            return Ok(());
        };

        let synced = self
            .invoices
            .sync_external(NewExternalInvoice {
                client_id,
                job_id,
                external_id: invoice.id.clone(),
                invoice_number: invoice.number.clone(),
                total_amount: invoice.amount,
                balance_due: invoice.balance,
                status: ninja_invoice_status(&invoice.status_id),
                issue_date: invoice.date,
                due_date: invoice.due_date,
                notes: invoice.public_notes.clone(),
            })
            .await?;

        match synced {
            Some(row) => info!(
                invoice_id = %row.invoice_id,
                external_id = %invoice.id,
                "Invoice synced from Invoice Ninja"
            ),
            None => info!(external_id = %invoice.id, "Invoice already synced (idempotent)"),
        }

        Ok(())
    }

    /// Apply an external status/balance change to the mirrored invoice
    async fn invoice_updated(&self, event: &NinjaEvent) -> Result<(), ProcessError> {
        let invoice = event
            .invoice
            .as_ref()
            .ok_or(ProcessError::MissingRequiredField("invoice"))?;

        let Some(existing) = self.invoices.find_by_external_id(&invoice.id).await? else {
            // An update can arrive before the create; nothing to reconcile yet.
            warn!(external_id = %invoice.id, "Invoice not mirrored locally, skipping update");
            return Ok(());
        };

        let new_status = ninja_invoice_status(&invoice.status_id);
        let paid_at = (new_status == InvoiceStatus::Paid
            && existing.status != InvoiceStatus::Paid.as_str())
        .then(Utc::now);

        self.invoices
            .update_from_external(existing.invoice_id, new_status, invoice.balance, paid_at)
            .await?;

        info!(
            invoice_id = %existing.invoice_id,
            old_status = %existing.status,
            new_status = %new_status,
            "Invoice updated from Invoice Ninja"
        );

        Ok(())
    }

    /// Mirror a payment recorded upstream (amounts already in major units)
    async fn payment_created(&self, event: &NinjaEvent) -> Result<(), ProcessError> {
        let payment = event
            .payment
            .as_ref()
            .ok_or(ProcessError::MissingRequiredField("payment"))?;

        let Some(invoice) = self
            .invoices
            .find_by_external_id(&payment.invoice_id)
            .await?
        else {
            warn!(
                payment_id = %payment.id,
                invoice_external_id = %payment.invoice_id,
                "Invoice not found for payment"
            );
            return Ok(());
        };

        let inserted = self
            .payments
            .insert_if_absent(NewPayment {
                invoice_id: invoice.invoice_id,
                external_id: payment.id.clone(),
                amount: payment.amount,
                currency: "USD".to_string(),
                method: "card".to_string(),
                paid_at: payment.date.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
                status: PaymentStatus::Applied,
            })
            .await?;

        match inserted {
            Some(row) => info!(
                payment_id = %row.payment_id,
                invoice_id = %invoice.invoice_id,
                amount = %payment.amount,
                "Payment synced from Invoice Ninja"
            ),
            None => info!(external_id = %payment.id, "Payment already synced (idempotent)"),
        }

        // Invoice status follow-up arrives via invoice.updated.
        Ok(())
    }
}

/// Extract and parse the local invoice UUID from payment intent metadata
fn required_invoice_id(pi: &PaymentIntent) -> Result<Uuid, ProcessError> {
    let raw = pi
        .metadata
        .invoice_id
        .as_deref()
        .ok_or(ProcessError::MissingRequiredField("metadata.invoice_id"))?;
    Uuid::parse_str(raw)
        .map_err(|_| ProcessError::MalformedPayload(format!("invoice_id is not a UUID: {raw}")))
}

fn timestamp_or_now(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}
