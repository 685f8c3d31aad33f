//! Typed inbound event models
//!
//! Two independent discriminator spaces: Stripe's `type` and Invoice
//! Ninja's `event`. Unknown discriminators parse into an explicit
//! `Unknown` variant so new vendor event types never fail a request.

mod ninja;
mod stripe;

pub use ninja::{
    ninja_invoice_status, NinjaClient, NinjaEvent, NinjaEventType, NinjaInvoice, NinjaPayment,
    NinjaQuote,
};
pub use stripe::{
    Charge, PaymentIntent, PaymentIntentError, StripeEvent, StripeEventData, StripeEventType,
};
