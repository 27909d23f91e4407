#![doc(test(attr(deny(warnings))))]

//! Milk Core keeps a one-entry-per-day milk ledger (borrowed vs. sold
//! litres), derives monthly balances from a per-litre price, and drives a
//! daily record-your-entry reminder that survives restarts.

pub mod cli;
pub mod errors;
pub mod ledger;
pub mod reminder;
pub mod service;
pub mod settings;
pub mod storage;
pub mod transfer;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Milk Core tracing initialized.");
    });
}
