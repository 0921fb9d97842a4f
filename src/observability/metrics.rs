//! Lifecycle metrics.
//!
//! # Metrics
//! - `txflow_transactions_signed_total` (counter): by envelope `kind`
//! - `txflow_broadcasts_total` (counter): by `outcome` (accepted, rejected)
//! - `txflow_policy_rejections_total` (counter): by `reason` (gas_limit, max_fee)
//! - `txflow_confirmations_total` (counter): by final poll `state`
//! - `txflow_confirmation_duration_seconds` (histogram): time spent waiting

use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_signed(kind: &'static str) {
    counter!("txflow_transactions_signed_total", "kind" => kind).increment(1);
}

pub fn record_broadcast(outcome: &'static str) {
    counter!("txflow_broadcasts_total", "outcome" => outcome).increment(1);
}

pub fn record_policy_rejection(reason: &'static str) {
    counter!("txflow_policy_rejections_total", "reason" => reason).increment(1);
}

pub fn record_confirmation(state: &'static str, elapsed: Duration) {
    counter!("txflow_confirmations_total", "state" => state).increment(1);
    histogram!("txflow_confirmation_duration_seconds", "state" => state).record(elapsed.as_secs_f64());
}
