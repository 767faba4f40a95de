/*
    Metrics - operational counters and gauges for the allocation core

    Provides counters and gauges for:
    - Slot lifecycle (requests, approvals, denials, expiries)
    - Event lifecycle (created, joins, cancelled, activated)
    - Verification outcomes (resolved, expired, failed)

    Metrics are recorded through the `metrics` facade; wiring an exporter
    is left to the embedding process.
*/

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    describe_counter!(
        "lobbyward_slot_requests_total",
        "Total number of slot rental requests accepted into the Requested state"
    );

    describe_counter!(
        "lobbyward_slot_approvals_total",
        "Total number of slot requests approved into occupancy"
    );

    describe_counter!(
        "lobbyward_slot_denials_total",
        "Total number of slot requests denied back to Available"
    );

    describe_counter!(
        "lobbyward_slot_expiries_total",
        "Total number of occupied slots cleared by wall-clock expiry"
    );

    describe_counter!(
        "lobbyward_events_created_total",
        "Total number of lobby events registered"
    );

    describe_counter!(
        "lobbyward_event_joins_total",
        "Total number of accepted event roster joins"
    );

    describe_counter!(
        "lobbyward_events_cancelled_total",
        "Total number of events cancelled before their start"
    );

    describe_counter!(
        "lobbyward_events_activated_total",
        "Total number of events activated, labeled by trigger (timer, manual) "
    );

    describe_counter!(
        "lobbyward_verifications_total",
        "Total number of verification windows closed, labeled by outcome (resolved, expired, failed)"
    );

    describe_counter!(
        "lobbyward_bookings_total",
        "Total number of reservation requests fanned out to reviewers"
    );

    describe_gauge!(
        "lobbyward_active_pools",
        "Current number of live rent slot pools"
    );

    describe_gauge!(
        "lobbyward_pending_verifications",
        "Current number of members inside their verification window"
    );
}

/// Record a slot request accepted
pub fn slot_requested() {
    counter!("lobbyward_slot_requests_total").increment(1);
}

/// Record a slot approval
pub fn slot_approved() {
    counter!("lobbyward_slot_approvals_total").increment(1);
}

/// Record a slot denial
pub fn slot_denied() {
    counter!("lobbyward_slot_denials_total").increment(1);
}

/// Record slots cleared by expiry
pub fn slots_expired(count: usize) {
    counter!("lobbyward_slot_expiries_total").increment(count as u64);
}

/// Record an event created
pub fn event_created() {
    counter!("lobbyward_events_created_total").increment(1);
}

/// Record an accepted event join
pub fn event_joined() {
    counter!("lobbyward_event_joins_total").increment(1);
}

/// Record an event cancelled
pub fn event_cancelled() {
    counter!("lobbyward_events_cancelled_total").increment(1);
}

/// Record an event activated by its timer
pub fn event_activated_by_timer() {
    counter!("lobbyward_events_activated_total", "trigger" => "timer").increment(1);
}

/// Record an event activated manually ahead of schedule
pub fn event_activated_manually() {
    counter!("lobbyward_events_activated_total", "trigger" => "manual").increment(1);
}

/// Record a verification resolved successfully
pub fn verification_resolved() {
    counter!("lobbyward_verifications_total", "outcome" => "resolved").increment(1);
}

/// Record a verification window expiring with no submission
pub fn verification_expired() {
    counter!("lobbyward_verifications_total", "outcome" => "expired").increment(1);
}

/// Record a verification whose resolution failed
pub fn verification_failed() {
    counter!("lobbyward_verifications_total", "outcome" => "failed").increment(1);
}

/// Record a reservation request fanned out
pub fn booking_submitted() {
    counter!("lobbyward_bookings_total").increment(1);
}

/// Update the live pool gauge
pub fn set_active_pools(count: usize) {
    gauge!("lobbyward_active_pools").set(count as f64);
}

/// Update the pending verification gauge
pub fn set_pending_verifications(count: usize) {
    gauge!("lobbyward_pending_verifications").set(count as f64);
}
