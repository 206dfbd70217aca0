// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PLDM responder configuration - single source of truth.
//!
//! Centralizes the compile-time defaults for every tunable the poller and
//! the responder consume. **Never hardcode these elsewhere!**
//!
//! Two levels:
//!
//! - **Static**: the constants below (spec-derived defaults)
//! - **Dynamic**: [`Tunables::from_env`] reads `PLDM_*` environment
//!   overrides at startup for platform integration

use std::time::Duration;

// =======================================================================
// Event poller timers (milliseconds)
// =======================================================================

/// Period of the normal RAS event poll timer.
///
/// Every period the poller probes the terminus with event id `0x0000`
/// ("give me whatever is next") unless a transfer is already in flight.
pub const NORMAL_RAS_EVENT_TIMER_MS: u64 = 20_000;

/// Period of the critical RAS event poll timer.
///
/// Services the critical queue head. Shorter than the normal period so
/// queued critical events preempt between transfers.
pub const CRITICAL_RAS_EVENT_TIMER_MS: u64 = 5_000;

/// Delay before the next pollForPlatformEventMessage request of a transfer.
///
/// Restarted after every response to pace the request/ack cycle.
pub const POLL_REQ_EVENT_TIMER_MS: u64 = 200;

/// Number of request retries the response timeout budget accounts for.
///
/// The poll timeout fires after `(NUMBER_OF_REQUEST_RETRIES + 1) *
/// RESPONSE_TIME_OUT_MS` without a response.
pub const NUMBER_OF_REQUEST_RETRIES: u64 = 2;

/// Per-request response timeout (milliseconds).
pub const RESPONSE_TIME_OUT_MS: u64 = 2_000;

// =======================================================================
// Queues & identity
// =======================================================================

/// Critical event queue bound.
///
/// Admission rejects once `len > MAX_QUEUE_SIZE` holds, so the queue can
/// momentarily hold `MAX_QUEUE_SIZE + 1` entries.
pub const MAX_QUEUE_SIZE: usize = 256;

/// Terminus handle recorded in the BMC's terminus locator PDR.
pub const TERMINUS_HANDLE: u16 = 0;

/// Terminus id (TID) of the BMC itself.
pub const TERMINUS_ID: u8 = 1;

/// MCTP endpoint id of the BMC.
pub const BMC_MCTP_EID: u8 = 8;

/// Reserved TID used as the lookup fallback for termini that have not yet
/// published a terminus locator PDR.
pub const TID_RESERVED: u8 = 0;

// =======================================================================
// Configuration directories
// =======================================================================

/// Default PDR descriptor directory (one JSON file per PDR-type category).
pub const PDR_JSONS_DIR: &str = "/usr/share/pldm/pdr";

/// Default BIOS attribute descriptor directory.
pub const BIOS_JSONS_DIR: &str = "/usr/share/pldm/bios";

/// Runtime tunables resolved from the static defaults and `PLDM_*`
/// environment overrides.
///
/// Constructed once at startup and handed to each per-endpoint poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    pub normal_event_period: Duration,
    pub critical_event_period: Duration,
    pub poll_request_delay: Duration,
    pub response_timeout: Duration,
    pub request_retries: u64,
    pub max_queue_size: usize,
    pub terminus_handle: u16,
    pub terminus_id: u8,
    pub bmc_mctp_eid: u8,
}

impl Tunables {
    /// Spec defaults, no environment consulted.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            normal_event_period: Duration::from_millis(NORMAL_RAS_EVENT_TIMER_MS),
            critical_event_period: Duration::from_millis(CRITICAL_RAS_EVENT_TIMER_MS),
            poll_request_delay: Duration::from_millis(POLL_REQ_EVENT_TIMER_MS),
            response_timeout: Duration::from_millis(RESPONSE_TIME_OUT_MS),
            request_retries: NUMBER_OF_REQUEST_RETRIES,
            max_queue_size: MAX_QUEUE_SIZE,
            terminus_handle: TERMINUS_HANDLE,
            terminus_id: TERMINUS_ID,
            bmc_mctp_eid: BMC_MCTP_EID,
        }
    }

    /// Defaults overridden by `PLDM_*` environment variables where present.
    ///
    /// Unparsable values fall back to the default for that field (fail-safe,
    /// logged by the caller on mismatch with expectations).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            normal_event_period: Duration::from_millis(env_u64(
                "PLDM_NORMAL_RAS_EVENT_TIMER_MS",
                NORMAL_RAS_EVENT_TIMER_MS,
            )),
            critical_event_period: Duration::from_millis(env_u64(
                "PLDM_CRITICAL_RAS_EVENT_TIMER_MS",
                CRITICAL_RAS_EVENT_TIMER_MS,
            )),
            poll_request_delay: Duration::from_millis(env_u64(
                "PLDM_POLL_REQ_EVENT_TIMER_MS",
                POLL_REQ_EVENT_TIMER_MS,
            )),
            response_timeout: Duration::from_millis(env_u64(
                "PLDM_RESPONSE_TIME_OUT_MS",
                RESPONSE_TIME_OUT_MS,
            )),
            request_retries: env_u64("PLDM_NUMBER_OF_REQUEST_RETRIES", NUMBER_OF_REQUEST_RETRIES),
            max_queue_size: env_u64("PLDM_MAX_QUEUE_SIZE", MAX_QUEUE_SIZE as u64) as usize,
            terminus_handle: env_u64("PLDM_TERMINUS_HANDLE", u64::from(TERMINUS_HANDLE)) as u16,
            terminus_id: env_u64("PLDM_TERMINUS_ID", u64::from(TERMINUS_ID)) as u8,
            bmc_mctp_eid: env_u64("PLDM_BMC_MCTP_EID", u64::from(BMC_MCTP_EID)) as u8,
        }
    }

    /// Budget after which an unanswered poll request is abandoned.
    ///
    /// `(request_retries + 1) * response_timeout`, per the retry discipline.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.response_timeout * (self.request_retries as u32 + 1)
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Tunables::new();
        assert_eq!(t.normal_event_period, Duration::from_millis(20_000));
        assert_eq!(t.critical_event_period, Duration::from_millis(5_000));
        assert_eq!(t.max_queue_size, MAX_QUEUE_SIZE);
    }

    #[test]
    fn test_poll_timeout_budget() {
        let t = Tunables::new();
        // (retries + 1) * response timeout
        assert_eq!(
            t.poll_timeout(),
            Duration::from_millis((NUMBER_OF_REQUEST_RETRIES + 1) * RESPONSE_TIME_OUT_MS)
        );
    }

    #[test]
    fn test_env_u64_fallback() {
        // Unset variable falls back to the default
        assert_eq!(env_u64("PLDM_TEST_UNSET_TUNABLE", 42), 42);
    }
}
