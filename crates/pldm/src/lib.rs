// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # PLDM - Platform Responder & Event Poller
//!
//! A pure Rust implementation of the PLDM (Platform Level Data Model)
//! platform monitoring & control responder and platform-event poller for
//! baseboard management controllers, speaking PLDM over MCTP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use pldm::{config::Tunables, discovery::MctpDiscovery, requester::RequestHandler};
//!
//! let tunables = Tunables::from_env();
//! let mut requester = RequestHandler::new(tunables.poll_timeout());
//! let mut discovery = MctpDiscovery::new(tunables);
//!
//! // MCTP daemon announced a PLDM-capable endpoint
//! discovery.endpoint_added(20, &[1], Instant::now());
//!
//! // event loop turn: pump timers and any delivered responses
//! # let mut transport = pldm::transport::RecordingTransport::new();
//! discovery.poll_all(Instant::now(), &mut requester, &mut transport);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Event Loop (cooperative)                    |
//! |   MCTP discovery | timers | transport completions | bus signals    |
//! +--------------------------------------------------------------------+
//! |  Responder (platform::Handler)     |  Event Poller (per EID)       |
//! |  GetPDR | eventMessage | effecters |  normal/critical cycles       |
//! |  class -> handler chains           |  reassembly + CRC-32 gate     |
//! +--------------------------------------------------------------------+
//! |  PDR repo | BIOS registry | host tracker | request correlator      |
//! +--------------------------------------------------------------------+
//! |            Wire codecs (DSP0240 / DSP0248, little-endian)          |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`platform::Handler`] | Platform command responder and event dispatcher |
//! | [`poller::EventPoller`] | Per-endpoint event solicitation state machine |
//! | [`requester::RequestHandler`] | Instance-id allocation and response correlation |
//! | [`pdr::PdrRepo`] | Handle-indexed platform descriptor record store |
//! | [`bios::BiosRegistry`] | BIOS attribute registry (enum/string/integer) |
//! | [`config::Tunables`] | Timer periods, retry budget, identity |
//!
//! The MCTP transport and the object bus are external collaborators, kept
//! behind the [`transport::Transport`], [`bus::SignalSink`], and
//! [`bus::BusProperties`] seams.

/// BIOS attribute registry (enumeration/string/integer descriptors).
pub mod bios;
/// Object-bus seams: signal emission and property access.
pub mod bus;
/// Tunables: compile-time defaults plus `PLDM_*` environment overrides.
pub mod config;
/// MCTP endpoint discovery and per-endpoint poller lifecycle.
pub mod discovery;
/// Crate-wide error type.
pub mod error;
/// Platform descriptor record repository, typed records, JSON generator.
pub mod pdr;
/// Platform command responder and event dispatch tree.
pub mod platform;
/// Platform event poller (solicitation, reassembly, critical queue).
pub mod poller;
/// PLDM wire protocol codecs (header, platform commands, CRC-32).
pub mod protocol;
/// Request/response correlation (instance ids, one-shot callbacks).
pub mod requester;
/// MCTP transport seam.
pub mod transport;

pub use error::{Error, Result};
pub use transport::Eid;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
