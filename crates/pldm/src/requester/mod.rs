// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response correlation.
//!
//! Consolidates the requester-side discipline every outbound PLDM request
//! follows:
//! - `InstanceIdDb`: per-endpoint pool of the 32 instance ids
//! - `RequestHandler`: one-shot response callbacks keyed on
//!   (endpoint, instance id), with a timeout sweep
//!
//! At most one request may be live per (endpoint, instance id); ids are
//! released on response, timeout, or any early-exit path.

mod handler;
mod instance_id;

pub use handler::{RequestHandler, ResponseCallback};
pub use instance_id::InstanceIdDb;
