// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node kinds built on the core framework.

pub mod signal;
