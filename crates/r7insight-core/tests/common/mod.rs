// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities, mocks, and helpers for integration tests

pub mod mocks;
pub mod relay;

pub const TOKEN: &str = "2bfbea1e-10c3-4419-bdad-7e6435882e1f";
