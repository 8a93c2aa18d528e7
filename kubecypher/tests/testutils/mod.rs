//! Test utilities for kubecypher integration tests
//!
//! - TestFixture: a QueryCoordinator over an in-memory cluster snapshot
//! - cluster: builders for the documents the fixtures load
//! - CountingGateway: a gateway double that tracks concurrent calls

#![allow(dead_code)]

pub mod cluster;
pub mod counting_gateway;
pub mod test_fixture;
