//! ACM Collector - multi-region AWS Certificate Manager inventory
//!
//! This crate is one resource collector of a cloud security posture platform. Given a
//! credential source and a list of AWS regions it lists every ACM certificate per region,
//! describes each one, and returns a region-keyed snapshot for policy evaluation.
//!
//! # Architecture Overview
//!
//! - **Collection core** ([`app::collector`]): the generic two-phase (list, then describe)
//!   region collector and the fail-fast multi-region aggregator, written against the
//!   injectable [`app::collector::CloudApi`] trait
//! - **AWS services** ([`app::aws_services`]): the ACM implementation of `CloudApi` and the
//!   normalized certificate records it produces
//! - **Configuration** ([`app::collector::config`]): TOML-backed region and concurrency settings
//!
//! ## Failure semantics
//!
//! Collection is all-or-nothing. Any configuration, list, or describe failure in any region
//! aborts the whole call and no partial map is returned: an incomplete posture snapshot
//! reported as complete is worse than an explicit error.
//!
//! # Getting Started
//!
//! [`app::aws_services::acm::collect_acm_certificates`] is the library entry point. The
//! `acm-collector` binary wraps it with AWS config loading, logging, and JSON output.

#![warn(clippy::all, rust_2018_idioms)]

#[macro_use]
pub mod logging_macros;

pub mod app;
