//! # classview
//!
//! Reconciles Java bytecode with decompiled source: finds the class files
//! that make up one compiled unit, feeds them to a decompiler engine, and
//! keeps the bytecode-line to source-line table the engine reports.
//!
//! ## Architecture
//!
//! - **inspect**: Minimal class-file scan that gates decompilation (package-info, Groovy)
//! - **source**: Class units on disk or in jars, nested-class discovery, bytecode provider
//! - **mapping**: Bytecode line <-> source line table with first-match lookups
//! - **collector**: Result sink keeping the first decompiled unit of a request
//! - **decompiler**: Per-request driver with banner output and stub fallback
//! - **engine**: Provider, sink, logger and option interfaces for the external engine
//! - **fernflower**: Fernflower console decompiler run as a `java` process
//! - **logger**: Engine logger backed by `tracing`
//! - **stub**: Fallback renderers for classes that are not decompiled
//! - **report**: Serializable results and content hashing for the CLI
//! - **config**: Settings file, environment and flag resolution
//! - **error**: Error taxonomy shared by the engine interfaces

pub mod cli;
pub mod collector;
pub mod config;
pub mod decompiler;
pub mod engine;
pub mod error;
pub mod fernflower;
pub mod inspect;
pub mod logger;
pub mod mapping;
pub mod report;
pub mod source;
pub mod stub;
