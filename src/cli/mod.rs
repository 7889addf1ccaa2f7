//! # CLI Module
//!
//! The `hookrouter` binary builds a router from a YAML route manifest and lets you inspect it.
//!
//! ## Manifest
//!
//! ```yaml
//! routes:
//!   - pattern: GET:/user/:id
//!     name: show
//!   - pattern: /user/*any
//!     name: audit
//!     stage: BeforeServe
//! ```
//!
//! Every entry is registered with an echo handler that appends `[name]` to the response body, so
//! a resolved request shows which hooks and handler ran, in order.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the route table:
//!
//! ```bash
//! hookrouter routes --manifest routes.yaml [--config router.yaml] [--json]
//! ```
//!
//! ### `resolve`
//!
//! Dispatch one request through all six stages and print status, body, parameters and faults:
//!
//! ```bash
//! hookrouter resolve --manifest routes.yaml --method GET --host example.com --path /user/42
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use hookrouter::cli::{Cli, run_cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{
    render_outcome, render_routes, resolve_request, run_cli, Cli, Commands, Manifest,
    ManifestRoute,
};
