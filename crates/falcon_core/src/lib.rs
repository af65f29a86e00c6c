//! Core library for the Falcon MCP server.
//!
//! This crate exposes the CrowdStrike Falcon platform as a set of MCP
//! tools: host inventory and containment, detection triage, and incident
//! investigation. The pieces compose in layers:
//!
//! - [`provider`] owns the OAuth2 session lifecycle and the HTTP calls to
//!   the Falcon REST API, behind traits so everything above it can run
//!   against the mock provider.
//! - [`tools`] holds the tool modules and the name-keyed [`tools::registry`]
//!   that dispatches invocations and shapes every result as an [`Envelope`].
//! - [`server`] wires provider and registry into the [`server::McpServer`]
//!   that transports drive.
//! - [`client`] is the same machinery as an embeddable SDK.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod provider;
pub mod server;
pub mod tools;

pub use client::FalconClient;
pub use config::{Environment, Secret, Settings};
pub use envelope::{Envelope, ErrorMessage};
pub use error::{FalconError, Result};
pub use provider::{ApiResponse, Provider, QueryParams};
pub use server::{McpServer, create_server, create_server_from_env};
pub use tools::registry::{ToolDescriptor, ToolRegistry};
