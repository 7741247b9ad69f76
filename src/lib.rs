#![doc = "The `taskgate` library crate."]
#![doc = ""]
#![doc = "Stateless bearer-token authentication and route-based authorization for the"]
#![doc = "task management backend: password verification, JWT issuance and validation,"]
#![doc = "the request filter that attaches the caller's identity, and the rule table it"]
#![doc = "consults. The binary (`main.rs`) wires these into an Actix Web server."]

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;

pub use app::build_app;
