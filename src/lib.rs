//! Thread Graph Explorer library.
//!
//! Ingests a Discourse thread through its JSON API, builds the like graph of
//! its participants, lays the graph out with a force simulation, and serves
//! the results over HTTP.

pub mod analytics;
pub mod config;
pub mod constants;
pub mod discourse;
pub mod graph;
pub mod layout;
pub mod model;
pub mod summary;
pub mod web;
