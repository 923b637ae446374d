//! Minimal Discord adapter: a gateway session that receives messages and a
//! REST client that posts replies.

pub mod gateway;
pub mod model;
pub mod rest;
