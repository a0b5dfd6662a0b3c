//! Contract broker access.
//!
//! A broker stores contract documents under
//! `{base}/contract/{provider}/{consumer}[/{tag}]`. Several mirrors may be
//! configured; every request races all of them.

mod client;

pub use client::BrokerClient;
