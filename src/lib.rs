//! Sales Funnel: scripted sales conversations over a messaging channel.

pub mod bot;
pub mod catalog;
pub mod channels;
pub mod config;
pub mod error;
pub mod funnel;
pub mod store;
