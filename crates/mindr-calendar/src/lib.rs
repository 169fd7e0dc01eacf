//! Calendar access for the mindr client.
//!
//! A thin REST client for the external calendar service plus a bridge that
//! gates every call on the presence of a calendar credential and maps
//! authorization failures to an explicit expired outcome.

pub mod bridge;
pub mod client;

pub use bridge::{CalendarBridge, CalendarOutcome};
pub use client::{CalendarApi, CalendarEvent, EventTime, HttpCalendarApi};
