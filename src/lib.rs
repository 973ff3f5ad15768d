//! Decides whether the phone box should stay locked today, based on an
//! all-day "Kids" event in a shared family calendar.

pub mod cli;
pub mod engine;
pub mod event;
pub mod google;
pub mod server;
pub mod source;

pub use engine::{evaluate, Decision};
pub use event::{CalendarEvent, TimeWindow};
pub use source::{CalendarHandle, EventSource, SourceError};
