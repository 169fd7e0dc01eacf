//! Speech input channel for the mindr client.
//!
//! Wraps a platform speech-recognition capability into an explicit
//! start/stop state machine producing finalized transcripts. The channel
//! retains no history; it relays transcripts to its single consumer.

pub mod channel;
pub mod state;

pub use channel::{SpeechChannel, SpeechEvent, SpeechRecognizer};
pub use state::{SpeechState, StateMachine};
