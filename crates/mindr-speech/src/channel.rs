//! The speech input channel: a start/stop wrapper around a platform
//! recognizer, relaying finalized transcripts to a single consumer.

use std::sync::Arc;

use tokio::sync::mpsc;

use mindr_core::{MindrError, Result};

use crate::state::{SpeechState, StateMachine};

/// Events emitted by the channel while a listening session is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// One completed utterance, finalized by the recognizer. The channel
    /// remains Listening after emitting it.
    Transcript(String),
    /// The device ended the session for any reason. Reflects channel state
    /// only; it does not mean input can never come again.
    Ended,
}

/// Platform speech-recognition capability.
///
/// `begin` receives the sender on which the device posts its events;
/// `end` asks the device to stop. Capability checking is a precondition of
/// the UI flow, so `is_supported` is consulted once per `start`.
pub trait SpeechRecognizer: Send + Sync {
    fn is_supported(&self) -> bool;
    fn begin(&self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()>;
    fn end(&self);
}

/// One speech channel per conversation UI.
///
/// The receiving half is owned by the channel and drained through
/// [`SpeechChannel::recv`], which keeps the state machine in sync with
/// device-driven ends. Strictly single-consumer.
pub struct SpeechChannel {
    state: StateMachine,
    recognizer: Arc<dyn SpeechRecognizer>,
    events_tx: mpsc::UnboundedSender<SpeechEvent>,
    events_rx: mpsc::UnboundedReceiver<SpeechEvent>,
}

impl SpeechChannel {
    /// Create a channel over the given recognizer, initially Idle.
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: StateMachine::new(),
            recognizer,
            events_tx,
            events_rx,
        }
    }

    /// Returns the current channel state.
    pub fn state(&self) -> SpeechState {
        self.state.current()
    }

    /// Begin a listening session.
    ///
    /// No-op when already Listening. Fails with `UnsupportedDevice` when the
    /// platform lacks speech capability.
    pub fn start(&self) -> Result<()> {
        if self.state.current() == SpeechState::Listening {
            tracing::debug!("Speech channel already listening");
            return Ok(());
        }
        if !self.recognizer.is_supported() {
            return Err(MindrError::UnsupportedDevice);
        }
        self.state.transition(SpeechState::Listening)?;
        if let Err(e) = self.recognizer.begin(self.events_tx.clone()) {
            self.state.reset();
            return Err(e);
        }
        tracing::info!("Speech listening started");
        Ok(())
    }

    /// End the listening session. No-op when already Idle.
    pub fn stop(&self) {
        if self.state.current() == SpeechState::Idle {
            return;
        }
        self.recognizer.end();
        self.state.reset();
        tracing::info!("Speech listening stopped");
    }

    /// Receive the next event from the device.
    ///
    /// A `Transcript` leaves the channel Listening; an `Ended` returns it to
    /// Idle before being handed to the consumer. Returns `None` only if the
    /// channel is unusable (sender closed), which cannot happen while the
    /// channel itself is alive.
    pub async fn recv(&mut self) -> Option<SpeechEvent> {
        let event = self.events_rx.recv().await?;
        if event == SpeechEvent::Ended {
            self.state.reset();
        }
        Some(event)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Recognizer fake that records begin/end calls and hands the test the
    /// event sender so it can play the device.
    struct FakeRecognizer {
        supported: bool,
        begins: AtomicUsize,
        ends: AtomicUsize,
        sender: Mutex<Option<mpsc::UnboundedSender<SpeechEvent>>>,
    }

    impl FakeRecognizer {
        fn new(supported: bool) -> Self {
            Self {
                supported,
                begins: AtomicUsize::new(0),
                ends: AtomicUsize::new(0),
                sender: Mutex::new(None),
            }
        }

        fn emit(&self, event: SpeechEvent) {
            let guard = self.sender.lock().unwrap();
            guard
                .as_ref()
                .expect("begin was not called")
                .send(event)
                .unwrap();
        }
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn begin(&self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            *self.sender.lock().unwrap() = Some(events);
            Ok(())
        }

        fn end(&self) {
            self.ends.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_start_unsupported_device() {
        let channel = SpeechChannel::new(Arc::new(FakeRecognizer::new(false)));
        let err = channel.start().unwrap_err();
        assert!(matches!(err, MindrError::UnsupportedDevice));
        assert_eq!(channel.state(), SpeechState::Idle);
    }

    #[test]
    fn test_start_twice_is_idempotent() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let channel = SpeechChannel::new(recognizer.clone());

        channel.start().unwrap();
        channel.start().unwrap();

        // Exactly one listening session was started on the device.
        assert_eq!(recognizer.begins.load(Ordering::SeqCst), 1);
        assert_eq!(channel.state(), SpeechState::Listening);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let channel = SpeechChannel::new(recognizer.clone());
        channel.stop();
        assert_eq!(recognizer.ends.load(Ordering::SeqCst), 0);
        assert_eq!(channel.state(), SpeechState::Idle);
    }

    #[test]
    fn test_stop_returns_to_idle() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let channel = SpeechChannel::new(recognizer.clone());
        channel.start().unwrap();
        channel.stop();
        assert_eq!(recognizer.ends.load(Ordering::SeqCst), 1);
        assert_eq!(channel.state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_transcript_keeps_channel_listening() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let mut channel = SpeechChannel::new(recognizer.clone());
        channel.start().unwrap();

        recognizer.emit(SpeechEvent::Transcript("schedule lunch".to_string()));
        let event = channel.recv().await.unwrap();
        assert_eq!(
            event,
            SpeechEvent::Transcript("schedule lunch".to_string())
        );
        assert_eq!(channel.state(), SpeechState::Listening);
    }

    #[tokio::test]
    async fn test_device_end_returns_channel_to_idle() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let mut channel = SpeechChannel::new(recognizer.clone());
        channel.start().unwrap();

        recognizer.emit(SpeechEvent::Ended);
        let event = channel.recv().await.unwrap();
        assert_eq!(event, SpeechEvent::Ended);
        assert_eq!(channel.state(), SpeechState::Idle);

        // Ended does not mean input can never come again: a fresh start
        // opens a new session.
        channel.start().unwrap();
        assert_eq!(recognizer.begins.load(Ordering::SeqCst), 2);
        assert_eq!(channel.state(), SpeechState::Listening);
    }

    #[tokio::test]
    async fn test_transcript_per_utterance_then_end() {
        let recognizer = Arc::new(FakeRecognizer::new(true));
        let mut channel = SpeechChannel::new(recognizer.clone());
        channel.start().unwrap();

        recognizer.emit(SpeechEvent::Transcript("first".to_string()));
        recognizer.emit(SpeechEvent::Transcript("second".to_string()));
        recognizer.emit(SpeechEvent::Ended);

        assert_eq!(
            channel.recv().await.unwrap(),
            SpeechEvent::Transcript("first".to_string())
        );
        assert_eq!(
            channel.recv().await.unwrap(),
            SpeechEvent::Transcript("second".to_string())
        );
        assert_eq!(channel.recv().await.unwrap(), SpeechEvent::Ended);
        assert_eq!(channel.state(), SpeechState::Idle);
    }

    #[test]
    fn test_begin_failure_rolls_back_state() {
        struct BrokenRecognizer;
        impl SpeechRecognizer for BrokenRecognizer {
            fn is_supported(&self) -> bool {
                true
            }
            fn begin(&self, _events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()> {
                Err(MindrError::Speech("device busy".to_string()))
            }
            fn end(&self) {}
        }

        let channel = SpeechChannel::new(Arc::new(BrokenRecognizer));
        let err = channel.start().unwrap_err();
        assert!(matches!(err, MindrError::Speech(_)));
        assert_eq!(channel.state(), SpeechState::Idle);
    }
}
