//! Actors communicate over unbounded channels. Each message carries the
//! tracing span it was sent from so the receiver can log in that context.

pub mod broadcast;
pub mod reactor;

use std::fmt;

use tokio::sync::mpsc;
use tracing::Span;

pub struct Sender<Event>(mpsc::UnboundedSender<(Span, Event)>);
pub type Receiver<Event> = mpsc::UnboundedReceiver<(Span, Event)>;

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Sender(tx), rx)
}

impl<Event> Sender<Event> {
    /// Sends an event, dropping it if the receiving actor is gone.
    pub fn send(&self, event: Event) {
        if self.try_send(event).is_err() {
            tracing::debug!("dropping event: receiver closed");
        }
    }

    pub fn try_send(&self, event: Event) -> Result<(), mpsc::error::SendError<(Span, Event)>> {
        self.0.send((Span::current(), event))
    }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Sender(self.0.clone()) }
}

impl<Event> fmt::Debug for Sender<Event> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Sender { .. }") }
}
