//! Seams to the modules above the mailbox.
//!
//! The outbound activity pulls messages from a [`MessageSource`]; the inbound
//! activity pushes every delivered buffer into a [`MessageSink`].

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Supplier of outbound messages.
#[async_trait(?Send)]
pub trait MessageSource {
    /// Next message to send, or `None` once the source is exhausted.
    async fn next_message(&mut self) -> Option<Vec<u8>>;
}

#[async_trait(?Send)]
impl MessageSource for mpsc::UnboundedReceiver<Vec<u8>> {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        self.recv().await
    }
}

#[async_trait(?Send)]
impl MessageSource for mpsc::Receiver<Vec<u8>> {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        self.recv().await
    }
}

/// Source backed by a fixed list of messages.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    messages: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Vec<u8>>,
{
    /// Wrap anything that yields byte buffers.
    pub fn new<T>(messages: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            messages: messages.into_iter(),
        }
    }
}

#[async_trait(?Send)]
impl<I> MessageSource for IterSource<I>
where
    I: Iterator<Item = Vec<u8>>,
{
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        self.messages.next()
    }
}

/// Receiver of delivered buffers.
///
/// In streaming mode a buffer is whatever span was readable at one wakeup,
/// padding included; in chunked mode it is one whole reassembled message.
pub trait MessageSink {
    /// Take ownership of one delivered buffer.
    fn deliver(&mut self, payload: Vec<u8>);
}

impl MessageSink for Vec<Vec<u8>> {
    fn deliver(&mut self, payload: Vec<u8>) {
        self.push(payload);
    }
}

impl MessageSink for mpsc::UnboundedSender<Vec<u8>> {
    fn deliver(&mut self, payload: Vec<u8>) {
        if self.send(payload).is_err() {
            tracing::debug!("upstream receiver dropped, discarding delivery");
        }
    }
}

/// Sink calling a closure for every delivery.
pub struct FnSink<F>(F);

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSink")
    }
}

/// Build a sink from a closure.
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Vec<u8>),
{
    FnSink(f)
}

impl<F> MessageSink for FnSink<F>
where
    F: FnMut(Vec<u8>),
{
    fn deliver(&mut self, payload: Vec<u8>) {
        (self.0)(payload)
    }
}
