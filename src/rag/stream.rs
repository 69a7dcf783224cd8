//! The answer stream handed back to callers of a turn.

use crate::error::{Result, SvarError};
use crate::llm::FragmentStream;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// One pull from an [`AnswerStream`].
#[derive(Debug)]
pub enum StreamEvent {
    Fragment(String),
    End,
    /// Terminal; the stream yields nothing after this.
    Error(SvarError),
}

/// A lazy, single-use sequence of answer fragments in generation order.
///
/// Any error ends the stream and is reported as `StreamInterrupted`, so a
/// failure can always be told apart from a normal end.
pub struct AnswerStream {
    inner: Option<FragmentStream>,
    fallback: bool,
}

impl AnswerStream {
    /// Wrap a model fragment stream.
    pub fn new(inner: FragmentStream) -> Self {
        let inner = inner
            .map(|item| {
                item.map_err(|e| match e {
                    SvarError::StreamInterrupted(_) => e,
                    other => SvarError::StreamInterrupted(other.to_string()),
                })
            })
            .boxed();

        Self {
            inner: Some(inner),
            fallback: false,
        }
    }

    /// A single-fragment stream that never touches a model.
    pub fn fallback(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            inner: Some(stream::once(async move { Ok(message) }).boxed()),
            fallback: true,
        }
    }

    /// Whether this is the fixed no-context reply.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Pull the next event.
    pub async fn next_event(&mut self) -> StreamEvent {
        match self.next().await {
            Some(Ok(fragment)) => StreamEvent::Fragment(fragment),
            Some(Err(e)) => StreamEvent::Error(e),
            None => StreamEvent::End,
        }
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for AnswerStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(e))) => {
                this.inner = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream")
            .field("finished", &self.inner.is_none())
            .field("fallback", &self.fallback)
            .finish()
    }
}
