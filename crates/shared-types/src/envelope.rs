//! # Wire Envelopes
//!
//! Frame order is significant. Decoding demands the exact frame count for the
//! envelope kind; anything else is foreign traffic and is rejected with a
//! [`WireError`] so the caller can discard it.

use crate::codec::Encoding;
use crate::correlation::CorrelationId;
use crate::errors::{CodecError, WireError};
use crate::fault::{Fault, RemoteError};
use bytes::Bytes;
use serde_json::Value;

/// Whether a routing identity frame leads the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Round-robin side: no identity frame.
    Plain,
    /// Identity-routed side: first frame is the peer identity.
    Routed,
}

impl Framing {
    fn extra(self) -> usize {
        match self {
            Self::Plain => 0,
            Self::Routed => 1,
        }
    }
}

fn check_count(frames: &[Bytes], base: usize, framing: Framing) -> Result<(), WireError> {
    let expected = base + framing.extra();
    if frames.len() == expected {
        Ok(())
    } else {
        Err(WireError::FrameCount {
            expected,
            actual: frames.len(),
        })
    }
}

fn text(frame: Bytes, field: &'static str) -> Result<String, WireError> {
    String::from_utf8(frame.to_vec()).map_err(|_| WireError::NotUtf8 { field })
}

fn take_identity(iter: &mut std::vec::IntoIter<Bytes>, framing: Framing) -> Option<Bytes> {
    match framing {
        Framing::Routed => iter.next(),
        Framing::Plain => None,
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// `[identity?, eventName, correlationId, payload]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub identity: Option<Bytes>,
    pub name: String,
    pub id: CorrelationId,
    pub payload: Bytes,
}

impl RequestEnvelope {
    /// Frames without the identity.
    pub const FRAMES: usize = 3;

    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        let mut frames = Vec::with_capacity(Self::FRAMES + 1);
        frames.extend(self.identity);
        frames.push(Bytes::from(self.name));
        frames.push(Bytes::copy_from_slice(self.id.as_bytes()));
        frames.push(self.payload);
        frames
    }

    /// # Errors
    ///
    /// Returns [`WireError`] on a wrong frame count or non-UTF-8 name or id.
    pub fn from_frames(frames: Vec<Bytes>, framing: Framing) -> Result<Self, WireError> {
        check_count(&frames, Self::FRAMES, framing)?;
        let mut iter = frames.into_iter();
        let identity = take_identity(&mut iter, framing);
        let name = text(iter.next().unwrap_or_default(), "eventName")?;
        let id = CorrelationId::from_frame(&iter.next().unwrap_or_default())
            .ok_or(WireError::EmptyId)?;
        let payload = iter.next().unwrap_or_default();
        Ok(Self {
            identity,
            name,
            id,
            payload,
        })
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// `[identity?, correlationId, serializedError, serializedResult]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub identity: Option<Bytes>,
    pub id: CorrelationId,
    pub error: Bytes,
    pub result: Bytes,
}

impl ResponseEnvelope {
    pub const FRAMES: usize = 3;

    /// Encode a handler outcome. Errors become `(sanitized, null)`, successes
    /// `(null, value)`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the result value cannot be encoded.
    pub fn encode(
        identity: Option<Bytes>,
        id: CorrelationId,
        outcome: &Result<Value, RemoteError>,
        encoding: Encoding,
        include_stack: bool,
    ) -> Result<Self, CodecError> {
        let (error, result) = match outcome {
            Ok(value) => (encoding.encode(&Value::Null)?, encoding.encode(value)?),
            Err(err) => (
                encoding.encode(&err.sanitize(include_stack))?,
                encoding.encode(&Value::Null)?,
            ),
        };
        Ok(Self {
            identity,
            id,
            error,
            result,
        })
    }

    /// Decode the `(error, result)` pair. A non-null error slot wins.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if either slot is undecodable.
    pub fn decode_outcome(&self, encoding: Encoding) -> Result<Result<Value, Fault>, CodecError> {
        let error: Value = encoding.decode(&self.error)?;
        if let Some(fault) = Fault::from_wire(error) {
            return Ok(Err(fault));
        }
        Ok(Ok(encoding.decode(&self.result)?))
    }

    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        let mut frames = Vec::with_capacity(Self::FRAMES + 1);
        frames.extend(self.identity);
        frames.push(Bytes::copy_from_slice(self.id.as_bytes()));
        frames.push(self.error);
        frames.push(self.result);
        frames
    }

    /// # Errors
    ///
    /// Returns [`WireError`] on a wrong frame count or an empty id.
    pub fn from_frames(frames: Vec<Bytes>, framing: Framing) -> Result<Self, WireError> {
        check_count(&frames, Self::FRAMES, framing)?;
        let mut iter = frames.into_iter();
        let identity = take_identity(&mut iter, framing);
        let id = CorrelationId::from_frame(&iter.next().unwrap_or_default())
            .ok_or(WireError::EmptyId)?;
        let error = iter.next().unwrap_or_default();
        let result = iter.next().unwrap_or_default();
        Ok(Self {
            identity,
            id,
            error,
            result,
        })
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// `[topicName, serializedPayload]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEnvelope {
    pub topic: String,
    pub payload: Bytes,
}

impl BroadcastEnvelope {
    pub const FRAMES: usize = 2;

    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        vec![Bytes::from(self.topic), self.payload]
    }

    /// # Errors
    ///
    /// Returns [`WireError`] unless there are exactly two frames with a UTF-8
    /// topic.
    pub fn from_frames(frames: Vec<Bytes>) -> Result<Self, WireError> {
        check_count(&frames, Self::FRAMES, Framing::Plain)?;
        let mut iter = frames.into_iter();
        let topic = text(iter.next().unwrap_or_default(), "topicName")?;
        let payload = iter.next().unwrap_or_default();
        Ok(Self { topic, payload })
    }
}
