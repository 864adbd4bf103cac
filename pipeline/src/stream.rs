//! Streamed predictions.
//!
//! A prediction stream pulls raw body chunks from the transport only when
//! the caller asks for the next element. One element is always held back so
//! the last one can be flagged as final before it is handed out.

use std::pin::Pin;

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decode::{Framer, Framing};
use crate::diagnose;
use crate::error::Result;
use crate::transport::ByteStream;

/// One element of a streamed prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk<P> {
    /// Position in the stream, starting at 0.
    pub seq: u64,
    /// Shared by every chunk of one stream.
    pub stream_id: Uuid,
    /// Set on the last chunk only.
    pub is_final: bool,
    pub payload: P,
}

pub type PredictionStream<P> = Pin<Box<dyn Stream<Item = Result<StreamChunk<P>>> + Send>>;

/// Frame and decode `body`, numbering elements and flagging the last one.
///
/// An error is diagnosed and ends the stream. Predictions decoded before it
/// are still handed out, none of them flagged final.
pub fn predictions<P>(
    body: ByteStream,
    framing: Framing,
    decode: fn(&[u8]) -> Result<P>,
) -> PredictionStream<P>
where
    P: Send + 'static,
{
    let stream_id = Uuid::new_v4();
    let mut body = body;
    Box::pin(stream! {
        let mut framer = Framer::new(framing);
        let mut held: Option<P> = None;
        let mut seq = 0u64;
        let mut failure = None;
        'read: loop {
            let frames = match body.next().await {
                Some(Ok(chunk)) => framer.push(chunk),
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => {
                    for frame in framer.finish() {
                        match decode(&frame) {
                            Ok(p) => {
                                if let Some(prev) = held.replace(p) {
                                    yield Ok(StreamChunk { seq, stream_id, is_final: false, payload: prev });
                                    seq += 1;
                                }
                            }
                            Err(e) => failure = Some(e),
                        }
                    }
                    break;
                }
            };
            for frame in frames {
                match decode(&frame) {
                    Ok(p) => {
                        if let Some(prev) = held.replace(p) {
                            yield Ok(StreamChunk { seq, stream_id, is_final: false, payload: prev });
                            seq += 1;
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        break 'read;
                    }
                }
            }
        }
        match failure {
            // Predictions decoded before the failure still reach the caller.
            Some(e) => {
                if let Some(prev) = held.take() {
                    yield Ok(StreamChunk { seq, stream_id, is_final: false, payload: prev });
                }
                yield Err(diagnose::inspect(e));
            }
            None => {
                if let Some(last) = held {
                    yield Ok(StreamChunk { seq, stream_id, is_final: true, payload: last });
                }
            }
        }
    })
}
