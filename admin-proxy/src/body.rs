//! Size-bounded collection of request bodies.
//!
//! The body is consumed frame by frame and the running total is checked after
//! every frame, so an oversized upload is refused as soon as it crosses the
//! limit instead of after it has been fully buffered.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Body;
use std::fmt::Display;
use std::pin::pin;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BodyError {
    #[error("body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read body: {0}")]
    Read(String),
}

/// Collects `body` into contiguous bytes, failing once more than `limit` bytes arrive.
pub async fn read_bounded<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Display,
{
    let mut body = pin!(body);
    let mut buffer = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| BodyError::Read(e.to_string()))?;
        // Trailers carry no payload
        let Ok(data) = frame.into_data() else {
            continue;
        };

        if buffer.len() + data.remaining() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        buffer.put(data);
    }

    Ok(buffer.freeze())
}
