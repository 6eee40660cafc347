// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON framing with timeouts.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Request, Response};

/// Errors from reading or writing protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for peer")]
    Timeout,

    #[error("Invalid request: {0}")]
    Invalid(serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one newline-terminated request (daemon side).
///
/// Returns `Ok(None)` when the client sent nothing (an empty line or an
/// immediate EOF). Such connections are dropped silently.
pub async fn read_request<R>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<Option<Request>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some).map_err(ProtocolError::Invalid)
}

/// Read one newline-terminated response (client side).
pub async fn read_response<R>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    serde_json::from_str(line.trim()).map_err(ProtocolError::Invalid)
}

/// Write a request as a single newline-terminated line (client side).
pub async fn write_request<W>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_line(writer, request, timeout).await
}

/// Write a response as a single newline-terminated line (daemon side).
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_line(writer, response, timeout).await
}

async fn write_line<W, T>(writer: &mut W, value: &T, timeout: Duration) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = serde_json::to_vec(value).map_err(ProtocolError::Invalid)?;
    buf.push(b'\n');
    tokio::time::timeout(timeout, async {
        writer.write_all(&buf).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
