// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL trajectory log with a bounded reverse-seek tail.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// File name under `<workspace>/.claude/`.
pub const TRAJECTORY_FILE_NAME: &str = "trajectory.jsonl";

/// Block size for reverse-seek tail reads.
const BLOCK_SIZE: u64 = 4096;

/// Default cap on bytes scanned by `tail`; guards against memory
/// exhaustion on files with no newlines.
const MAX_TAIL_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("trajectory I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trajectory encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only event log.
///
/// Owns its own lock, separate from the state store, so logging never
/// extends the state critical section. Readers tolerate concurrent
/// writers: they only observe already-written bytes, and a torn first
/// line is skipped like any other corrupt line.
pub struct TrajectoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TrajectoryLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line, flushed and fsynced.
    pub fn append(&self, event: &Value) -> Result<(), TrajectoryError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;
        file.sync_all()?;
        Ok(())
    }

    /// Last `n` well-formed events, newest last.
    pub fn tail(&self, n: usize) -> Result<Vec<Value>, TrajectoryError> {
        self.tail_bounded(n, MAX_TAIL_BYTES)
    }

    /// `tail` with an explicit byte budget.
    ///
    /// Reads fixed-size blocks backwards from the end until `n + 1`
    /// newlines have been seen, the start of file is reached, or the
    /// budget is spent. Cost is O(bytes scanned), independent of file
    /// length. Empty, corrupt, and non-UTF-8 lines are skipped.
    pub fn tail_bounded(&self, n: usize, max_bytes: u64) -> Result<Vec<Value>, TrajectoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let _guard = self.lock.lock();

        let mut file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file_size = file.seek(SeekFrom::End(0))?;
        if file_size == 0 {
            return Ok(Vec::new());
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut position = file_size;
        loop {
            let read_size = BLOCK_SIZE.min(position);
            position -= read_size;
            file.seek(SeekFrom::Start(position))?;

            let mut chunk = vec![0u8; read_size as usize];
            file.read_exact(&mut chunk)?;
            chunk.extend_from_slice(&buffer);
            buffer = chunk;

            let newlines = buffer.iter().filter(|&&b| b == b'\n').count();
            if newlines > n || position == 0 || buffer.len() as u64 >= max_bytes {
                break;
            }
        }

        // Forward pass over the collected blocks.
        let mut events: Vec<Value> = Vec::new();
        for line in buffer.split(|&b| b == b'\n') {
            let Ok(text) = std::str::from_utf8(line) else { continue };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if let Ok(event) = serde_json::from_str::<Value>(text) {
                events.push(event);
            }
        }

        let skip = events.len().saturating_sub(n);
        Ok(events.split_off(skip))
    }
}

#[cfg(test)]
#[path = "trajectory_tests.rs"]
mod tests;
