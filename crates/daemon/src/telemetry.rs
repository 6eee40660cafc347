// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-and-forget telemetry emitter.
//!
//! Events go into a bounded queue drained by a dedicated thread writing
//! newline-JSON to a local TCP endpoint. The producer never blocks: a
//! full queue drops the event, and the first connect failure disables
//! the emitter after a single warning.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

const QUEUE_DEPTH: usize = 256;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TelemetryEmitter {
    tx: SyncSender<Value>,
    disabled: Arc<AtomicBool>,
}

impl TelemetryEmitter {
    /// Emitter targeting `127.0.0.1:<port>`. Connection happens lazily on
    /// the first event.
    pub fn connect_localhost(port: u16) -> Self {
        let (tx, rx) = sync_channel::<Value>(QUEUE_DEPTH);
        let disabled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&disabled);

        std::thread::spawn(move || {
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let mut stream: Option<TcpStream> = None;

            while let Ok(event) = rx.recv() {
                if flag.load(Ordering::Relaxed) {
                    continue;
                }

                if stream.is_none() {
                    match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                        Ok(s) => {
                            let _ = s.set_write_timeout(Some(CONNECT_TIMEOUT));
                            stream = Some(s);
                        }
                        Err(_) => {
                            flag.store(true, Ordering::Relaxed);
                            warn!("telemetry endpoint 127.0.0.1:{port} unavailable; emitter disabled");
                            continue;
                        }
                    }
                }

                let Some(s) = stream.as_mut() else { continue };
                let mut line = match serde_json::to_vec(&event) {
                    Ok(line) => line,
                    Err(_) => continue,
                };
                line.push(b'\n');
                if s.write_all(&line).is_err() {
                    flag.store(true, Ordering::Relaxed);
                    stream = None;
                    warn!("telemetry write failed; emitter disabled");
                }
            }
            // Channel closed: emitter dropped, thread exits.
        });

        Self { tx, disabled }
    }

    /// Push an event; strictly non-blocking. Full queue or disabled
    /// emitter drops it.
    pub fn emit(&self, event: Value) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        let _ = self.tx.try_send(event);
    }

    /// Whether a delivery failure has permanently disabled the emitter.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
