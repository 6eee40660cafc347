// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal-name decoding for negative subprocess return codes.

/// Decode a negative return code to a signal name.
///
/// Returns `None` for zero and positive codes. Unknown signal numbers get
/// the generic `SIG<n>` form.
pub fn decode_signal(returncode: i32) -> Option<String> {
    if returncode >= 0 {
        return None;
    }
    let number = -returncode;
    let name = match number {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        6 => "SIGABRT",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        _ => return Some(format!("SIG{number}")),
    };
    Some(name.to_string())
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
