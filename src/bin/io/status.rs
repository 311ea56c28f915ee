// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::{stdout, Write};

use tracing::info;

const STATUS_SIZE: usize = 45;

/// Prints an interactive status message, overwriting the previous one
pub(crate) fn interactive(status: &str) {
    let fill = " ".repeat(STATUS_SIZE.saturating_sub(status.len()));
    print!("\r{}{}\r", status, fill);
    // best effort
    let _ = stdout().flush();
}

/// Logs the status message at info level
pub(crate) fn headless(status: &str) {
    info!("{}", status)
}
