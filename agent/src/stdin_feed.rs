//! Settings feed: each stdin line is the full alarm list as JSON.
//!
//! ```text
//! [{"id":"a","ring_time":"2030-01-01T00:00:00Z"},{"id":"b"}]
//! null
//! ```
//!
//! `null` empties the store. End of input closes the store, which ends the
//! agent's run loop.

use bim_env::{AlarmSnapshot, MemorySettings};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

pub async fn feed(settings: Arc<MemorySettings>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read settings from stdin: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Option<AlarmSnapshot>>(line) {
            Ok(Some(alarms)) => {
                debug!("Settings updated with {} alarms", alarms.len());
                settings.set_alarms(alarms);
            }
            Ok(None) => {
                debug!("Settings cleared");
                settings.clear();
            }
            Err(e) => warn!("Ignoring settings line: {}", e),
        }
    }

    info!("Settings input closed");
    settings.close();
}
