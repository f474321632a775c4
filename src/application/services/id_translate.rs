//! Line-by-line identifier translation with retry on transient failures

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::{IdLookup, LookupError};

pub const ERROR_MARKER: &str = "***ERROR***";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateStats {
    pub translated: usize,
    pub failed: usize,
    pub retries: usize,
}

pub struct IdTranslator {
    lookup: Arc<dyn IdLookup>,
    retry_pause: Duration,
}

impl IdTranslator {
    pub fn new(lookup: Arc<dyn IdLookup>, retry_pause: Duration) -> Self {
        Self {
            lookup,
            retry_pause,
        }
    }

    /// Translate each non-empty line of `input`, writing `id\tresult` lines.
    ///
    /// Transient failures are retried without limit; permanent ones are
    /// reported inline and the next line is processed.
    pub fn translate<R: BufRead, W: Write>(&self, input: R, mut output: W) -> ApplicationResult<TranslateStats> {
        let mut stats = TranslateStats::default();

        for line in input.lines() {
            let line = line.with_stream_context("read input")?;
            let id = line.trim();
            if id.is_empty() {
                continue;
            }

            let written = loop {
                match self.lookup.lookup(id) {
                    Ok(result) => {
                        stats.translated += 1;
                        break writeln!(output, "{}\t{}", id, result);
                    }
                    Err(LookupError::Transient(message)) => {
                        stats.retries += 1;
                        warn!("lookup of {} failed ({}), retrying", id, message);
                        std::thread::sleep(self.retry_pause);
                    }
                    Err(LookupError::Permanent(message)) => {
                        stats.failed += 1;
                        debug!("lookup of {} failed permanently: {}", id, message);
                        break writeln!(output, "{}\t{}: {}", id, ERROR_MARKER, message);
                    }
                }
            };
            written.with_stream_context("write output")?;
        }

        Ok(stats)
    }
}
