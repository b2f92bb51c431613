// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! A compact logging implementation behind the `log` facade.

use std::{
    io::{Stderr, Write},
    sync::Mutex,
};

use argo_core::{UUID4, time::get_atomic_clock_realtime};
use argo_model::identifiers::TraderId;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};

/// Configuration for the [`Logger`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// The minimum level to write to stderr.
    pub stdout_level: String,
    /// If ANSI colors are applied to the output.
    pub is_colored: bool,
}

impl Default for LoggerConfig {
    /// Creates a new default [`LoggerConfig`] instance.
    fn default() -> Self {
        Self {
            stdout_level: "INFO".to_string(),
            is_colored: true,
        }
    }
}

/// A logger writing colored, timestamped lines to stderr.
pub struct Logger {
    trader_id: TraderId,
    level: LevelFilter,
    is_colored: bool,
    out: Mutex<Stderr>,
}

impl Logger {
    fn level_color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[91m",
            Level::Warn => "\x1b[93m",
            Level::Info => "\x1b[92m",
            Level::Debug => "\x1b[96m",
            Level::Trace => "\x1b[90m",
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let ts = get_atomic_clock_realtime()
            .get_time_ns()
            .to_datetime_utc()
            .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        let line = if self.is_colored {
            format!(
                "{}{} [{}] {}.{}: {}\x1b[0m\n",
                Self::level_color(record.level()),
                ts,
                record.level(),
                self.trader_id,
                record.target(),
                record.args(),
            )
        } else {
            format!(
                "{} [{}] {}.{}: {}\n",
                ts,
                record.level(),
                self.trader_id,
                record.target(),
                record.args(),
            )
        };

        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}

/// Initializes the global logger for the process.
///
/// # Errors
///
/// Returns an error if the configured level is invalid or a logger has
/// already been set.
pub fn init_logging(
    trader_id: TraderId,
    instance_id: UUID4,
    config: LoggerConfig,
) -> anyhow::Result<()> {
    let level: LevelFilter = config
        .stdout_level
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {e}", config.stdout_level))?;

    let logger = Logger {
        trader_id,
        level,
        is_colored: config.is_colored,
        out: Mutex::new(std::io::stderr()),
    };

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {e}"))?;
    log::set_max_level(level);

    log::info!("Logging initialized for instance {instance_id}");
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.stdout_level, "INFO");
        assert!(config.is_colored);
    }

    #[rstest]
    fn test_invalid_level_rejected() {
        let config = LoggerConfig {
            stdout_level: "LOUD".to_string(),
            ..LoggerConfig::default()
        };
        let result = init_logging(TraderId::default(), UUID4::new(), config);
        assert!(result.is_err());
    }
}
