// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::env;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use yc_logging::config::{EnvConfigSource, PluginConfig};
use yc_logging::event::Event;
use yc_logging::logger;
use yc_logging::plugin::OutputPlugin;
use yc_logging::PluginId;

const DEFAULT_FLUSH_INTERVAL: u64 = 5;
const DEFAULT_BATCH_SIZE: usize = 500;
const DEFAULT_TAG: &str = "stdin";

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {key}=`{value}`");
            default
        }),
        Err(_) => default,
    }
}

async fn flush(plugin: &mut OutputPlugin) {
    if let Err(e) = plugin.flush().await {
        warn!("Flush failed, {} events kept for the next attempt: {e}", plugin.len());
    }
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("YC_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    if let Err(e) = logger::init(&log_level) {
        eprintln!("Unable to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let flush_interval = Duration::from_secs(env_or("YC_FLUSH_INTERVAL", DEFAULT_FLUSH_INTERVAL).max(1));
    let batch_size: usize = env_or("YC_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1);
    let tag = env::var("YC_TAG").unwrap_or_else(|_| DEFAULT_TAG.to_string());

    let id = PluginId(0);
    let mut plugin = match PluginConfig::from_source(&EnvConfigSource, id.0)
        .and_then(|config| OutputPlugin::new(id, &config))
    {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Shipping stdin every {flush_interval:?} or {batch_size} events");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => flush(&mut plugin).await,
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    plugin.add_event(Event::from_json_line(&line, tag.as_str()));
                    if plugin.len() >= batch_size {
                        debug!("Batch size reached");
                        flush(&mut plugin).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Unable to read stdin: {e}");
                    break;
                }
            },
        }
    }

    flush(&mut plugin).await;
    if plugin.is_empty() {
        ExitCode::SUCCESS
    } else {
        error!("Exiting with {} unsent events", plugin.len());
        ExitCode::FAILURE
    }
}
