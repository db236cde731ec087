// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `read` command.

use tracing::debug;

use gauge_core::{PolledValue, PollerConfig, RegisterPoller};

use crate::cli::{Cli, ReadArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::{build_core, CoreComponents};

/// Executes the `read` command: one connect, one poll cycle, print.
pub async fn read(cli: &Cli, args: ReadArgs) -> BinResult<()> {
    let config = gauge_config::load_config_or_default(&cli.config)?;
    let core = build_core(&config)?;

    // Resolve the requested tag before touching the network.
    if let Some(name) = &args.tag {
        let tag = core
            .registry
            .resolve(name)
            .ok_or_else(|| BinError::config(format!("unknown tag: {name}")))?;
        if !tag.polled {
            return Err(BinError::config(format!(
                "tag '{name}' is not polled; one-shot reads cover polled tags only"
            )));
        }
    }

    core.supervisor.start();
    let result = read_once(&core, &config, &args).await;
    core.supervisor.request_disconnect().await;
    core.supervisor.stop();

    result
}

async fn read_once(
    core: &CoreComponents,
    config: &gauge_config::GaugeConfig,
    args: &ReadArgs,
) -> BinResult<()> {
    core.supervisor.request_connect().await?;

    let poller = RegisterPoller::new(
        core.registry.clone(),
        core.supervisor.clone(),
        PollerConfig::new().with_poll_interval(config.poller.poll_interval()),
    );
    let summary = poller.poll_once().await;
    debug!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Poll cycle finished"
    );

    match &args.tag {
        Some(name) => {
            if let Some(value) = poller.latest(name) {
                print_value(&value);
            }
        }
        None => {
            let mut snapshot = poller.snapshot();
            snapshot.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
            for value in &snapshot {
                print_value(value);
            }
        }
    }

    Ok(())
}

fn print_value(value: &PolledValue) {
    let marker = if value.valid { "" } else { " (stale)" };
    match value.tag.unit.as_deref() {
        Some(unit) => println!("{} = {} {}{}", value.tag.name, value.scaled, unit, marker),
        None => println!("{} = {}{}", value.tag.name, value.scaled, marker),
    }
}
