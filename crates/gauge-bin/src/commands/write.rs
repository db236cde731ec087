// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `write` command.

use gauge_core::{WriteGateway, WriteValue};

use crate::cli::{Cli, WriteArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::{build_core, CoreComponents};

/// Executes the `write` command: one connect, one gated write.
pub async fn write(cli: &Cli, args: WriteArgs) -> BinResult<()> {
    let config = gauge_config::load_config_or_default(&cli.config)?;
    let core = build_core(&config)?;

    // Parse the value up front so an unparsable input never connects.
    let value = parse_write_value(&args.value)?;

    core.supervisor.start();
    let result = write_once(&core, &args.tag, value).await;
    core.supervisor.request_disconnect().await;
    core.supervisor.stop();

    result?;
    println!("✓ Wrote {} to {}", args.value, args.tag);
    Ok(())
}

async fn write_once(core: &CoreComponents, tag: &str, value: WriteValue) -> BinResult<()> {
    core.supervisor.request_connect().await?;

    let gateway = WriteGateway::new(core.registry.clone(), core.supervisor.clone());
    gateway.write(tag, value).await?;
    Ok(())
}

/// Parses the CLI value string into a gateway write value.
///
/// `true`/`false`/`on`/`off` become booleans, a comma-separated list
/// becomes a word block, anything else must parse as a number.
fn parse_write_value(input: &str) -> BinResult<WriteValue> {
    let trimmed = input.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "on" => return Ok(WriteValue::Bool(true)),
        "false" | "off" => return Ok(WriteValue::Bool(false)),
        _ => {}
    }

    if trimmed.contains(',') {
        let words = trimmed
            .split(',')
            .map(|part| part.trim().parse::<u16>())
            .collect::<Result<Vec<u16>, _>>()
            .map_err(|_| BinError::config(format!("cannot parse '{input}' as a word list")))?;
        return Ok(WriteValue::Words(words));
    }

    trimmed
        .parse::<f64>()
        .map(WriteValue::Number)
        .map_err(|_| BinError::config(format!("cannot parse '{input}' as a value")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booleans() {
        assert_eq!(parse_write_value("true").unwrap(), WriteValue::Bool(true));
        assert_eq!(parse_write_value("ON").unwrap(), WriteValue::Bool(true));
        assert_eq!(parse_write_value("false").unwrap(), WriteValue::Bool(false));
        assert_eq!(parse_write_value("off").unwrap(), WriteValue::Bool(false));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_write_value("42").unwrap(), WriteValue::Number(42.0));
        assert_eq!(
            parse_write_value(" 3.5 ").unwrap(),
            WriteValue::Number(3.5)
        );
    }

    #[test]
    fn test_parse_word_lists() {
        assert_eq!(
            parse_write_value("1, 2, 3").unwrap(),
            WriteValue::Words(vec![1, 2, 3])
        );
        assert!(parse_write_value("1,x,3").is_err());
        assert!(parse_write_value("1,99999").is_err());
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(parse_write_value("maybe").is_err());
        assert!(parse_write_value("").is_err());
    }
}
