use anyhow::{bail, Context, Result};
use serde::Serialize;
use smsbridge_core_types::Reply;

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

/// Print the reply body, or the error payload and fail the command.
pub fn print_reply(reply: Reply, pretty: bool) -> Result<()> {
    match reply {
        Ok(payload) => print_json(&payload, pretty),
        Err(err) => {
            print_json(&err.payload(), pretty)?;
            bail!("request failed with {}: {}", err.code(), err)
        }
    }
}
