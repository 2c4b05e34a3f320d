//! `cargo xtask decode`: turn captured notifications back into a report.

use anyhow::{anyhow, bail, Context, Result};
use bluetooth::{Command, ResponseAssembler};
use colored::Colorize;
use diagnostics::{decode_store, DecodedStore};

/// A decoded crash-info response.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// `GetNumResets`: the record count.
    Count(u8),
    /// `GetAllResetData`: the store, or `None` when it was empty.
    Store(Option<DecodedStore>),
}

pub fn run(notifications: &[String]) -> Result<()> {
    let chunks = notifications
        .iter()
        .enumerate()
        .map(|(i, text)| parse_hex(text).with_context(|| format!("notification {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;

    match decode(&chunks)? {
        Decoded::Count(count) => {
            println!("{}", format!("{count} crash record(s) stored").cyan().bold());
        }
        Decoded::Store(None) => println!("{}", "no crash records".green()),
        Decoded::Store(Some(store)) => {
            println!("{}", "Crash report".cyan().bold());
            println!("{store}");
        }
    }
    Ok(())
}

/// Parse one notification. Whitespace, `:` and a `0x` prefix are ignored.
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    Ok(hex::decode(digits)?)
}

/// Reassemble `chunks` and decode the payload.
pub fn decode(chunks: &[Vec<u8>]) -> Result<Decoded> {
    let mut assembler = ResponseAssembler::new();
    let mut complete = false;
    for (i, chunk) in chunks.iter().enumerate() {
        if complete {
            bail!("{} notification(s) after the response completed", chunks.len() - i);
        }
        complete = assembler
            .push(chunk)
            .map_err(|err| anyhow!("notification {}: {err}", i + 1))?;
    }
    if !complete {
        bail!("response incomplete after {} bytes", assembler.received());
    }

    let payload = assembler.payload().unwrap_or(&[]);
    match assembler.command() {
        Some(Command::GetNumResets) => match payload {
            [count] => Ok(Decoded::Count(*count)),
            _ => bail!("GetNumResets payload must be one byte, got {}", payload.len()),
        },
        Some(Command::GetAllResetData) => decode_store(payload)
            .map(Decoded::Store)
            .map_err(|err| anyhow!("{err}")),
        None => bail!("response header missing"),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use bluetooth::Response;
    use diagnostics::{CrashStore, FaultHandlerKind};

    #[test]
    fn test_parse_hex_accepts_collector_formats() {
        assert_eq!(parse_hex("0x02000100 01").unwrap(), vec![2, 0, 1, 0, 1]);
        assert_eq!(parse_hex("02:00:01:00:01").unwrap(), vec![2, 0, 1, 0, 1]);
        assert!(parse_hex("0g").is_err());
    }

    #[test]
    fn test_decode_count() {
        let chunks = vec![vec![0x02, 0x00, 0x01, 0x00, 0x03]];
        assert_eq!(decode(&chunks).unwrap(), Decoded::Count(3));
    }

    #[test]
    fn test_decode_empty_store() {
        let chunks = vec![vec![0x01, 0x00, 0x00, 0x00]];
        assert_eq!(decode(&chunks).unwrap(), Decoded::Store(None));
    }

    #[test]
    fn test_decode_store_split_across_notifications() {
        let mut store = CrashStore::new();
        store.begin_record(FaultHandlerKind::HardFault).unwrap();
        let response = Response::build(Command::GetAllResetData, &store).unwrap();
        let chunks: Vec<Vec<u8>> = response.as_bytes().chunks(20).map(<[u8]>::to_vec).collect();
        assert!(chunks.len() > 1);

        let Decoded::Store(Some(decoded)) = decode(&chunks).unwrap() else {
            panic!("expected a store");
        };
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].handler, FaultHandlerKind::HardFault);
    }

    #[test]
    fn test_decode_rejects_truncated_response() {
        let chunks = vec![vec![0x02, 0x00, 0x01, 0x00]];
        assert!(decode(&chunks).is_err());
    }
}
