//! ==============================================================================
//! transport.rs - line source for the ingest loop
//! ==============================================================================
//!
//! purpose:
//! ```text
//! opens the serial port the radio bridge (JeeLink) is plugged into and
//! feeds each complete line to the ingest pipeline, strictly in order.
//! ```
//!
//! notes:
//! ```text
//! - the bridge occasionally emits garbage bytes after a reset, so lines are
//!   decoded lossily instead of failing on invalid utf-8.
//! - a read error ends the loop; main.rs treats that as fatal and exits so a
//!   supervisor can restart the hub.
//! - a line is buffered up to MAX_LINE bytes. anything longer (a bridge stuck
//!   without newlines) is skipped through to the next newline.
//! ```
//!
//! ==============================================================================

use crate::config::SerialConfig;
use crate::error::TransportError;
use crate::ingest::Ingest;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// longest line buffered, newline included
pub const MAX_LINE: usize = 1024;

/// open the radio bridge, 8N1 with no flow control
pub fn open_serial(cfg: &SerialConfig) -> Result<BufReader<SerialStream>, TransportError> {
    let port = tokio_serial::new(&cfg.port, cfg.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|source| TransportError::Open {
            port: cfg.port.clone(),
            source,
        })?;

    tracing::info!(port = %cfg.port, baud = cfg.baud_rate, "serial port open");
    Ok(BufReader::new(port))
}

/// feed every line from `reader` to `ingest` until end of stream
///
/// returns the number of lines read.
pub async fn run_lines<R>(mut reader: R, ingest: &Ingest) -> Result<u64, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    let mut count = 0u64;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(count);
        }
        count += 1;

        if read == MAX_LINE && buf.last() != Some(&b'\n') {
            let skipped = discard_line(&mut reader).await?;
            tracing::warn!(bytes = read + skipped, "line too long, skipping");
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        ingest.handle_line(line);
    }
}

/// consume input up to and including the next newline, without buffering it
async fn discard_line<R>(reader: &mut R) -> Result<usize, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(skipped);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        skipped += used;
        if done {
            return Ok(skipped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NodeId, SensorId};
    use crate::publish::{self, LogPublisher};
    use crate::store::HistoryStore;
    use crate::validation::ValidationGate;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_lines_until_eof() {
        let (queue, _worker) = publish::spawn_worker(Arc::new(LogPublisher), 16);
        let store = Arc::new(HistoryStore::new(20).unwrap());
        let ingest = Ingest::new(store.clone(), ValidationGate::default(), queue);

        let input: &[u8] = b"[RF12demo.12] _ i1 g212 @ 868 MHz\r\n\
                             heathack 2 1 1 18.5\r\n\
                             heathack 2 1 1 \xff\xfe\r\n\
                             heathack 2 1 1 19.0";
        let lines = run_lines(input, &ingest).await.unwrap();
        assert_eq!(lines, 4);

        let node = store.node(&NodeId::from("2")).unwrap();
        let sensor = node.sensor(&SensorId::from("1")).unwrap();
        assert_eq!(store.history(&sensor).collect::<Vec<_>>(), vec![18.5, 19.0]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_skipped() {
        let (queue, _worker) = publish::spawn_worker(Arc::new(LogPublisher), 16);
        let store = Arc::new(HistoryStore::new(20).unwrap());
        let ingest = Ingest::new(store.clone(), ValidationGate::default(), queue);

        let mut input = b"heathack 2 1 1 18.5\n".to_vec();
        // looks like a frame so it would be stored if it were truncated
        input.extend_from_slice(b"heathack 2 1 1 30 ");
        input.extend(std::iter::repeat(b'7').take(5000));
        input.extend_from_slice(b"\nheathack 2 1 1 19.0\n");

        let lines = run_lines(input.as_slice(), &ingest).await.unwrap();
        assert_eq!(lines, 3);

        let node = store.node(&NodeId::from("2")).unwrap();
        let sensor = node.sensor(&SensorId::from("1")).unwrap();
        assert_eq!(store.history(&sensor).collect::<Vec<_>>(), vec![18.5, 19.0]);
    }

    #[tokio::test]
    async fn test_line_at_the_limit_is_kept() {
        let (queue, _worker) = publish::spawn_worker(Arc::new(LogPublisher), 16);
        let store = Arc::new(HistoryStore::new(20).unwrap());
        let ingest = Ingest::new(store.clone(), ValidationGate::default(), queue);

        let mut line = b"heathack 2 1 1 18.5".to_vec();
        line.resize(MAX_LINE - 1, b' ');
        line.push(b'\n');
        assert_eq!(run_lines(line.as_slice(), &ingest).await.unwrap(), 1);

        let node = store.node(&NodeId::from("2")).unwrap();
        let sensor = node.sensor(&SensorId::from("1")).unwrap();
        assert_eq!(store.current(&sensor), Some(18.5));
    }

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let cfg = SerialConfig {
            port: "/dev/does-not-exist-heathack".to_string(),
            baud_rate: 9600,
        };
        assert!(matches!(open_serial(&cfg), Err(TransportError::Open { .. })));
    }
}
