//! Helper process bridge
//!
//! Spawns the helper, forwards every stdout/stderr chunk as it arrives, and
//! reports the exit code once both streams have closed.

use bytes::BytesMut;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::SpawnError;

use super::{HelperEvent, HelperMessage};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Which pipe a chunk came from
#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// One running helper process
#[derive(Debug)]
pub struct HelperSession {
    id: Uuid,
}

impl HelperSession {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Spawns helper processes and relays their output to the presentation layer
#[derive(Clone)]
pub struct HelperBridge {
    tx: mpsc::UnboundedSender<HelperMessage>,
}

impl HelperBridge {
    pub fn new(tx: mpsc::UnboundedSender<HelperMessage>) -> Self {
        Self { tx }
    }

    /// Launch `executable` with the inherited environment plus `env`.
    ///
    /// Launch failures are returned here and no session is created.
    pub fn spawn(
        &self,
        executable: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<HelperSession, SpawnError> {
        let mut child = Command::new(executable)
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| SpawnError::Launch {
                path: executable.to_path_buf(),
                source,
            })?;

        let id = Uuid::new_v4();
        info!("Helper {} started: {:?} (pid {:?})", id, executable, child.id());

        let stdout = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, Stream::Stdout, id, self.tx.clone())));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, Stream::Stderr, id, self.tx.clone())));

        tokio::spawn(supervise(
            child,
            executable.to_path_buf(),
            id,
            [stdout, stderr],
            self.tx.clone(),
        ));

        Ok(HelperSession { id })
    }
}

/// Splits a byte stream into UTF-8 text chunks, one per read where possible.
///
/// A multibyte character cut off at the end of a read is held back until the
/// rest arrives. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Chunks;

impl Decoder for Utf8Chunks {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let complete = match std::str::from_utf8(&buf[..]) {
            Ok(_) => buf.len(),
            Err(e) => match e.error_len() {
                // Incomplete sequence at the end
                None => e.valid_up_to(),
                Some(invalid) => e.valid_up_to() + invalid,
            },
        };

        if complete == 0 {
            return Ok(None);
        }

        let chunk = buf.split_to(complete);
        Ok(Some(String::from_utf8_lossy(&chunk).into_owned()))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(chunk) = self.decode(buf)? {
            return Ok(Some(chunk));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        // Truncated character at EOF
        let rest = buf.split();
        Ok(Some(String::from_utf8_lossy(&rest).into_owned()))
    }
}

/// Forward chunks from one pipe until EOF or a read error
async fn pump<R>(
    pipe: R,
    stream: Stream,
    session: Uuid,
    tx: mpsc::UnboundedSender<HelperMessage>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunks = FramedRead::with_capacity(pipe, Utf8Chunks, READ_CHUNK_SIZE);

    while let Some(chunk) = chunks.next().await {
        let text = match chunk {
            Ok(text) => text,
            Err(e) => {
                debug!("Helper {} {:?} read failed: {}", session, stream, e);
                break;
            }
        };

        let event = match stream {
            Stream::Stdout => HelperEvent::Output(text),
            Stream::Stderr => HelperEvent::Error(text),
        };

        // Keep draining even if nobody listens so the child never blocks on a full pipe
        let _ = tx.send(HelperMessage { session, event });
    }
}

/// Wait for both pumps, then the exit status, then send `Close` exactly once
async fn supervise(
    mut child: Child,
    executable: PathBuf,
    session: Uuid,
    pumps: [Option<JoinHandle<()>>; 2],
    tx: mpsc::UnboundedSender<HelperMessage>,
) {
    for pump in pumps.into_iter().flatten() {
        let _ = pump.await;
    }

    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            error!("Failed to wait for helper {:?}: {}", executable, e);
            None
        }
    };

    info!("Helper {} exited with code {:?}", session, code);
    let _ = tx.send(HelperMessage {
        session,
        event: HelperEvent::Close(code),
    });
}

#[cfg(test)]
mod decoder_tests {
    use super::*;

    #[test]
    fn test_split_character_is_held_until_complete() {
        let mut decoder = Utf8Chunks;
        // "aé" with the second byte of 'é' still in flight
        let mut buf = BytesMut::from(&[b'a', 0xC3][..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), Some("a".to_string()));
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&[0xA9, b'b']);
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some("éb".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_invalid_bytes_are_replaced_in_place() {
        let mut decoder = Utf8Chunks;
        let mut buf = BytesMut::from(&[b'a', 0xFF, b'b'][..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), Some("a\u{FFFD}".to_string()));
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_truncated_character_at_eof_is_flushed() {
        let mut decoder = Utf8Chunks;
        let mut buf = BytesMut::from(&[0xE2, 0x82][..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert_eq!(decoder.decode_eof(&mut buf).unwrap(), Some("\u{FFFD}".to_string()));
        assert_eq!(decoder.decode_eof(&mut buf).unwrap(), None);
    }
}
