// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The APRS-IS client (C10, §4.10): connect, log in, drain the send
//! queue, reconnect on failure with a fixed backoff. Generic over the
//! transport so tests can run against an in-memory duplex instead of a
//! real socket.

use crate::config::IsClientConfig;
use crate::counters::IsClientCounters;
use crate::login::build_login_line;
use crate::queue::IsQueue;
use crate::sink::IsClientSink;
use crate::state::IsClientState;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct IsClient {
    config: IsClientConfig,
    queue: IsQueue,
    counters: IsClientCounters,
    state: Mutex<IsClientState>,
}

impl IsClient {
    pub fn new(config: IsClientConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            queue: IsQueue::new(),
            counters: IsClientCounters::default(),
            state: Mutex::new(IsClientState::Connecting),
        })
    }

    pub fn queue(&self) -> &IsQueue {
        &self.queue
    }

    pub fn counters(&self) -> &IsClientCounters {
        &self.counters
    }

    pub fn state(&self) -> IsClientState {
        self.state.lock().unwrap().clone()
    }

    /// A [`GatewaySink`](aprs_gateway::GatewaySink) handle the gateway
    /// service can hold without depending on this crate's internals.
    pub fn sink(self: &Arc<Self>) -> IsClientSink {
        IsClientSink(self.clone())
    }

    fn set_state(&self, state: IsClientState) {
        tracing::debug!(?state, "aprs-is client state transition");
        *self.state.lock().unwrap() = state;
    }

    /// Drives the connect/login/send loop against a real TCP socket until
    /// `cancel` fires. Honors §4.10 step 1: disabled or missing
    /// credentials short-circuits without ever touching the network.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if let Some(reason) = self.config.disabled_reason() {
            self.set_state(IsClientState::Disabled(reason));
            return;
        }

        while !cancel.is_cancelled() {
            self.set_state(IsClientState::Connecting);
            match TcpStream::connect((self.config.host.as_str(), self.config.port)).await {
                Ok(stream) => {
                    if let Err(err) = self.clone().serve(stream, cancel.clone()).await {
                        self.counters.incr_errors();
                        self.set_state(IsClientState::Error(err.to_string()));
                        tracing::warn!(%err, "aprs-is connection lost");
                    }
                }
                Err(err) => {
                    self.counters.incr_errors();
                    self.set_state(IsClientState::Error(err.to_string()));
                    tracing::warn!(%err, "aprs-is connect failed");
                }
            }

            if cancel.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// Logs in over `transport` and serves it until disconnection,
    /// cancellation, or a write error.
    async fn serve<T>(self: Arc<Self>, transport: T, cancel: CancellationToken) -> std::io::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (read_half, mut write_half) = split(transport);
        self.set_state(IsClientState::Connected);

        let login = build_login_line(
            &self.config.callsign_with_ssid(),
            &self.config.passcode,
            &self.config.software_name,
            &self.config.software_version,
            self.config.filter.as_deref(),
        );
        write_half.write_all(login.as_bytes()).await?;
        write_half.write_all(b"\r\n").await?;

        let reader = tokio::spawn(Self::reader_loop(read_half));
        let result = self.writer_loop(&mut write_half, &cancel).await;
        reader.abort();
        result
    }

    async fn writer_loop<T>(
        &self,
        write_half: &mut WriteHalf<T>,
        cancel: &CancellationToken,
    ) -> std::io::Result<()>
    where
        T: AsyncWrite + Unpin,
    {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let (item, dropped) = self.queue.pop_ready().await;
            for _ in 0..dropped {
                self.counters.incr_dropped();
            }

            match item {
                Some(item) => {
                    write_half.write_all(item.line.as_bytes()).await?;
                    write_half.write_all(b"\r\n").await?;
                    self.counters.incr_sent();
                }
                None => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = self.queue.wait_for_item() => {}
                        _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                    }
                }
            }
        }
    }

    /// Drains the server's input stream. APRS-IS servers send periodic
    /// comment lines and login acknowledgements that this client has no
    /// use for today; this loop exists only to notice disconnection.
    async fn reader_loop<T>(mut read_half: ReadHalf<T>)
    where
        T: AsyncRead + Unpin,
    {
        let mut buf = [0u8; 1024];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IsClientConfig;
    use aprs_gateway::{GatewaySink, QueueItem};
    use tokio::io::AsyncReadExt as _;

    fn config() -> IsClientConfig {
        IsClientConfig {
            enabled: true,
            igate_callsign: "BG6ABC".to_string(),
            igate_ssid: 10,
            passcode: "12345".to_string(),
            ..IsClientConfig::default()
        }
    }

    #[tokio::test]
    async fn disabled_config_never_reaches_connecting() {
        let client = IsClient::new(IsClientConfig::default());
        let cancel = CancellationToken::new();
        client.clone().run(cancel).await;
        assert!(client.state().is_disabled());
    }

    #[tokio::test]
    async fn serve_sends_login_line_then_queued_items() {
        let client = IsClient::new(config());
        let (device_end, client_end) = tokio::io::duplex(4096);
        let cancel = CancellationToken::new();

        client.sink().enqueue(QueueItem {
            line: "BG6ABC>APRS:>status".to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(60),
        });
        // enqueue() spawns; give it a tick to land in the queue.
        tokio::task::yield_now().await;

        let serve_task = tokio::spawn(client.clone().serve(client_end, cancel.clone()));

        let mut device_end = device_end;
        let mut buf = vec![0u8; 256];
        let n = device_end.read(&mut buf).await.unwrap();
        let received = String::from_utf8_lossy(&buf[..n]);
        assert!(received.starts_with("user BG6ABC-10 pass 12345 vers"));

        cancel.cancel();
        serve_task.await.unwrap().unwrap();
        assert!(client.state().is_connected());
    }
}
