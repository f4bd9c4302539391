use heron_core::prelude::*;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, instrument, warn};

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const READY_POLL: Duration = Duration::from_millis(100);
const CONNECT_PROBE: Duration = Duration::from_millis(500);

/// A `websocat` process listening on a local TCP port and forwarding every
/// connection to the remote SSH-over-WebSocket endpoint.
///
/// The child is killed when the bridge is dropped.
pub struct WebsocatBridge {
    program: PathBuf,
    endpoint: String,
    header: String,
    bind_host: String,
    startup_timeout: Duration,
    child: Option<Child>,
    port: Option<u16>,
}

impl WebsocatBridge {
    pub fn new(program: impl Into<PathBuf>, endpoint: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            endpoint: endpoint.into(),
            header: header.into(),
            bind_host: "127.0.0.1".to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            child: None,
            port: None,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(&config.bridge_bin, config.endpoint_url(), config.auth_header())
    }

    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    /// Listen address, `127.0.0.1` unless changed.
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Command-line arguments for a bridge on `local_port`.
    pub fn args(&self, local_port: u16) -> Vec<String> {
        vec![
            "--binary".to_string(),
            format!("-H={}", self.header),
            format!("tcp-l:{}:{local_port}", self.bind_host),
            self.endpoint.clone(),
        ]
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Fails unless `port` can be bound on the listen address right now, so a
    /// later successful probe can only be answered by our own child.
    fn ensure_port_free(&self, port: u16) -> Result<(), BridgeError> {
        std::net::TcpListener::bind((self.bind_host.as_str(), port))
            .map(drop)
            .map_err(|source| BridgeError::PortInUse { port, source })
    }

    fn check_alive(&mut self) -> Result<(), BridgeError> {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.child = None;
                    return Err(BridgeError::Exited(status.to_string()));
                }
                Ok(None) => {}
                Err(err) => warn!("could not poll bridge process: {err}"),
            }
        }
        Ok(())
    }

    async fn wait_ready(&mut self, port: u16) -> Result<(), BridgeError> {
        let deadline = Instant::now().checked_add(self.startup_timeout);
        loop {
            self.check_alive()?;

            if probe(port).await {
                return self.check_alive();
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(BridgeError::Timeout {
                    port,
                    timeout_ms: self.startup_timeout.as_millis() as u64,
                });
            }
            sleep(READY_POLL).await;
        }
    }
}

async fn probe(port: u16) -> bool {
    matches!(
        timeout(CONNECT_PROBE, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

impl Bridge for WebsocatBridge {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn start(&mut self, local_port: u16) -> Result<(), BridgeError> {
        if self.child.is_some() {
            debug!("bridge already running");
            return Ok(());
        }

        self.ensure_port_free(local_port)?;

        let child = Command::new(&self.program)
            .args(self.args(local_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        self.child = Some(child);

        if let Err(err) = self.wait_ready(local_port).await {
            if let Err(stop_err) = self.stop().await {
                warn!("cleanup after failed start: {stop_err}");
            }
            return Err(err);
        }

        self.port = Some(local_port);
        info!(port = local_port, "bridge ready");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BridgeError> {
        self.port = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "bridge already exited");
                Ok(())
            }
            _ => {
                child.kill().await.map_err(BridgeError::Stop)?;
                info!("bridge stopped");
                Ok(())
            }
        }
    }

    async fn is_ready(&self) -> bool {
        match (self.child.as_ref(), self.port) {
            (Some(_), Some(port)) => probe(port).await,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(program: &str) -> WebsocatBridge {
        WebsocatBridge::new(
            program,
            "wss://compute.example.com/nb/u-1/default/api/ssh-over-ws",
            "cookie: psk=s3cret",
        )
        .with_startup_timeout(Duration::from_secs(2))
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn args_follow_websocat_syntax() {
        assert_eq!(
            bridge("websocat").args(2222),
            vec![
                "--binary",
                "-H=cookie: psk=s3cret",
                "tcp-l:127.0.0.1:2222",
                "wss://compute.example.com/nb/u-1/default/api/ssh-over-ws",
            ]
        );
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let mut bridge = bridge("websocat");
        bridge.stop().await.unwrap();
        bridge.stop().await.unwrap();
        assert!(!bridge.is_ready().await);
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let mut bridge = bridge("/definitely/not/a/websocat");
        let err = bridge.start(free_port()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Spawn { .. }));
        assert!(err.to_string().starts_with("Bridge failed to start"));
    }

    /// Writes an executable stand-in for websocat.
    fn fake_bridge(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const LISTENER: &str = r#"#!/usr/bin/env perl
use IO::Socket::INET;
my ($addr) = grep { /^tcp-l:/ } @ARGV;
$addr =~ s/^tcp-l://;
my $server = IO::Socket::INET->new(LocalAddr => $addr, Listen => 5, ReuseAddr => 1) or die "bind: $!";
while (my $client = $server->accept) { close $client }
"#;

    #[tokio::test]
    async fn occupied_port_is_refused_before_spawning() {
        let foreign = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = foreign.local_addr().unwrap().port();

        // `false` would exit at once; the foreign listener must not mask that.
        let mut bridge = bridge("false");
        let err = bridge.start(port).await.unwrap_err();

        assert!(matches!(err, BridgeError::PortInUse { port: p, .. } if p == port));
        assert!(err.to_string().starts_with("Bridge failed to start"));
        assert!(bridge.child.is_none());
        assert!(!bridge.is_ready().await);
    }

    #[tokio::test]
    async fn silent_bridge_times_out_and_is_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_bridge(dir.path(), "sleeper", "#!/bin/sh\nexec sleep 30\n");

        let mut bridge = WebsocatBridge::new(program, "wss://x/ws", "cookie: k=v")
            .with_startup_timeout(Duration::from_millis(500));
        let err = bridge.start(free_port()).await.unwrap_err();

        assert!(matches!(err, BridgeError::Timeout { timeout_ms: 500, .. }));
        assert!(bridge.child.is_none());
        assert!(bridge.port().is_none());
    }

    #[tokio::test]
    async fn listening_bridge_becomes_ready_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_bridge(dir.path(), "listener", LISTENER);
        let port = free_port();

        let mut bridge = WebsocatBridge::new(program, "wss://x/ws", "cookie: k=v")
            .with_startup_timeout(Duration::from_secs(10));
        bridge.start(port).await.unwrap();

        assert_eq!(bridge.port(), Some(port));
        assert!(bridge.is_ready().await);

        bridge.stop().await.unwrap();
        assert!(!bridge.is_ready().await);
        assert!(bridge.child.is_none());
    }

    #[tokio::test]
    async fn early_exit_is_reported() {
        // `false` ignores its arguments and exits 1 immediately.
        let mut bridge = bridge("false");
        let err = bridge.start(free_port()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Exited(_)));
        assert!(!bridge.is_ready().await);
        bridge.stop().await.unwrap();
    }
}
