//! Remote execution
//!
//! Runs a suite in another process over TCP: the client sends its run
//! parameters, the server executes against its own suite and streams the
//! result tree back. Frames are length-prefixed JSON elements; the adapter
//! carries no test logic of its own.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use crate::config::{SettingsBag, TestConfiguration, TestFilter};
use crate::context::CancellationToken;
use crate::discovery::HostRegistry;
use crate::executor::{RunError, TestSession};
use crate::models::TestResult;
use crate::suite::TestSuite;
use crate::wire::Element;

/// Guard against a corrupted length prefix.
const MAX_FRAME: u32 = 64 * 1024 * 1024;

/// What the client asks the server to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunParameters {
    /// Client-chosen id correlating logs on both sides.
    pub session: String,
    /// Category to select on the server; `None` keeps the server default.
    pub category: Option<String>,
    /// Overrides the server's default repeat count.
    pub repeat: Option<u32>,
}

impl RunParameters {
    pub fn new() -> Self {
        Self {
            session: format!("{:08x}", rand::random::<u32>()),
            category: None,
            repeat: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = Some(repeat);
        self
    }
}

impl Default for RunParameters {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_frame(stream: &mut TcpStream, element: &Element) -> Result<()> {
    let payload = serde_json::to_vec(element).context("Failed to encode frame")?;
    let len = u32::try_from(payload.len()).context("Frame too large")?;
    stream.write_u32(len).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_frame(stream: &mut TcpStream) -> Result<Element> {
    let len = stream.read_u32().await?;
    if len > MAX_FRAME {
        bail!("frame of {len} bytes exceeds the {MAX_FRAME} byte limit");
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    serde_json::from_slice(&payload).context("Failed to decode frame")
}

/// Serves runs of one suite to remote clients.
pub struct TestServer {
    suite: TestSuite,
    settings: SettingsBag,
    registry: HostRegistry,
    listener: TcpListener,
}

impl TestServer {
    pub async fn bind(
        suite: TestSuite,
        settings: SettingsBag,
        registry: HostRegistry,
        addr: impl ToSocketAddrs,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("Failed to bind server address")?;
        Ok(Self {
            suite,
            settings,
            registry,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the token cancels. Each connection runs on
    /// its own task; a bad peer never takes the server down.
    pub async fn serve(self, token: CancellationToken) -> Result<()> {
        info!("Listening on {}", self.local_addr()?);
        let shared = Arc::new((self.suite, self.settings, self.registry));

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                _ = token.cancelled() => {
                    info!("Server shutting down");
                    return Ok(());
                }
            };
            debug!("Accepted connection from {peer}");

            let shared = shared.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let (suite, settings, registry) = &*shared;
                if let Err(error) =
                    handle_connection(stream, suite, settings, registry, &token).await
                {
                    warn!("Connection from {peer} failed: {error:#}");
                }
            });
        }
    }

    /// Handle exactly one connection, then return.
    pub async fn serve_once(self, token: CancellationToken) -> Result<()> {
        let (stream, peer) = self.listener.accept().await?;
        debug!("Accepted connection from {peer}");
        handle_connection(stream, &self.suite, &self.settings, &self.registry, &token).await
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    suite: &TestSuite,
    settings: &SettingsBag,
    registry: &HostRegistry,
    token: &CancellationToken,
) -> Result<()> {
    let request = read_frame(&mut stream).await?;
    let params = RunParameters::try_from(&request).context("Malformed run request")?;
    info!("Session {}: running {}", params.session, suite.name());

    let mut settings = settings.clone();
    if let Some(repeat) = params.repeat {
        settings.set("repeat", repeat.to_string());
    }
    if let Some(category) = &params.category {
        settings.set("category", category.clone());
    }
    let filter = TestFilter::new(TestConfiguration::from_settings(&settings));

    let session = TestSession::new(suite.clone())
        .with_settings(settings)
        .with_filter(filter)
        .with_registry(registry.clone());

    let response = match session.run(token).await {
        Ok(result) => {
            Element::new("RunResponse")
                .attribute("session", &params.session)
                .attribute("status", "ok")
                .child(Element::from(&result))
        }
        Err(RunError::Aborted { partial }) => Element::new("RunResponse")
            .attribute("session", &params.session)
            .attribute("status", "aborted")
            .child(Element::from(&partial)),
        Err(error) => Element::new("RunResponse")
            .attribute("session", &params.session)
            .attribute("status", "error")
            .attribute("message", error.to_string()),
    };

    write_frame(&mut stream, &response).await
}

/// Outcome of a remote run.
#[derive(Clone, Debug)]
pub struct RemoteOutcome {
    pub result: TestResult,
    /// The server observed a cancellation; `result` is partial.
    pub aborted: bool,
}

/// Client side of the wire protocol.
pub struct RemoteClient {
    stream: TcpStream,
}

impl RemoteClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("Failed to connect to test server")?;
        Ok(Self { stream })
    }

    /// Request one run and decode the returned result tree.
    pub async fn run(&mut self, params: &RunParameters) -> Result<RemoteOutcome> {
        write_frame(&mut self.stream, &Element::from(params)).await?;
        let response = read_frame(&mut self.stream).await?;

        if response.name != "RunResponse" {
            bail!("unexpected response element '{}'", response.name);
        }
        match response.get("status")? {
            "ok" | "aborted" => {
                let aborted = response.attributes.get("status").map(String::as_str)
                    == Some("aborted");
                let result = TestResult::try_from(response.find_child("TestResult")?)
                    .context("Malformed result tree")?;
                Ok(RemoteOutcome { result, aborted })
            }
            "error" => bail!(
                "server failed: {}",
                response.attributes.get("message").cloned().unwrap_or_default()
            ),
            other => bail!("unknown response status '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{FixtureDescriptor, MethodDescriptor, StaticProvider};
    use crate::invokers::test_fn;
    use crate::models::TestStatus;

    fn sample_suite() -> TestSuite {
        let mut provider = StaticProvider::new();
        provider.add(
            FixtureDescriptor::new("math")
                .method(MethodDescriptor::new(
                    "add",
                    test_fn(|_ctx, _token| async { Ok(None) }),
                ))
                .method(MethodDescriptor::new(
                    "overflow",
                    test_fn(|_ctx, _token| async { anyhow::bail!("wrapped") }),
                )),
        );
        TestSuite::discover("unit", &provider)
    }

    #[tokio::test]
    async fn test_remote_run_round_trip() {
        let server = TestServer::bind(
            sample_suite(),
            SettingsBag::new(),
            HostRegistry::new(),
            "127.0.0.1:0",
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let server_task = tokio::spawn(server.serve_once(CancellationToken::new()));

        let mut client = RemoteClient::connect(addr).await.unwrap();
        let outcome = client.run(&RunParameters::new()).await.unwrap();

        assert!(!outcome.aborted);
        assert_eq!(outcome.result.counts().success, 1);
        assert_eq!(outcome.result.counts().errors, 1);
        let leaves = outcome.result.leaves();
        assert_eq!(leaves[0].name().full_name(), "unit.math.add");
        assert_eq!(leaves[0].status(), TestStatus::Success);

        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_remote_repeat_override() {
        let mut provider = StaticProvider::new();
        provider.add(FixtureDescriptor::new("math").method(MethodDescriptor::new(
            "add",
            test_fn(|_ctx, _token| async { Ok(None) }),
        )));
        let suite = TestSuite::discover("unit", &provider);

        let server = TestServer::bind(
            suite,
            SettingsBag::new(),
            HostRegistry::new(),
            "127.0.0.1:0",
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let server_task = tokio::spawn(server.serve_once(CancellationToken::new()));

        let mut client = RemoteClient::connect(addr).await.unwrap();
        let outcome = client
            .run(&RunParameters::new().with_repeat(3))
            .await
            .unwrap();

        assert_eq!(outcome.result.counts().success, 3);
        server_task.await.unwrap().unwrap();
    }
}
