//! Test server management.
//!
//! Spawns and manages amcpd instances for integration testing.

use std::process::{Child, Command};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::sleep;

/// A test server instance. The process is killed and its data directory
/// removed on drop.
pub struct TestServer {
    child: Child,
    port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a server with two PAL channels and no lock clear phrase.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(None).await
    }

    /// Spawn a server with a configured `LOCK CLEAR` override phrase.
    pub async fn spawn_with(lock_clear_phrase: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let port = free_port()?;

        let lock_section = match lock_clear_phrase {
            Some(phrase) => format!("[lock]\nclear_phrase = \"{phrase}\"\n"),
            None => String::new(),
        };
        let config_content = format!(
            r#"
[server]
name = "amcpd-test"

[listen]
address = "127.0.0.1:{port}"

[data]
path = "{data}/data"

[log]
level = "debug"

{lock_section}
[[channel]]
video_mode = "PAL"

[[channel]]
video_mode = "720p50"
"#,
            data = data_dir.path().display(),
        );

        let config_path = data_dir.path().join("config.toml");
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_amcpd"))
            .arg(&config_path)
            .spawn()?;

        let server = Self { child, port, _data_dir: data_dir };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&format!("127.0.0.1:{}", self.port)).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Ask the OS for a currently free TCP port.
fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
