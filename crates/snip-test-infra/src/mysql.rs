use crate::{Result, TestInfraError};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;
const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Credentials and image settings for [`MySqlServer`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "snip".to_string(), setter(into))]
    database: String,
    #[builder(default = "snip".to_string(), setter(into))]
    username: String,
    #[builder(default = "snip".to_string(), setter(into))]
    password: String,
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
    /// Upper bound on waiting for the mapped port to accept connections.
    #[builder(default = Duration::from_secs(60))]
    startup_timeout: Duration,
}

/// A disposable MySQL server holding an empty database.
///
/// The DSN is resolved once at startup. The container is removed when the
/// value is dropped, so keep it alive for as long as the test uses the DSN.
pub struct MySqlServer {
    _container: ContainerAsync<GenericImage>,
    host: String,
    port: u16,
    dsn: String,
}

impl MySqlServer {
    pub async fn start(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(MYSQL_PORT).await?;
        wait_for_port(&host, port, config.startup_timeout).await?;

        let dsn = format!(
            "mysql://{}:{}@{}:{}/{}",
            config.username, config.password, host, port, config.database
        );

        Ok(Self {
            _container: container,
            host,
            port,
            dsn,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `mysql://` DSN for the test database.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

/// Polls until `host:port` accepts a TCP connection or `timeout` elapses.
async fn wait_for_port(host: &str, port: u16, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;

    loop {
        if TcpStream::connect((host, port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(TestInfraError::NotReady {
                addr: format!("{host}:{port}"),
                timeout,
            });
        }
        sleep(PROBE_INTERVAL).await;
    }
}
