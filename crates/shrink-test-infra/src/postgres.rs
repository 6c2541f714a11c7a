use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const POSTGRES_PORT: u16 = 5432;
const READY_LINE: &str = "database system is ready to accept connections";

/// Credentials and image of a throwaway PostgreSQL instance.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresConfig {
    #[builder(default = "16-alpine".to_string(), setter(into))]
    tag: String,
    #[builder(default = "shrink".to_string(), setter(into))]
    database: String,
    #[builder(default = "shrink".to_string(), setter(into))]
    username: String,
    #[builder(default = "shrink".to_string(), setter(into))]
    password: String,
}

impl PostgresConfig {
    fn dsn(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:{}@{host}:{port}/{}",
            self.username, self.password, self.database
        )
    }
}

/// A running PostgreSQL container and the DSN pointing at it.
///
/// The official image restarts the server once after running its init
/// scripts, so the first connection attempt may still be refused.
pub struct PostgresServer {
    container: ContainerAsync<GenericImage>,
    database_url: String,
}

impl PostgresServer {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let container = GenericImage::new("postgres", config.tag.as_str())
            .with_exposed_port(POSTGRES_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_LINE))
            .with_env_var("POSTGRES_DB", config.database.as_str())
            .with_env_var("POSTGRES_USER", config.username.as_str())
            .with_env_var("POSTGRES_PASSWORD", config.password.as_str())
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(POSTGRES_PORT).await?;
        let database_url = config.dsn(&host, port);

        Ok(Self {
            container,
            database_url,
        })
    }

    /// Starts a server with the default credentials.
    pub async fn start() -> Result<Self> {
        Self::new(PostgresConfig::builder().build()).await
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
