//! OpenSearch test infrastructure
//!
//! Provides a `TestOpenSearch` helper that runs a single-node OpenSearch
//! container with the security plugin disabled (plain HTTP, no auth).

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const IMAGE: &str = "opensearchproject/opensearch";
const TAG: &str = "2.15.0";
const HTTP_PORT: u16 = 9200;

/// Test OpenSearch wrapper
///
/// The container is stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestOpenSearch;
///
/// # async fn example() {
/// let search = TestOpenSearch::new().await;
/// println!("OpenSearch at {}:{}", search.host, search.port);
/// # }
/// ```
pub struct TestOpenSearch {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    pub host: String,
    pub port: u16,
}

impl TestOpenSearch {
    pub async fn new() -> Self {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(HTTP_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("started"))
            .with_env_var("discovery.type", "single-node")
            .with_env_var("DISABLE_SECURITY_PLUGIN", "true")
            .with_env_var("DISABLE_INSTALL_DEMO_CONFIG", "true")
            .with_env_var("OPENSEARCH_JAVA_OPTS", "-Xms512m -Xmx512m")
            .start()
            .await
            .expect("Failed to start OpenSearch container");

        let port = container
            .get_host_port_ipv4(HTTP_PORT)
            .await
            .expect("Failed to get OpenSearch port");

        tracing::info!(port, "Test OpenSearch ready ({}:{})", IMAGE, TAG);

        Self {
            container,
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Drop for TestOpenSearch {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test OpenSearch container");
    }
}
