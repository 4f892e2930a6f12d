#![allow(dead_code, missing_docs, clippy::expect_used)]
use std::path::PathBuf;
use std::sync::Arc;

use mirthbridge_core::{ApiClient, OpenApiRegistry};
use rstest::fixture;
use tracing::info;

#[path = "upstream.rs"]
mod mock_upstream;
pub use self::mock_upstream::*;

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

pub fn openapi_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/openapi.json")
}

pub fn client_for(upstream: &Upstream) -> ApiClient {
    ApiClient::builder()
        .with_base_url(upstream.base_url())
        .with_username(USERNAME)
        .with_password(PASSWORD)
        .build()
        .expect("valid client")
}

#[fixture]
pub fn registry() -> Arc<OpenApiRegistry> {
    init_tracing();
    let registry = OpenApiRegistry::load(openapi_fixture()).expect("valid fixture document");
    Arc::new(registry)
}

#[fixture]
pub async fn upstream() -> Upstream {
    init_tracing();
    match Upstream::start(Behavior::default()).await {
        Ok(upstream) => upstream,
        Err(error) => {
            panic!("fail to start mock upstream: {error:?}");
        }
    }
}
