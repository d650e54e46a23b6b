use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use device_savings_api::{Server, test_utils::TestServerBuilder};
use serde_json::Value;
use tower::ServiceExt;

/// Router plus the server state behind it
pub struct TestHarness {
    #[allow(dead_code)]
    pub server: Server,
    pub app: Router,
}

impl TestHarness {
    /// Loaded mock data, fixed clock at 2023-06-01
    #[allow(dead_code)]
    pub async fn new() -> Self {
        Self::from_builder(TestServerBuilder::new()).await
    }

    #[allow(dead_code)]
    pub async fn from_builder(builder: TestServerBuilder) -> Self {
        let server = builder.build().await;
        let app = server.create_app();
        Self { server, app }
    }

    /// Issue a GET and decode the JSON body
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}
