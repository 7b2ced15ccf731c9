pub mod redirect;
pub mod shorten;

#[cfg(test)]
mod tests {
    use crate::{app, config::AppConfig, models::ShortenResponse, store::UrlStore, AppState};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    const BASE_URL: &str = "http://localhost:8080";

    fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            base_url: BASE_URL.into(),
            data_file: dir.path().join("data.json"),
            shutdown_grace: Duration::from_secs(5),
        };
        Arc::new(AppState {
            store: UrlStore::new(&config.data_file),
            config,
        })
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/shorten")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// POST a URL and return the short id from the response.
    async fn shorten(router: &Router, url: &str) -> String {
        let resp = router
            .clone()
            .oneshot(post_json(&format!(r#"{{"url": "{url}"}}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: ShortenResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        body.short_url
            .strip_prefix(&format!("{BASE_URL}/"))
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(test_state(&dir));

        let resp = router.oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn shorten_then_redirect_counts_clicks() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = app(state.clone());

        let id = shorten(&router, "https://example.com").await;
        assert_eq!(id.len(), crate::id::SHORT_ID_LEN);

        for expected_clicks in 1..=2u64 {
            let resp = router.clone().oneshot(get(&format!("/{id}"))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FOUND);
            assert_eq!(
                resp.headers().get(header::LOCATION).unwrap(),
                "https://example.com"
            );

            // Clicks are only written out at shutdown; save to inspect them.
            state.store.save().await.unwrap();
            let on_disk: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(state.store.path()).unwrap())
                    .unwrap();
            assert_eq!(on_disk[&id]["click"], expected_clicks);
        }
    }

    #[tokio::test]
    async fn shorten_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = app(state.clone());

        let id = shorten(&router, "https://example.com/persisted").await;

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(state.store.path()).unwrap()).unwrap();
        assert_eq!(on_disk[&id]["url"], "https://example.com/persisted");
        assert_eq!(on_disk[&id]["click"], 0);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(test_state(&dir));

        let resp = router.oneshot(get("/zzzzzz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "URL not found");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(test_state(&dir));

        for body in ["not json", "{}", r#"{"url": 42}"#] {
            let resp = router.clone().oneshot(post_json(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(body_string(resp).await, "invalid request body");
        }
    }

    #[tokio::test]
    async fn json_body_accepted_without_json_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = app(state.clone());

        for content_type in [None, Some("application/x-www-form-urlencoded")] {
            let mut req = Request::builder().method("POST").uri("/shorten");
            if let Some(ct) = content_type {
                req = req.header(header::CONTENT_TYPE, ct);
            }
            let req = req
                .body(Body::from(r#"{"url":"https://example.com"}"#))
                .unwrap();

            let resp = router.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "content type: {content_type:?}");

            let body: ShortenResponse = serde_json::from_str(&body_string(resp).await).unwrap();
            let id = body.short_url.rsplit('/').next().unwrap().to_owned();
            assert_eq!(state.store.resolve(&id).await.unwrap(), "https://example.com");
        }
    }

    #[tokio::test]
    async fn invalid_url_is_400_and_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = app(state.clone());

        for url in ["", "   ", "ftp://example.com", "example.com"] {
            let resp = router
                .clone()
                .oneshot(post_json(&format!(r#"{{"url": "{url}"}}"#)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "url: {url:?}");
        }

        // Nothing created, so nothing saved.
        assert!(!state.store.path().exists());
    }

    #[tokio::test]
    async fn failed_save_still_returns_short_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            base_url: BASE_URL.into(),
            data_file: dir.path().join("missing").join("data.json"),
            shutdown_grace: Duration::from_secs(5),
        };
        let state = Arc::new(AppState {
            store: UrlStore::new(&config.data_file),
            config,
        });
        let router = app(state);

        let id = shorten(&router, "https://example.com").await;

        let resp = router.oneshot(get(&format!("/{id}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn loaded_records_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("data.json"),
            r#"{"Ab3dE9": {"url": "https://example.com", "click": 4}}"#,
        )
        .unwrap();
        let state = test_state(&dir);
        state.store.load().await.unwrap();
        let router = app(state.clone());

        let resp = router.oneshot(get("/Ab3dE9")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.com"
        );

        state.store.save().await.unwrap();
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(state.store.path()).unwrap()).unwrap();
        assert_eq!(on_disk["Ab3dE9"]["click"], 5);
    }
}
