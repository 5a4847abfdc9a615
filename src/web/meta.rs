//! The resolution handler: repository path → redirect or Go meta tags.
//!
//! The first path segment names a repository. Resolution consults the
//! configured overrides, then the live cache, then falls back to HEAD-probing
//! each org's candidate URL in precedence order; a probe hit is written back
//! into the live cache so the next request is served from memory.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use html_escape::encode_double_quoted_attribute;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Where `?go-get=1` requests are meta-refreshed to for documentation.
const DOCS_URL: &str = "https://pkg.go.dev";

#[derive(Debug, Deserialize)]
pub(super) struct MetaParams {
    #[serde(rename = "go-get", default)]
    go_get: Option<String>,
}

enum Resolution {
    Found(String),
    NotFound,
    ProbeFailed(reqwest::Error),
}

pub(super) async fn get_meta(
    State(state): State<AppState>,
    Query(params): Query<MetaParams>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let repo_path = uri.path().trim_start_matches('/');
    let Some(repo_name) = repo_path.split('/').next().filter(|s| !s.is_empty()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let location = match resolve(&state, repo_name).await {
        Resolution::Found(location) => location,
        Resolution::NotFound => {
            info!(repo = repo_name, "repository not found in any listed org");
            return StatusCode::NOT_FOUND.into_response();
        }
        Resolution::ProbeFailed(e) => {
            warn!(repo = repo_name, error = %e, "org probe failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !is_no_redirect_agent(&state.config.no_redirect_agents, user_agent) {
        // `go get` expects an HTML redirect to the docs site; everything
        // else gets a plain HTTP redirect to the repository.
        if params.go_get.as_deref() == Some("1") {
            let target = format!("{DOCS_URL}/{}/{repo_path}", state.config.import_prefix);
            info!(target = %target, "meta refresh for go-get client");
            return Html(format!(
                r#"<meta http-equiv="refresh" content="0; url={}">"#,
                encode_double_quoted_attribute(&target)
            ))
            .into_response();
        }
        info!(location = %location, "redirecting");
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    // Tooling agents get the import location as meta tags instead of a
    // redirect they may refuse to follow.
    let import_path = format!("{}/{repo_name}", state.config.import_prefix);
    let go_import = format!("{import_path} git {location}");
    let go_source = format!("{import_path} _ {location}");
    debug!(content = %go_import, "serving go-import meta");
    Html(format!(
        "<meta name=\"go-import\" content=\"{}\">\n<meta name=\"go-source\" content=\"{}\">\n",
        encode_double_quoted_attribute(&go_import),
        encode_double_quoted_attribute(&go_source),
    ))
    .into_response()
}

async fn resolve(state: &AppState, repo_name: &str) -> Resolution {
    if let Some(location) = state.config.overrides.get(repo_name) {
        return Resolution::Found(location.clone());
    }

    if let Some(location) = state.cache.lookup(repo_name) {
        return Resolution::Found(location);
    }

    // Cache miss: probe each org's candidate URL in precedence order.
    for org in &state.config.orgs {
        let candidate = format!(
            "{}/{org}/{repo_name}",
            state.config.github_url.trim_end_matches('/')
        );
        match state.probe.head(&candidate).send().await {
            Ok(response) if response.status().as_u16() < 400 => {
                debug!(location = %candidate, "repository found by probe");
                state.cache.add(repo_name, &candidate);
                return Resolution::Found(candidate);
            }
            Ok(_) => continue,
            Err(e) => return Resolution::ProbeFailed(e),
        }
    }

    Resolution::NotFound
}

fn is_no_redirect_agent(agents: &[String], user_agent: &str) -> bool {
    agents.iter().any(|agent| user_agent.contains(agent.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocationCache;
    use crate::config::Config;
    use crate::github::GithubApi;
    use crate::state::ServiceStatusRegistry;
    use crate::web::create_router;
    use axum::Router;
    use axum::body::Body;
    use http::Request;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const BROWSER_UA: &str = "Mozilla/5.0";
    const TOOLING_UA: &str = "GoDocBot/1.1 (crawler)";

    fn test_config() -> Config {
        Config {
            port: 0,
            log_level: "debug".to_owned(),
            import_prefix: "code.example.org".to_owned(),
            orgs: Vec::new(),
            overrides: HashMap::new(),
            no_redirect_agents: vec!["GoDocBot".to_owned()],
            github_url: "https://github.com".to_owned(),
            github_api_url: "https://api.github.com".to_owned(),
            github_api_key: None,
            refresh_interval_secs: 600,
            cache_ttl_secs: 3600,
            per_page: 100,
        }
    }

    fn test_state(config: Config) -> AppState {
        AppState {
            github: Arc::new(
                GithubApi::new(&config.github_api_url, None, config.per_page).unwrap(),
            ),
            cache: Arc::new(LocationCache::new(Duration::from_secs(3600))),
            config: Arc::new(config),
            probe: reqwest::Client::new(),
            service_statuses: ServiceStatusRegistry::new(),
        }
    }

    async fn send(router: Router, uri: &str, user_agent: &str) -> http::Response<Body> {
        router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::USER_AGENT, user_agent)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_string(response: http::Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn a_configured_override_redirects_without_probing() {
        let mut config = test_config();
        config.overrides.insert(
            "special".to_owned(),
            "https://elsewhere.example.org/special".to_owned(),
        );
        let router = create_router(test_state(config));

        let response = send(router, "/special", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://elsewhere.example.org/special"
        );
    }

    #[tokio::test]
    async fn a_cached_repository_redirects() {
        let state = test_state(test_config());
        state
            .cache
            .add("something", "https://github.com/org-a/something");
        let router = create_router(state);

        let response = send(router, "/something", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://github.com/org-a/something"
        );
    }

    #[tokio::test]
    async fn go_get_requests_get_a_meta_refresh_to_the_docs_site() {
        let state = test_state(test_config());
        state
            .cache
            .add("something", "https://github.com/org-a/something");
        let router = create_router(state);

        let response = send(router, "/something/sub/pkg?go-get=1", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(
            "url=https://pkg.go.dev/code.example.org/something/sub/pkg"
        ));
    }

    #[tokio::test]
    async fn no_redirect_agents_get_import_and_source_meta_tags() {
        let state = test_state(test_config());
        state
            .cache
            .add("something", "https://github.com/org-a/something");
        let router = create_router(state);

        let response = send(router, "/something", TOOLING_UA).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(
            "<meta name=\"go-import\" content=\"code.example.org/something git https://github.com/org-a/something\">"
        ));
        assert!(body.contains(
            "<meta name=\"go-source\" content=\"code.example.org/something _ https://github.com/org-a/something\">"
        ));
    }

    #[tokio::test]
    async fn an_unknown_repository_is_not_found() {
        // No overrides, empty cache, and no orgs to probe.
        let router = create_router(test_state(test_config()));
        let response = send(router, "/missing", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn the_root_path_is_not_found() {
        let router = create_router(test_state(test_config()));
        let response = send(router, "/", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_redirect_agent_matching_is_substring_based() {
        let agents = vec!["GoDocBot".to_owned()];
        assert!(is_no_redirect_agent(&agents, TOOLING_UA));
        assert!(!is_no_redirect_agent(&agents, BROWSER_UA));
        assert!(!is_no_redirect_agent(&[], TOOLING_UA));
    }
}
