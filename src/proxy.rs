use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::logger::log_request;
use crate::relay::ImageRelay;
use crate::url_mapper::{ImageReference, IMAGE_PREFIX};
use crate::view::Presenter;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub presenter: Presenter,
    pub relay: ImageRelay,
}

pub struct ProxyServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl ProxyServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        info!("Creating new proxy server on {}", addr);
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let state = self.state.clone();
        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let remote_addr = conn.remote_addr();
            debug!("New connection from: {}", remote_addr);
            let state = state.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(handle_request(&state, req).await) }
                }))
            }
        });

        let server = Server::try_bind(&self.addr)
            .map_err(|e| RelayError::Config(format!("cannot bind {}: {}", self.addr, e)))?
            .serve(make_svc)
            .with_graceful_shutdown(shutdown);
        info!("Proxy server listening on {}", self.addr);

        server
            .await
            .map_err(|e| RelayError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}

#[tracing::instrument(skip(state, req), fields(method = %req.method(), path = %req.uri().path()))]
pub async fn handle_request(state: &AppState, req: Request<Body>) -> Response<Body> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match route(state, req).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Request failed: {}", e);
            error_response(&e)
        }
    };

    log_request(&method, &path, response.status(), started.elapsed());
    response
}

async fn route(state: &AppState, req: Request<Body>) -> Result<Response<Body>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match (&method, segments.as_slice()) {
        (&Method::GET, [""]) => {
            let id = state.presenter.random_id().await?;
            Ok(redirect(&format!("/pokemon/{}", id)))
        }
        (&Method::GET, ["pokemon", id]) => {
            let id = parse_id(id)?;
            json_response(&state.presenter.species(id).await?)
        }
        (&Method::GET, ["quiz"]) => {
            let id = state.presenter.random_id().await?;
            json_response(&state.presenter.quiz(id, None).await?)
        }
        (&Method::POST, ["quiz"]) => {
            let body = hyper::body::to_bytes(req.into_body())
                .await
                .map_err(|e| RelayError::InvalidArgument(format!("unreadable body: {}", e)))?;
            let form = QuizForm::parse(&body);
            match form.pokeid {
                Some(id) if id > 0 => json_response(&state.presenter.quiz(id, Some(&form.answer)).await?),
                _ => Ok(redirect("/quiz")),
            }
        }
        (&Method::GET, [prefix, ..]) if *prefix == IMAGE_PREFIX.trim_start_matches('/') => {
            let reference = ImageReference::from_local_path(&path)?;
            let image = state.relay.relay(&reference).await?;
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, image.content_type())
                .body(Body::from(image.body))
                .map_err(|e| RelayError::Internal(e.to_string()))
        }
        _ => Ok(plain(StatusCode::NOT_FOUND, "not found")),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct QuizForm {
    pokeid: Option<u64>,
    answer: String,
}

impl QuizForm {
    fn parse(body: &[u8]) -> Self {
        let mut form = QuizForm::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "pokeid" => form.pokeid = value.trim().parse().ok(),
                "answer" => form.answer = value.into_owned(),
                _ => {}
            }
        }
        form
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| RelayError::InvalidArgument(format!("not a species id: {}", raw)))
}

fn json_response<T: Serialize>(value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_vec(value).map_err(|e| RelayError::Internal(e.to_string()))?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_default())
}

fn redirect(location: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .body(Body::empty())
        .unwrap_or_default()
}

fn plain(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = status;
    response
}

fn error_response(err: &RelayError) -> Response<Body> {
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    Response::builder()
        .status(err.status_code())
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::catalog::{CatalogClient, DEFAULT_CATALOG_URL};
    use crate::loader::testing::FakeFetcher;
    use crate::loader::Loader;
    use crate::random::FixedRandom;
    use crate::view::LocalePreferences;
    use serde_json::json;

    fn state() -> (Arc<FakeFetcher>, AppState) {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.serve_json("https://pokeapi.co/api/v2/pokemon-species", json!({ "count": 10 }));
        fetcher.serve_json(
            "https://pokeapi.co/api/v2/pokemon-species/3",
            json!({ "names": [ { "language": { "name": "en" }, "name": "Venusaur" } ] }),
        );
        fetcher.serve_json("https://pokeapi.co/api/v2/pokemon/3", json!({ "types": [] }));
        fetcher.serve("https://img.example.com/a/b/3.png", "png-bytes");

        let loader = Loader::new(Arc::new(MemoryStore::new()), fetcher.clone());
        let relay = ImageRelay::new(loader.clone());
        let catalog = CatalogClient::new(DEFAULT_CATALOG_URL, loader).unwrap();
        let presenter = Presenter::new(
            catalog,
            relay.clone(),
            Arc::new(FixedRandom(2)),
            LocalePreferences::default(),
        );
        (fetcher, AppState { presenter, relay })
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_unserializable_body_is_server_error() {
        // JSON object keys must be strings.
        let mut map = std::collections::HashMap::new();
        map.insert((1u8, 2u8), 3u8);

        let err = json_response(&map).unwrap_err();
        assert!(matches!(err, RelayError::Internal(_)));
        assert_eq!(
            error_response(&err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_root_redirects_to_random_species() {
        let (_, state) = state();
        let response = handle_request(&state, get("/")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/pokemon/3");
    }

    #[tokio::test]
    async fn test_species_json() {
        let (_, state) = state();
        let response = handle_request(&state, get("/pokemon/3")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["name"], "Venusaur");
        assert_eq!(json["prev_id"], 2);
        assert_eq!(json["next_id"], 4);
        assert!(json["sprite"].is_null());
    }

    #[tokio::test]
    async fn test_bad_species_id() {
        let (_, state) = state();
        let response = handle_request(&state, get("/pokemon/abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handle_request(&state, get("/pokemon/9")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_image_relay_route() {
        let (fetcher, state) = state();
        let response = handle_request(&state, get("/img/https/img.example.com/a/b/3.png")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"png-bytes");
        assert_eq!(fetcher.calls("https://img.example.com/a/b/3.png"), 1);
    }

    #[tokio::test]
    async fn test_image_relay_rejects_unknown_extension() {
        let (fetcher, state) = state();
        let response = handle_request(&state, get("/img/https/img.example.com/a/b/3.exe")).await;

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_quiz_post() {
        let (_, state) = state();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/quiz")
            .body(Body::from("pokeid=3&answer=Venusaur"))
            .unwrap();
        let response = handle_request(&state, req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["correct"], true);
        assert_eq!(json["answer"], "Venusaur");
        assert!(json.get("name").is_none());
    }

    #[tokio::test]
    async fn test_quiz_post_without_id_redirects() {
        let (_, state) = state();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/quiz")
            .body(Body::from("answer=x"))
            .unwrap();
        let response = handle_request(&state, req).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/quiz");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_, state) = state();
        let response = handle_request(&state, get("/private/secret")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_quiz_form_parsing() {
        let form = QuizForm::parse(b"pokeid=25&answer=%E3%83%94%E3%82%AB%E3%83%81%E3%83%A5%E3%82%A6");
        assert_eq!(form.pokeid, Some(25));
        assert_eq!(form.answer, "ピカチュウ");

        assert_eq!(QuizForm::parse(b"pokeid=abc").pokeid, None);
    }
}
