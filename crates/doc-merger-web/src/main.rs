//! Document Merger Web - HTTP service for merging documents into one PDF.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use clap::Parser;
use doc_merger_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "doc-merger-web")]
#[command(author, version, about = "Document Merger Web Server", long_about = None)]
struct Args {
    /// Host to bind to (overrides config)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chromium/Chrome executable used to render DOCX files
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Build the application router.
fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .route("/api/merge", post(routes::merge_json))
        .route("/api/merge/upload", post(routes::merge_upload))
        .route("/api/formats", get(routes::list_formats))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging with per-crate filtering
    // chromiumoxide logs every CDP message it cannot deserialize, which is
    // expected with newer browsers
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},chromiumoxide=warn")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(chrome) = args.chrome {
        config.render.chrome_executable = Some(chrome);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    let state = Arc::new(AppState::new(config));
    info!(
        "Renderer: {}, markup converter: {}, payload limit: {} bytes",
        state.merger.renderer_name(),
        state.merger.markup_name(),
        state.config.limits.max_payload_bytes
    );

    let app = app(state);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use doc_merger_core::{
        ConvertError, DocxHtmlConverter, HtmlRenderer, Merger, PageDocument, RenderSession,
    };
    use lopdf::dictionary;
    use tower::ServiceExt;

    /// Renderer for tests that never touch DOCX
    struct NoRenderer;

    #[async_trait]
    impl HtmlRenderer for NoRenderer {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn start(&self) -> std::result::Result<Box<dyn RenderSession>, ConvertError> {
            Err(ConvertError::rendering("no renderer in tests"))
        }
    }

    fn test_app(max_payload_bytes: usize) -> Router {
        let mut config = AppConfig::default();
        config.limits.max_payload_bytes = max_payload_bytes;
        let merger = Merger::with_components(Arc::new(NoRenderer), Arc::new(DocxHtmlConverter::new()));
        app(Arc::new(AppState::with_merger(config, merger)))
    }

    fn pdf_bytes(pages: usize) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<lopdf::Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                })
                .into()
            })
            .collect();
        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn json_request(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/merge")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn error_message(response: axum::response::Response) -> String {
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_merge_json_returns_base64_pdf() {
        let body = serde_json::json!({
            "files": [
                { "name": "a.pdf", "content": STANDARD.encode(pdf_bytes(2)) },
                { "name": "b.txt", "content": STANDARD.encode("hello") },
            ]
        });

        let response = test_app(1024 * 1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(response.headers().contains_key(routes::REQUEST_ID_HEADER));

        let encoded = body_bytes(response).await;
        let pdf = STANDARD.decode(encoded).unwrap();
        assert_eq!(PageDocument::from_bytes(&pdf).unwrap().page_count(), 3);
    }

    #[tokio::test]
    async fn test_merge_json_unsupported_is_bad_request() {
        let body = serde_json::json!({
            "files": [{ "name": "sheet.xlsx", "content": STANDARD.encode("x") }]
        });

        let response = test_app(1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = error_message(response).await;
        assert!(message.contains("sheet.xlsx"), "{message}");
    }

    #[tokio::test]
    async fn test_merge_json_empty_list_is_bad_request() {
        let body = serde_json::json!({ "files": [] });
        let response = test_app(1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "no files to merge");
    }

    #[tokio::test]
    async fn test_merge_json_payload_too_large() {
        let body = serde_json::json!({
            "files": [{ "name": "big.txt", "content": STANDARD.encode(vec![b'a'; 2048]) }]
        });
        let response = test_app(1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_merge_json_invalid_base64() {
        let body = serde_json::json!({
            "files": [{ "name": "a.pdf", "content": "***not base64***" }]
        });
        let response = test_app(1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(response).await.starts_with("a.pdf:"));
    }

    #[tokio::test]
    async fn test_merge_json_malformed_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/merge")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"files\": "))
            .unwrap();
        let response = test_app(1024).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        assert!(!error_message(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_docx_rendering_failure_is_server_error() {
        let body = serde_json::json!({
            "files": [{ "name": "letter.docx", "content": STANDARD.encode(docx_bytes()) }]
        });
        let response = test_app(1024 * 1024).oneshot(json_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error_message(response).await.contains("letter.docx"));
    }

    fn docx_bytes() -> Vec<u8> {
        use std::io::Write as _;

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(
            b"<w:document><w:body><w:p><w:r><w:t>Hi</w:t></w:r></w:p></w:body></w:document>",
        )
        .unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_upload_returns_attachment() {
        let boundary = "X-BOUNDARY";
        let mut body = Vec::new();
        for (name, data) in [("first.txt", b"one".to_vec()), ("second.pdf", pdf_bytes(1))] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/merge/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = test_app(1024 * 1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"merged.pdf\""
        );

        let pdf = body_bytes(response).await;
        assert_eq!(PageDocument::from_bytes(&pdf).unwrap().page_count(), 2);
    }

    #[tokio::test]
    async fn test_formats_listing() {
        let request = Request::builder()
            .uri("/api/formats")
            .body(Body::empty())
            .unwrap();
        let response = test_app(4096).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["formats"].as_array().unwrap().len(), 5);
        assert_eq!(body["formats"][2]["format"], "jpeg");
        assert_eq!(body["accept"], ".pdf,.png,.jpg,.jpeg,.txt,.docx");
        assert_eq!(body["max_payload_bytes"], 4096);
    }
}
