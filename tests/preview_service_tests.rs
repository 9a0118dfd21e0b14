mod common;

use common::{MockFetcher, Route};
use link_card::{
    FetchError, PreviewError, PreviewResponse, PreviewService, PreviewServiceConfig,
    DEFAULT_MAX_BODY_BYTES,
};
use std::sync::Arc;

const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
const TWITTER_OEMBED: &str = "https://publish.twitter.com/oembed";

fn service(fetcher: &Arc<MockFetcher>) -> PreviewService {
    PreviewService::with_fetcher(fetcher.clone())
}

#[tokio::test]
async fn test_invalid_urls_never_touch_the_network() {
    let fetcher = Arc::new(MockFetcher::new());
    let service = service(&fetcher);

    let inputs = [
        "example.com",
        "not a url",
        "mailto:someone@example.com",
        "/just/a/path",
        "",
        "http:example.com",
        "https:/example.com/page",
        r"http:\\example.com",
    ];
    for url in inputs {
        let result = service.generate_preview(url).await;
        assert!(matches!(result, Err(PreviewError::InvalidUrl)), "{url}");
    }
    assert!(fetcher.calls().is_empty());

    let response = PreviewResponse::from_result(service.generate_preview("example.com").await, "example.com");
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"error":"Invalid URL"}"#
    );
}

#[tokio::test]
async fn test_open_graph_beats_fallbacks_in_any_order() {
    let url = "https://news.example.com/story";
    let html = r#"<html><head>
        <meta name="twitter:title" content="Card title">
        <meta name="twitter:description" content="Card description">
        <title>Plain title</title>
        <meta property="og:title" content="OG title">
        <meta property="og:description" content="OG description">
        <meta name="description" content="Meta description">
    </head><body></body></html>"#;
    let fetcher = Arc::new(MockFetcher::new().route(url, Route::html(html)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "OG title");
    assert_eq!(metadata.description, "OG description");
}

#[tokio::test]
async fn test_plain_title_and_meta_description_fallbacks() {
    let url = "https://plain.example.com/";
    let html = r#"<html><head>
        <title>
            Plain &amp; simple
        </title>
        <meta name="description" content="Only a meta description">
        <meta name="twitter:description" content="Later card description">
    </head></html>"#;
    let fetcher = Arc::new(MockFetcher::new().route(url, Route::html(html)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Plain & simple");
    assert_eq!(metadata.description, "Only a meta description");
    assert_eq!(metadata.kind, "website");
    assert_eq!(metadata.site_name, "plain.example.com");
    assert_eq!(metadata.url, url);
    assert_eq!(metadata.favicon, "https://plain.example.com/favicon.ico");
    assert_eq!(metadata.image, "");
    assert_eq!(metadata.author, None);
    assert_eq!(metadata.video_id, None);
}

#[tokio::test]
async fn test_redirects_resolve_against_final_url_but_keep_request_url() {
    let url = "http://short.example/abc";
    let final_url = "https://www.landing.example.org/articles/2024/post.html";
    let html = r#"<html><head>
        <meta property="og:image" content="images/cover.jpg">
        <link rel="icon" href="/static/favicon.png" sizes="32x32">
    </head></html>"#;
    let fetcher = Arc::new(
        MockFetcher::new().route(url, Route::html(html).redirected_to(final_url)),
    );

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.request_url, url);
    assert_eq!(metadata.url, url);
    assert_eq!(
        metadata.image,
        "https://www.landing.example.org/articles/2024/images/cover.jpg"
    );
    assert_eq!(
        metadata.favicon,
        "https://www.landing.example.org/static/favicon.png"
    );
    assert_eq!(metadata.site_name, "www.landing.example.org");
    assert_eq!(fetcher.calls(), vec![url.to_string()]);
}

#[tokio::test]
async fn test_default_favicon_comes_from_final_origin() {
    let url = "https://old.example.com/page";
    let fetcher = Arc::new(MockFetcher::new().route(
        url,
        Route::html("<html><head><title>No icons</title></head></html>")
            .redirected_to("https://new.example.net:8443/moved/page"),
    ));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.favicon, "https://new.example.net:8443/favicon.ico");
    assert_eq!(metadata.request_url, url);
}

#[tokio::test]
async fn test_canonical_url_and_best_favicon() {
    let url = "https://shop.example.com/item?id=7&utm_source=x";
    let html = r#"<html><head>
        <link rel="shortcut icon" href="/favicon.ico">
        <link rel="icon" type="image/png" sizes="512x512" href="/icon-512.png">
        <link rel="icon" type="image/png" sizes="96x96" href="/icon-96.png">
        <meta property="og:url" content="https://shop.example.com/item/7">
        <meta property="og:type" content="product">
        <meta property="og:site_name" content="Example Shop">
    </head></html>"#;
    let fetcher = Arc::new(MockFetcher::new().route(url, Route::html(html)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.url, "https://shop.example.com/item/7");
    assert_eq!(metadata.request_url, url);
    assert_eq!(metadata.kind, "product");
    assert_eq!(metadata.site_name, "Example Shop");
    assert_eq!(metadata.favicon, "https://shop.example.com/icon-96.png");
}

#[tokio::test]
async fn test_pdf_is_rejected_without_metadata() {
    let url = "https://files.example.com/report.pdf";
    let fetcher = Arc::new(MockFetcher::new().route(
        url,
        Route::Page {
            final_url: String::new(),
            content_type: "application/pdf".to_string(),
            body: b"%PDF-1.7".to_vec(),
        },
    ));

    let result = service(&fetcher).generate_preview(url).await;
    assert!(matches!(result, Err(PreviewError::NotHtml)));

    let response = PreviewResponse::from_result(result, url);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({ "error": "Not an HTML page" })
    );
    assert!(fetcher.read_limits().is_empty());
}

#[tokio::test]
async fn test_missing_content_type_is_not_html() {
    let url = "https://example.com/blob";
    let fetcher = Arc::new(MockFetcher::new().route(
        url,
        Route::Page {
            final_url: String::new(),
            content_type: String::new(),
            body: b"<html></html>".to_vec(),
        },
    ));

    let result = service(&fetcher).generate_preview(url).await;
    assert!(matches!(result, Err(PreviewError::NotHtml)));
}

#[tokio::test]
async fn test_transport_errors_are_structured() {
    let missing = "https://example.com/missing";
    let down = "https://down.example.com/";
    let fetcher = Arc::new(
        MockFetcher::new()
            .route(missing, Route::Fail(FetchError::HttpStatus(404)))
            .route(
                down,
                Route::Fail(FetchError::ConnectionFailure("connection refused".into())),
            ),
    );
    let service = service(&fetcher);

    let response = PreviewResponse::from_result(service.generate_preview(missing).await, missing);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({ "error": "HTTP 404", "url": missing, "request_url": missing })
    );

    let response = PreviewResponse::from_result(service.generate_preview(down).await, down);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({
            "error": "Connection failed: connection refused",
            "url": down,
            "request_url": down
        })
    );
}

#[tokio::test]
async fn test_body_read_is_capped() {
    let url = "https://big.example.com/";
    let mut html = String::from("<html><head><title>Big</title></head><body>");
    html.push_str(&"x".repeat(DEFAULT_MAX_BODY_BYTES));
    let fetcher = Arc::new(MockFetcher::new().route(url, Route::html(&html)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Big");
    assert_eq!(fetcher.read_limits(), vec![500 * 1024]);

    let fetcher = Arc::new(MockFetcher::new().route(url, Route::html(&html)));
    let service = PreviewService::new_with_config(
        PreviewServiceConfig::new()
            .with_max_body_bytes(16)
            .with_fetcher(fetcher.clone()),
    );
    let metadata = service.generate_preview(url).await.unwrap();
    assert_eq!(fetcher.read_limits(), vec![16]);
    assert_eq!(metadata.request_url, url);
}

#[tokio::test]
async fn test_invalid_utf8_is_replaced() {
    let url = "https://latin1.example.com/";
    let mut body = b"<html><head><title>Caf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"</title></head></html>");
    let fetcher = Arc::new(MockFetcher::new().route(
        url,
        Route::Page {
            final_url: String::new(),
            content_type: "text/html; charset=iso-8859-1".to_string(),
            body,
        },
    ));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Caf\u{FFFD}");
}

#[tokio::test]
async fn test_youtube_uses_oembed_and_skips_page() {
    let url = "https://youtu.be/dQw4w9WgXcQ";
    let oembed = r#"{"title":"Never Gonna Give You Up","author_name":"Rick Astley",
        "thumbnail_url":"https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"}"#;
    let fetcher = Arc::new(MockFetcher::new().route_prefix(YOUTUBE_OEMBED, Route::json(oembed)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Never Gonna Give You Up");
    assert_eq!(metadata.description, "Rick Astley");
    assert_eq!(metadata.kind, "video");
    assert_eq!(metadata.site_name, "YouTube");
    assert_eq!(metadata.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(
        metadata.image,
        "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
    );
    assert_eq!(metadata.request_url, url);

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with(YOUTUBE_OEMBED));
    assert!(calls[0].contains("dQw4w9WgXcQ"));
    assert!(calls[0].contains("format=json"));
}

#[tokio::test]
async fn test_youtube_watch_and_short_links_share_an_id() {
    let oembed = r#"{"title":"Video","author_name":"Channel","thumbnail_url":""}"#;
    let fetcher = Arc::new(MockFetcher::new().route_prefix(YOUTUBE_OEMBED, Route::json(oembed)));
    let service = service(&fetcher);

    let short = service.generate_preview("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
    let watch = service
        .generate_preview("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .await
        .unwrap();
    assert_eq!(short.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(watch.video_id.as_deref(), Some("dQw4w9WgXcQ"));

    let calls = fetcher.calls();
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test]
async fn test_malformed_youtube_link_falls_through_to_scraping() {
    let url = "https://youtu.be/dQw4w9WgX";
    let html = r#"<html><head><meta property="og:title" content="YouTube"></head></html>"#;
    let fetcher = Arc::new(
        MockFetcher::new()
            .route_prefix(YOUTUBE_OEMBED, Route::json("{}"))
            .route(url, Route::html(html)),
    );

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "YouTube");
    assert_eq!(metadata.kind, "website");
    assert_eq!(metadata.video_id, None);
    assert_eq!(fetcher.calls(), vec![url.to_string()]);
}

#[tokio::test]
async fn test_failed_oembed_falls_through_to_scraping() {
    let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    let html = r#"<html><head><title>Fallback</title></head></html>"#;
    let fetcher = Arc::new(
        MockFetcher::new()
            .route_prefix(YOUTUBE_OEMBED, Route::Fail(FetchError::HttpStatus(401)))
            .route(url, Route::html(html)),
    );

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Fallback");
    assert_eq!(metadata.site_name, "www.youtube.com");
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn test_twitter_uses_oembed() {
    let url = "https://x.com/rustlang/status/1784580013434544395";
    let oembed = r#"{"author_name":"Rust Language",
        "html":"<blockquote><p>Rust 1.78.0 is out</p>&mdash; Rust Language (@rustlang)</blockquote>"}"#;
    let fetcher = Arc::new(MockFetcher::new().route_prefix(TWITTER_OEMBED, Route::json(oembed)));

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Rust Language");
    assert_eq!(metadata.description, "Rust 1.78.0 is out— Rust Language (@rustlang)");
    assert_eq!(metadata.site_name, "X (Twitter)");
    assert_eq!(metadata.kind, "article");
    assert_eq!(metadata.author.as_deref(), Some("Rust Language"));
    assert_eq!(metadata.video_id, None);
    assert_eq!(metadata.url, url);
    assert_eq!(metadata.request_url, url);

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("https://publish.twitter.com/oembed?url=https%3A%2F%2Fx.com"));
}

#[tokio::test]
async fn test_twitter_non_json_falls_through() {
    let url = "https://twitter.com/rustlang";
    let fetcher = Arc::new(
        MockFetcher::new()
            .route_prefix(TWITTER_OEMBED, Route::html("<html>rate limited</html>"))
            .route(url, Route::html("<title>Rust on X</title>")),
    );

    let metadata = service(&fetcher).generate_preview(url).await.unwrap();
    assert_eq!(metadata.title, "Rust on X");
    assert_eq!(metadata.author, None);
}

#[cfg(feature = "logging")]
mod error_logging {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_generic_failure_is_logged_once() {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let url = "https://example.com/missing";
        let fetcher =
            Arc::new(MockFetcher::new().route(url, Route::Fail(FetchError::HttpStatus(404))));

        let result = service(&fetcher).generate_preview(url).await;
        assert!(matches!(result, Err(PreviewError::HttpStatus(404))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
