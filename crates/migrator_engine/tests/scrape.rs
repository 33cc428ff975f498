use std::sync::{Arc, Mutex};

use migrator_core::{MigrationSettings, SourceMode};
use migrator_engine::{
    AssetError, AssetStore, ContentFetcher, Discoverer, FetchSettings, HttpContentFetcher,
    ItemRequest, MigrationError, ReqwestFetcher, SitemapDiscoverer, UploadedAsset, CELL_STYLE,
    HEADER_STYLE, TABLE_CLASS,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITEMAP: &str = r##"<html><body>
<div id="header"><a href="?n=Main.Ignored">not in container</a></div>
<div id="wikitext">
  <ul>
    <li><a href="wiki.php?n=Main.FrontPage">Home</a></li>
    <li><a href="#toc">Contents</a></li>
    <li><a href="Main.Ovens">Ovens</a></li>
    <li><a href="wiki.php?n=Main.FrontPage#top">Home again</a></li>
    <li><a href="">empty</a></li>
  </ul>
</div>
</body></html>"##;

const PAGE: &str = r#"<html><body>
<div id="wikitext"><p>Bread &amp; ovens</p><table><tr><th>Oven</th></tr><tr><td>Clay</td></tr></table><img src="uploads/oven.png" alt="Oven"><img src="/broken.png"></div>
</body></html>"#;

fn settings(base_url: String) -> MigrationSettings {
    MigrationSettings {
        source_mode: SourceMode::Http,
        base_url,
        ..MigrationSettings::default()
    }
}

/// Re-hosts everything except URLs containing "broken".
#[derive(Default)]
struct FakeAssets {
    uploads: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AssetStore for FakeAssets {
    async fn upload(&self, source_url: &str) -> Result<UploadedAsset, AssetError> {
        self.uploads.lock().unwrap().push(source_url.to_string());
        if source_url.contains("broken") {
            return Err(AssetError::InvalidUrl(source_url.to_string()));
        }
        Ok(UploadedAsset {
            id: "1".to_string(),
            url: "https://cdn.example/oven.png".to_string(),
        })
    }
}

async fn serve(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/wiki.php"))
        .and(query_param("n", page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

fn fetcher() -> Arc<ReqwestFetcher> {
    Arc::new(ReqwestFetcher::new(FetchSettings::default()))
}

#[tokio::test]
async fn sitemap_links_become_canonical_page_urls() {
    let server = MockServer::start().await;
    serve(&server, "Site.SiteMap", SITEMAP).await;
    let base = format!("{}/wiki.php", server.uri());

    let discovery = SitemapDiscoverer::new(fetcher())
        .discover(&settings(base.clone()))
        .await
        .expect("discovery ok");

    assert_eq!(
        discovery.identifiers,
        vec![
            format!("{base}?n=Main.FrontPage"),
            format!("{base}?n=Main.Ovens"),
        ]
    );
    assert!(discovery.source_locations.is_empty());
}

#[tokio::test]
async fn unreachable_sitemap_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = SitemapDiscoverer::new(fetcher())
        .discover(&settings(format!("{}/wiki.php", server.uri())))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Source(ref msg) if msg.starts_with("Failed to fetch sitemap")));
}

#[tokio::test]
async fn sitemap_without_container_is_an_error() {
    let server = MockServer::start().await;
    serve(&server, "Site.SiteMap", "<html><body><p>moved</p></body></html>").await;

    let err = SitemapDiscoverer::new(fetcher())
        .discover(&settings(format!("{}/wiki.php", server.uri())))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Content container #wikitext not found in sitemap");
}

#[tokio::test]
async fn page_content_is_styled_and_images_rehosted() {
    let server = MockServer::start().await;
    serve(&server, "Main.Ovens", PAGE).await;
    let base = format!("{}/wiki.php", server.uri());
    let settings = settings(base.clone());
    let assets = Arc::new(FakeAssets::default());
    let content = HttpContentFetcher::new(fetcher(), assets.clone());

    let identifier = format!("{base}?n=Main.Ovens");
    let html = content
        .fetch_content(&ItemRequest {
            identifier: &identifier,
            source_location: None,
            settings: &settings,
        })
        .await
        .expect("scrape ok");

    assert!(html.starts_with("<p>Bread &amp; ovens</p>"));
    assert!(html.contains(&format!("class=\"{TABLE_CLASS}\"")));
    assert!(html.contains(&format!("<th style=\"{HEADER_STYLE}\">Oven</th>")));
    assert!(html.contains(&format!("<td style=\"{CELL_STYLE}\">Clay</td>")));
    assert!(html.contains("<img alt=\"Oven\" src=\"https://cdn.example/oven.png\">"));
    // Failed uploads keep the resolved source URL.
    assert!(html.contains(&format!("<img src=\"{}/broken.png\">", server.uri())));
    assert!(!html.contains("wikitext"));

    assert_eq!(
        *assets.uploads.lock().unwrap(),
        vec![
            format!("{}/uploads/oven.png", server.uri()),
            format!("{}/broken.png", server.uri()),
        ]
    );
}

#[tokio::test]
async fn page_without_container_is_an_error() {
    let server = MockServer::start().await;
    serve(&server, "Main.Empty", "<html><body><div id=\"other\"></div></body></html>").await;
    let base = format!("{}/wiki.php", server.uri());
    let settings = settings(base.clone());
    let content = HttpContentFetcher::new(fetcher(), Arc::new(FakeAssets::default()));

    let identifier = format!("{base}?n=Main.Empty");
    let err = content
        .fetch_content(&ItemRequest {
            identifier: &identifier,
            source_location: None,
            settings: &settings,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Content container #wikitext not found");
}

#[tokio::test]
async fn page_transport_failure_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let base = format!("{}/wiki.php", server.uri());
    let settings = settings(base.clone());
    let content = HttpContentFetcher::new(fetcher(), Arc::new(FakeAssets::default()));

    let identifier = format!("{base}?n=Main.Gone");
    let err = content
        .fetch_content(&ItemRequest {
            identifier: &identifier,
            source_location: None,
            settings: &settings,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Fetch(_)));
}
