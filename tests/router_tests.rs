//! End-to-end tests: manifest router, page registry and dispatch controller together.

use async_trait::async_trait;
use bytes::Bytes;
use ssr_lambda::http::{GatewayRequest, Method, ResponseWriter};
use ssr_lambda::manifest::{BuildManifest, Fallback, Manifests, PrerenderManifest, RoutesManifest};
use ssr_lambda::page::PageState;
use ssr_lambda::prelude::*;
use ssr_lambda::proxy::{ExternalRewriter, ProxyError};
use ssr_lambda::storage::{MemoryObjectStore, StoredObject};
use std::sync::{Arc, Mutex};

const BUCKET: &str = "site-assets";

#[page(path = "pages/posts/[id].js", description = "Post detail")]
async fn post(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    let id = ctx.param("id").unwrap_or_default().to_string();
    RenderOutput::html(format!("<h1>Post {id}</h1>"))
        .with_page_data(&serde_json::json!({ "pageProps": { "id": id } }))
}

#[page(path = "pages/blog/[slug].js")]
async fn blog(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    let slug = ctx.param("slug").unwrap_or_default().to_string();
    RenderOutput::html(format!("<article>{slug}</article>"))
        .with_page_data(&serde_json::json!({ "pageProps": { "slug": slug } }))
}

#[page(path = "pages/dashboard.js")]
async fn dashboard(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    let tab = ctx.query.get("tab").cloned().unwrap_or_else(|| "home".to_string());
    Ok(RenderOutput::html(format!("<main>{tab}</main>")))
}

#[page(path = "pages/404.js")]
async fn not_found(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    Ok(RenderOutput::html(format!("<h1>{} could not be found</h1>", ctx.path)).with_status(404))
}

#[page(path = "pages/[...slug].js")]
async fn catch_all(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    Ok(RenderOutput::html(format!("<p>catch-all {}</p>", ctx.path)))
}

#[page(path = "pages/broken.js")]
async fn broken(_ctx: &RenderContext) -> Result<RenderOutput, PageError> {
    Err(PageError::render("template exploded"))
}

#[derive(Default)]
struct RecordingRewriter {
    targets: Mutex<Vec<String>>,
}

#[async_trait]
impl ExternalRewriter for RecordingRewriter {
    async fn proxy(
        &self,
        target: &str,
        _request: &GatewayRequest,
        res: &mut ResponseWriter,
        _body: Option<Bytes>,
    ) -> Result<(), ProxyError> {
        self.targets.lock().unwrap().push(target.to_string());
        res.end_with("proxied")?;
        Ok(())
    }
}

fn build_manifest() -> BuildManifest {
    BuildManifest::new("b1", BUCKET)
        .with_ssr_page("/posts/[id]", "pages/posts/[id].js")
        .with_ssr_page("/blog/[slug]", "pages/blog/[slug].js")
        .with_ssr_page("/dashboard", "pages/dashboard.js")
        .with_ssr_page("/broken", "pages/broken.js")
        .with_html_page("/about", "pages/about.html")
        .with_public_file("/robots.txt", "robots.txt")
}

fn prerender_manifest() -> PrerenderManifest {
    PrerenderManifest::new()
        .with_route("/")
        .with_route("/blog/first")
        .with_dynamic_route("/blog/[slug]", Fallback::Blocking)
        .with_dynamic_route("/products/[id]", Fallback::Page("/products/[id].html".to_string()))
        .with_dynamic_route("/archive/[year]", Fallback::Disabled)
}

fn routes_manifest() -> RoutesManifest {
    RoutesManifest::new()
        .with_redirect("/old-blog/:slug", "/blog/:slug", true)
        .with_rewrite("/api/:path*", "https://api.example.com/:path*")
        .with_header("/about", "X-Frame-Options", "DENY")
}

struct Site {
    controller: DispatchController,
    store: Arc<MemoryObjectStore>,
    pages: Arc<PageRegistry>,
    rewriter: Arc<RecordingRewriter>,
}

async fn site(manifests: Manifests) -> Site {
    let pages = PageRegistry::new();
    pages.register(Box::new(PostPage::new())).await.unwrap();
    pages.register(Box::new(BlogPage::new())).await.unwrap();
    pages.register(Box::new(DashboardPage::new())).await.unwrap();
    pages.register(Box::new(NotFoundPage::new())).await.unwrap();
    pages.register(Box::new(BrokenPage::new())).await.unwrap();
    pages.register(Box::new(CatchAllPage::new())).await.unwrap();
    let pages = Arc::new(pages);

    let store = Arc::new(MemoryObjectStore::new());
    let rewriter = Arc::new(RecordingRewriter::default());
    let controller = DispatchController::new(Arc::new(manifests), pages.clone())
        .with_store(store.clone())
        .with_rewriter(rewriter.clone());

    Site {
        controller,
        store,
        pages,
        rewriter,
    }
}

async fn default_site() -> Site {
    site(Manifests::new(build_manifest(), prerender_manifest(), routes_manifest())).await
}

impl Site {
    async fn get(&self, request: GatewayRequest) -> ResponseWriter {
        let mut res = ResponseWriter::new();
        self.controller.dispatch(&request, &mut res).await.unwrap();
        res
    }

    async fn put_html(&self, key: &str, body: &'static str) {
        self.store
            .put(BUCKET, key, StoredObject::new(body).content_type("text/html"))
            .await;
    }
}

fn get(path: &str) -> GatewayRequest {
    GatewayRequest::new(Method::Get, path)
}

#[tokio::test]
async fn test_html_page_with_header_rule() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/about.html", "<h1>About</h1>").await;

    let res = site.get(get("/about")).await;
    assert_eq!(res.status().0, 200);
    assert_eq!(res.header("x-frame-options"), Some("DENY"));
    assert_eq!(res.text_body(), "<h1>About</h1>");
}

#[tokio::test]
async fn test_prerendered_index() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/index.html", "home").await;

    let res = site.get(get("/")).await;
    assert_eq!(res.text_body(), "home");
    assert_eq!(site.store.requested_keys().await, vec!["/static-pages/b1/index.html"]);
}

#[tokio::test]
async fn test_ssr_page_renders_html() {
    let site = default_site().await;
    assert_eq!(site.pages.state(PostPage::PATH).await, Some(PageState::Unloaded));

    let res = site.get(get("/posts/42")).await;
    assert!(res.is_ended());
    assert_eq!(res.header("content-type"), Some("text/html"));
    assert_eq!(res.text_body(), "<h1>Post 42</h1>");
    assert!(site.store.requested_keys().await.is_empty());
    assert_eq!(site.pages.state(PostPage::PATH).await, Some(PageState::Ready));
}

#[tokio::test]
async fn test_ssr_page_sees_query() {
    let site = default_site().await;
    let res = site.get(get("/dashboard").query("tab=billing")).await;
    assert_eq!(res.text_body(), "<main>billing</main>");
}

#[tokio::test]
async fn test_ssr_data_request_renders_json() {
    let site = default_site().await;
    let res = site.get(get("/_next/data/b1/posts/42.json")).await;

    assert_eq!(res.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, serde_json::json!({ "pageProps": { "id": "42" } }));
}

#[tokio::test]
async fn test_render_error_propagates() {
    let site = default_site().await;
    let mut res = ResponseWriter::new();
    let result = site.controller.dispatch(&get("/broken"), &mut res).await;
    assert!(matches!(result, Err(DispatchError::Routing(_))));
    assert!(!res.is_ended());
}

#[tokio::test]
async fn test_custom_redirect_keeps_query() {
    let site = default_site().await;
    let res = site.get(get("/old-blog/hello").query("ref=home")).await;

    assert_eq!(res.status().0, 308);
    assert_eq!(res.header("location"), Some("/blog/hello?ref=home"));
    assert!(res.is_ended());
}

#[tokio::test]
async fn test_trailing_slash_redirect() {
    let site = default_site().await;
    let res = site.get(get("/about/")).await;

    assert_eq!(res.status().0, 308);
    assert_eq!(res.header("location"), Some("/about"));
}

#[tokio::test]
async fn test_external_rewrite() {
    let site = default_site().await;
    let res = site.get(get("/api/v1/items").query("x=1")).await;

    assert_eq!(res.text_body(), "proxied");
    assert_eq!(
        *site.rewriter.targets.lock().unwrap(),
        vec!["https://api.example.com/v1/items?x=1".to_string()]
    );
}

#[tokio::test]
async fn test_public_file() {
    let site = default_site().await;
    site.store
        .put(BUCKET, "/public/robots.txt", StoredObject::new("User-agent: *"))
        .await;

    let res = site.get(get("/robots.txt")).await;
    assert_eq!(res.text_body(), "User-agent: *");
    assert_eq!(site.store.requested_keys().await, vec!["/public/robots.txt"]);
}

#[tokio::test]
async fn test_prerendered_dynamic_page_served_from_store() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/blog/first.html", "<article>first</article>").await;

    let res = site.get(get("/blog/first")).await;
    assert_eq!(res.text_body(), "<article>first</article>");
    assert_eq!(site.pages.state(BlogPage::PATH).await, Some(PageState::Unloaded));
}

#[tokio::test]
async fn test_blocking_fallback_renders_page() {
    let site = default_site().await;
    let res = site.get(get("/blog/new")).await;

    assert_eq!(res.status().0, 200);
    assert_eq!(res.header("content-type"), Some("text/html"));
    assert_eq!(res.text_body(), "<article>new</article>");
    assert_eq!(site.store.requested_keys().await, vec!["/static-pages/b1/blog/new.html"]);
}

#[tokio::test]
async fn test_blocking_fallback_for_data_request() {
    let site = default_site().await;
    let res = site.get(get("/_next/data/b1/blog/new.json")).await;

    assert_eq!(res.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, serde_json::json!({ "pageProps": { "slug": "new" } }));
    assert_eq!(site.store.requested_keys().await, vec!["/_next/data/b1/blog/new.json"]);
}

#[tokio::test]
async fn test_fallback_shell_page() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/products/[id].html", "<div>loading</div>").await;

    let res = site.get(get("/products/7")).await;
    assert_eq!(res.status().0, 200);
    assert_eq!(res.text_body(), "<div>loading</div>");
    assert_eq!(
        site.store.requested_keys().await,
        vec!["/static-pages/b1/products/7.html", "/static-pages/b1/products/[id].html"]
    );
}

#[tokio::test]
async fn test_disabled_fallback_serves_404_page() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/404.html", "<h1>404</h1>").await;

    let res = site.get(get("/archive/2020")).await;
    assert_eq!(res.status().0, 404);
    assert_eq!(res.text_body(), "<h1>404</h1>");
}

#[tokio::test]
async fn test_unknown_page_serves_404_page() {
    let site = default_site().await;
    site.put_html("/static-pages/b1/404.html", "<h1>404</h1>").await;

    let res = site.get(get("/nope")).await;
    assert_eq!(res.status().0, 404);
    assert_eq!(site.store.requested_keys().await, vec!["/static-pages/b1/404.html"]);
}

#[tokio::test]
async fn test_ssr_404_page() {
    let site = site(Manifests::new(
        build_manifest().with_ssr_page("/404", "pages/404.js"),
        prerender_manifest(),
        routes_manifest(),
    ))
    .await;

    let res = site.get(get("/nope")).await;
    assert_eq!(res.status().0, 404);
    assert_eq!(res.text_body(), "<h1>/nope could not be found</h1>");
    assert!(site.store.requested_keys().await.is_empty());
}

#[tokio::test]
async fn test_base_path() {
    let site = site(Manifests::new(
        build_manifest(),
        prerender_manifest(),
        routes_manifest().with_base_path("/docs"),
    ))
    .await;
    site.put_html("/docs/static-pages/b1/about.html", "<h1>About</h1>").await;
    site.put_html("/docs/static-pages/b1/404.html", "<h1>404</h1>").await;

    let res = site.get(get("/docs/about")).await;
    assert_eq!(res.text_body(), "<h1>About</h1>");

    let res = site.get(get("/elsewhere")).await;
    assert_eq!(res.status().0, 404);
    assert_eq!(res.text_body(), "<h1>404</h1>");
}

#[tokio::test]
async fn test_missing_404_page_does_not_reach_catch_all_fallback() {
    let site = site(Manifests::new(
        BuildManifest::new("b1", BUCKET).with_ssr_page("/[...slug]", "pages/[...slug].js"),
        PrerenderManifest::new().with_dynamic_route("/[...slug]", Fallback::Blocking),
        RoutesManifest::new().with_base_path("/docs"),
    ))
    .await;

    let mut res = ResponseWriter::new();
    let result = site.controller.dispatch(&get("/elsewhere"), &mut res).await;

    assert!(matches!(result, Err(DispatchError::ErrorPageUnavailable)));
    assert!(!res.is_ended());
    assert_eq!(
        site.store.requested_keys().await,
        vec!["/docs/static-pages/b1/404.html", "/docs/static-pages/b1/404.html"]
    );
    assert_eq!(site.pages.state(CatchAllPage::PATH).await, Some(PageState::Unloaded));
}

#[tokio::test]
async fn test_basic_auth() {
    let site = site(Manifests::new(
        build_manifest().with_authentication("user", "pass"),
        prerender_manifest(),
        routes_manifest(),
    ))
    .await;

    let res = site.get(get("/posts/1")).await;
    assert_eq!(res.status().0, 401);
    assert_eq!(res.header("www-authenticate"), Some(r#"Basic realm="Restricted""#));
    assert_eq!(res.text_body(), "Unauthorized");

    // base64("user:pass")
    let res = site
        .get(get("/posts/1").header("Authorization", "Basic dXNlcjpwYXNz"))
        .await;
    assert_eq!(res.status().0, 200);
    assert_eq!(res.text_body(), "<h1>Post 1</h1>");
}

#[tokio::test]
async fn test_macro_generated_page() {
    let page = PostPage::new();
    assert_eq!(page.path(), "pages/posts/[id].js");
    assert_eq!(PostPage::description(), "Post detail");
    assert_eq!(BlogPage::description(), "");

    let ctx = RenderContext::new("/posts/9", "/posts/[id]").with_param("id", "9");
    let output = page.render(&ctx).await.unwrap();
    assert_eq!(output.html, "<h1>Post 9</h1>");
    assert_eq!(output.page_data["pageProps"]["id"], "9");
}

#[tokio::test]
async fn test_duplicate_page_rejected() {
    let site = default_site().await;
    let err = site
        .pages
        .register(Box::new(PostPage::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, PageError::AlreadyRegistered(_)));
}
