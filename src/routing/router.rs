//! Default routing core driven entirely by the manifests.

use crate::http::{GatewayRequest, ResponseWriter, StatusCode};
use crate::manifest::{Authentication, Fallback, Manifests};
use crate::page::{PageLoader, RenderContext, RenderOutput};
use crate::routing::resolver::{RoutingCore, RoutingError};
use crate::routing::matcher::{substitute, RoutePattern};
use crate::routing::route::{FallbackRoute, RenderOpts, Route, StaticRoute};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use tracing::debug;

const DATA_PREFIX: &str = "/_next/data/";

#[derive(Debug, Clone, PartialEq)]
enum PageKind {
    /// Listed in the prerender manifest's `routes`.
    Prerendered,
    Html(String),
    Ssr(String),
    /// Dynamic SSG pattern; the concrete path may not have been generated.
    DynamicSsg(Fallback),
}

struct PageMatch {
    pattern: String,
    params: BTreeMap<String, String>,
    kind: PageKind,
}

/// Routes requests using the build, prerender and routes manifests.
///
/// Resolution order: base path, basic auth, trailing slash, redirects,
/// headers, rewrites, public files, data files, pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestRouter;

impl ManifestRouter {
    pub fn new() -> Self {
        Self
    }

    async fn not_found(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<StaticRoute>, RoutingError> {
        let Some(module) = manifests.build.pages.ssr.non_dynamic.get("/404") else {
            return Ok(Some(StaticRoute::not_found()));
        };

        let ctx = render_context(request, &request.path, "/404", BTreeMap::new(), false);
        let mut output = render(loader, module, &ctx).await?;
        output.status.get_or_insert(StatusCode::NOT_FOUND.0);
        write_render(res, output, false)?;
        Ok(None)
    }

    async fn route_data(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        page_path: &str,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<Route>, RoutingError> {
        match match_page(manifests, page_path) {
            Some(PageMatch {
                kind: PageKind::Prerendered | PageKind::DynamicSsg(_),
                ..
            }) => Ok(Some(Route::Static(StaticRoute::data(data_file(
                manifests.build_id(),
                page_path,
            ))))),
            Some(PageMatch {
                kind: PageKind::Ssr(module),
                pattern,
                params,
            }) => {
                let ctx = render_context(request, page_path, &pattern, params, true);
                let output = render(loader, &module, &ctx).await?;
                write_render(res, output, true)?;
                Ok(None)
            }
            _ => Ok(self
                .not_found(request, res, manifests, loader)
                .await?
                .map(Route::Static)),
        }
    }

    async fn route_page(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        path: &str,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<Route>, RoutingError> {
        match match_page(manifests, path) {
            Some(PageMatch {
                kind: PageKind::Prerendered | PageKind::DynamicSsg(_),
                ..
            }) => Ok(Some(Route::static_page(html_file(path)))),
            Some(PageMatch {
                kind: PageKind::Html(file),
                ..
            }) => Ok(Some(Route::static_page(file))),
            Some(PageMatch {
                kind: PageKind::Ssr(module),
                pattern,
                params,
            }) => {
                let ctx = render_context(request, path, &pattern, params, false);
                let output = render(loader, &module, &ctx).await?;
                write_render(res, output, false)?;
                Ok(None)
            }
            None => Ok(self
                .not_found(request, res, manifests, loader)
                .await?
                .map(Route::Static)),
        }
    }
}

#[async_trait]
impl RoutingCore for ManifestRouter {
    async fn resolve_primary(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<Route>, RoutingError> {
        let base_path = manifests.base_path();
        let Some(path) = strip_base_path(&request.path, base_path) else {
            debug!(path = %request.path, "Outside base path");
            return Ok(self
                .not_found(request, res, manifests, loader)
                .await?
                .map(Route::Static));
        };

        if let Some(auth) = &manifests.build.authentication {
            if !is_authorized(request, auth) {
                res.set_status(StatusCode::UNAUTHORIZED);
                res.set_header("WWW-Authenticate", r#"Basic realm="Restricted""#);
                res.end_with("Unauthorized")?;
                return Ok(None);
            }
        }

        let query = query_suffix(request);

        if let Some(location) =
            trailing_slash_redirect(&path, manifests.build.trailing_slash, manifests)
        {
            res.redirect(
                StatusCode::PERMANENT_REDIRECT,
                format!("{base_path}{location}{query}"),
            )?;
            return Ok(None);
        }

        let mut path = normalize(&path);

        for rule in &manifests.routes.redirects {
            if let Some(params) = RoutePattern::parse(&rule.source).matches(&path) {
                let mut location = substitute(&rule.destination, &params);
                if location.starts_with('/') {
                    location = format!("{base_path}{location}");
                }
                if !location.contains('?') {
                    location.push_str(&query);
                }
                debug!(source = %rule.source, location = %location, "Custom redirect");
                res.redirect(rule.status(), location)?;
                return Ok(None);
            }
        }

        for rule in &manifests.routes.headers {
            if RoutePattern::parse(&rule.source).matches(&path).is_some() {
                for header in &rule.headers {
                    res.set_header(&header.key, header.value.clone());
                }
            }
        }

        for rule in &manifests.routes.rewrites {
            let Some(params) = RoutePattern::parse(&rule.source).matches(&path) else {
                continue;
            };
            let destination = substitute(&rule.destination, &params);
            if rule.is_external() {
                let target = if destination.contains('?') {
                    destination
                } else {
                    format!("{destination}{query}")
                };
                return Ok(Some(Route::external(target)));
            }
            debug!(from = %path, to = %destination, "Internal rewrite");
            path = normalize(destination.split('?').next().unwrap_or("/"));
            break;
        }

        if let Some(key) = manifests.build.public_files.get(&path) {
            return Ok(Some(Route::public_file(format!(
                "/{}",
                key.trim_start_matches('/')
            ))));
        }

        if let Some(page_path) = data_page_path(&path, manifests.build_id()) {
            return self
                .route_data(request, res, &page_path, manifests, loader)
                .await;
        }

        self.route_page(request, res, &path, manifests, loader).await
    }

    async fn resolve_fallback(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        route: &Route,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<FallbackRoute>, RoutingError> {
        let failed = match route {
            Route::External(_) => return Ok(None),
            Route::PublicFile(_) => {
                return Ok(self
                    .not_found(request, res, manifests, loader)
                    .await?
                    .map(FallbackRoute::Static))
            }
            Route::Static(failed) => failed,
        };

        // A missing error page is final; the dispatcher retries it once and gives up.
        if failed.status_override().is_some() {
            debug!(file = %failed.file, "Error page missing, no further fallback");
            return Ok(Some(FallbackRoute::Static(failed.clone())));
        }

        let page_path = if failed.is_data {
            data_page_path(&failed.file, manifests.build_id())
        } else {
            html_page_path(&failed.file)
        };

        let ssg = page_path.and_then(|page_path| {
            dynamic_ssg_route(manifests, &page_path)
                .map(|(pattern, params, fallback)| (page_path, pattern, params, fallback))
        });

        let Some((page_path, pattern, params, fallback)) = ssg else {
            return Ok(self
                .not_found(request, res, manifests, loader)
                .await?
                .map(FallbackRoute::Static));
        };

        let module = match fallback {
            Fallback::Page(file) if !failed.is_data => {
                return Ok(Some(FallbackRoute::Static(StaticRoute::page(format!(
                    "pages{file}"
                )))));
            }
            Fallback::Page(_) | Fallback::Blocking => page_module(manifests, &pattern),
            Fallback::Disabled => None,
        };

        let Some(module) = module else {
            return Ok(self
                .not_found(request, res, manifests, loader)
                .await?
                .map(FallbackRoute::Static));
        };

        debug!(page = %page_path, pattern = %pattern, "Rendering fallback");
        let ctx = render_context(request, &page_path, &pattern, params, failed.is_data);
        let output = render(loader, module, &ctx).await?;
        Ok(Some(FallbackRoute::Render {
            html: output.html,
            render_opts: RenderOpts {
                page_data: output.page_data,
            },
            route: failed.clone(),
        }))
    }
}

fn match_page(manifests: &Manifests, path: &str) -> Option<PageMatch> {
    let pages = &manifests.build.pages;
    let prerender = &manifests.prerender;

    let exact = |kind| {
        Some(PageMatch {
            pattern: path.to_string(),
            params: BTreeMap::new(),
            kind,
        })
    };
    if prerender.routes.contains_key(path) {
        return exact(PageKind::Prerendered);
    }
    if let Some(file) = pages.html.non_dynamic.get(path) {
        return exact(PageKind::Html(file.clone()));
    }
    if let Some(module) = pages.ssr.non_dynamic.get(path) {
        return exact(PageKind::Ssr(module.clone()));
    }

    // A dynamic SSG pattern is also listed under ssr.dynamic (for on-demand
    // renders); the SSG entry wins.
    let mut candidates: Vec<(RoutePattern, PageKind)> = Vec::new();
    for (pattern, route) in &prerender.dynamic_routes {
        candidates.push((
            RoutePattern::parse(pattern),
            PageKind::DynamicSsg(route.fallback.clone()),
        ));
    }
    for (pattern, file) in &pages.html.dynamic {
        if !prerender.dynamic_routes.contains_key(pattern) {
            candidates.push((RoutePattern::parse(pattern), PageKind::Html(file.clone())));
        }
    }
    for (pattern, module) in &pages.ssr.dynamic {
        if !prerender.dynamic_routes.contains_key(pattern) && !pages.html.dynamic.contains_key(pattern)
        {
            candidates.push((RoutePattern::parse(pattern), PageKind::Ssr(module.clone())));
        }
    }
    candidates.sort_by(|a, b| a.0.specificity_cmp(&b.0));

    candidates.into_iter().find_map(|(pattern, kind)| {
        pattern.matches(path).map(|params| PageMatch {
            pattern: pattern.source().to_string(),
            params,
            kind,
        })
    })
}

/// The dynamic SSG route a concrete page path belongs to, if any.
fn dynamic_ssg_route(
    manifests: &Manifests,
    page_path: &str,
) -> Option<(String, BTreeMap<String, String>, Fallback)> {
    let prerender = &manifests.prerender;
    if let Some(src) = prerender
        .routes
        .get(page_path)
        .and_then(|route| route.src_route.as_ref())
    {
        let dynamic = prerender.dynamic_routes.get(src)?;
        let params = RoutePattern::parse(src)
            .matches(page_path)
            .unwrap_or_default();
        return Some((src.clone(), params, dynamic.fallback.clone()));
    }

    match match_page(manifests, page_path)? {
        PageMatch {
            kind: PageKind::DynamicSsg(fallback),
            pattern,
            params,
        } => Some((pattern, params, fallback)),
        _ => None,
    }
}

fn page_module<'a>(manifests: &'a Manifests, pattern: &str) -> Option<&'a String> {
    let ssr = &manifests.build.pages.ssr;
    ssr.dynamic
        .get(pattern)
        .or_else(|| ssr.non_dynamic.get(pattern))
}

async fn render(
    loader: &PageLoader,
    module: &str,
    ctx: &RenderContext,
) -> Result<RenderOutput, RoutingError> {
    let page = loader.load(module).await?;
    Ok(page.render(ctx).await?)
}

fn render_context(
    request: &GatewayRequest,
    path: &str,
    pattern: &str,
    params: BTreeMap<String, String>,
    is_data: bool,
) -> RenderContext {
    RenderContext {
        path: path.to_string(),
        route: pattern.to_string(),
        params,
        query: request.query_params(),
        is_data,
    }
}

fn write_render(
    res: &mut ResponseWriter,
    output: RenderOutput,
    is_data: bool,
) -> Result<(), RoutingError> {
    if let Some(status) = output.status {
        res.set_status(status);
    }
    if is_data {
        res.set_header("Content-Type", "application/json");
        res.end_with(output.page_data_json())?;
    } else {
        res.set_header("Content-Type", "text/html");
        res.end_with(output.html)?;
    }
    Ok(())
}

fn is_authorized(request: &GatewayRequest, auth: &Authentication) -> bool {
    let Some(encoded) = request
        .get_header("authorization")
        .and_then(|value| value.strip_prefix("Basic "))
    else {
        return false;
    };
    match STANDARD.decode(encoded.trim()) {
        Ok(decoded) => decoded == format!("{}:{}", auth.username, auth.password).as_bytes(),
        Err(_) => false,
    }
}

fn strip_base_path(path: &str, base_path: &str) -> Option<String> {
    if base_path.is_empty() {
        return Some(path.to_string());
    }
    if path == base_path {
        return Some("/".to_string());
    }
    path.strip_prefix(base_path)
        .filter(|rest| rest.starts_with('/'))
        .map(str::to_string)
}

fn query_suffix(request: &GatewayRequest) -> String {
    if request.query.is_empty() {
        String::new()
    } else {
        format!("?{}", request.query)
    }
}

/// Where to redirect `path` under the trailing-slash policy, if anywhere.
fn trailing_slash_redirect(path: &str, trailing_slash: bool, manifests: &Manifests) -> Option<String> {
    if path == "/" || path.starts_with("/_next/") {
        return None;
    }
    if trailing_slash {
        let last = path.rsplit('/').next().unwrap_or_default();
        let is_file = last.contains('.') || manifests.build.public_files.contains_key(path);
        (!path.ends_with('/') && !is_file).then(|| format!("{path}/"))
    } else {
        path.ends_with('/')
            .then(|| normalize(path))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn page_file_stem(path: &str) -> &str {
    if path == "/" {
        "/index"
    } else {
        path
    }
}

fn html_file(path: &str) -> String {
    format!("pages{}.html", page_file_stem(path))
}

fn data_file(build_id: &str, path: &str) -> String {
    format!("{DATA_PREFIX}{build_id}{}.json", page_file_stem(path))
}

fn stem_to_path(stem: &str) -> Option<String> {
    match stem {
        "/index" => Some("/".to_string()),
        s if s.starts_with('/') => Some(s.to_string()),
        _ => None,
    }
}

/// `/_next/data/<build>/blog/a.json` → `/blog/a`.
fn data_page_path(path: &str, build_id: &str) -> Option<String> {
    let stem = path
        .strip_prefix(DATA_PREFIX)?
        .strip_prefix(build_id)?
        .strip_suffix(".json")?;
    stem_to_path(stem)
}

/// `pages/blog/a.html` → `/blog/a`.
fn html_page_path(file: &str) -> Option<String> {
    stem_to_path(file.strip_prefix("pages")?.strip_suffix(".html")?)
}
