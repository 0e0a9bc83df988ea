//! Path patterns for page routes (`/posts/[id]`) and routing rules (`/old/:slug*`).

use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    /// One or more trailing segments.
    CatchAll(String),
    /// Zero or more trailing segments.
    OptionalCatchAll(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix("[[...").and_then(|s| s.strip_suffix("]]")) {
            Segment::OptionalCatchAll(name.to_string())
        } else if let Some(name) = raw.strip_prefix("[...").and_then(|s| s.strip_suffix(']')) {
            Segment::CatchAll(name.to_string())
        } else if let Some(name) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Segment::Param(name.to_string())
        } else if let Some(name) = raw.strip_prefix(':').and_then(|s| s.strip_suffix('*')) {
            Segment::OptionalCatchAll(name.to_string())
        } else if let Some(name) = raw.strip_prefix(':').and_then(|s| s.strip_suffix('+')) {
            Segment::CatchAll(name.to_string())
        } else if let Some(name) = raw.strip_prefix(':') {
            Segment::Param(name.to_string())
        } else {
            Segment::Static(raw.to_string())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Segment::Static(_) => 0,
            Segment::Param(_) => 1,
            Segment::CatchAll(_) => 2,
            Segment::OptionalCatchAll(_) => 3,
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl RoutePattern {
    pub fn parse(source: &str) -> Self {
        Self {
            source: source.to_string(),
            segments: split_path(source).into_iter().map(Segment::parse).collect(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match `path`, returning captured parameters. Catch-all captures are
    /// joined with `/`.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts = split_path(path);
        let mut params = BTreeMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::CatchAll(name) => {
                    if parts.len() <= i {
                        return None;
                    }
                    params.insert(name.clone(), parts[i..].join("/"));
                    return Some(params);
                }
                Segment::OptionalCatchAll(name) => {
                    let rest = parts.get(i..).unwrap_or_default();
                    params.insert(name.clone(), rest.join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Order by specificity: static segments beat parameters, which beat
    /// catch-alls.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        let lhs: Vec<u8> = self.segments.iter().map(Segment::rank).collect();
        let rhs: Vec<u8> = other.segments.iter().map(Segment::rank).collect();
        lhs.cmp(&rhs).then_with(|| self.source.cmp(&other.source))
    }
}

/// Replace `:name`, `:name*`, `:name+`, `[name]` and `[...name]` in `template`.
pub fn substitute(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut names: Vec<&String> = params.keys().collect();
    // Longest first so `:id` does not clobber `:identifier`.
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    let mut out = template.to_string();
    for name in names {
        let value = &params[name];
        for token in [
            format!("[[...{name}]]"),
            format!("[...{name}]"),
            format!("[{name}]"),
            format!(":{name}*"),
            format!(":{name}+"),
            format!(":{name}"),
        ] {
            out = out.replace(&token, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_match() {
        let pattern = RoutePattern::parse("/about");
        assert!(pattern.matches("/about").is_some());
        assert!(pattern.matches("/about/team").is_none());
        assert!(pattern.matches("/").is_none());
    }

    #[test]
    fn test_param_match() {
        let pattern = RoutePattern::parse("/posts/[id]");
        let params = pattern.matches("/posts/42").unwrap();
        assert_eq!(params["id"], "42");
        assert!(pattern.matches("/posts").is_none());
        assert!(pattern.matches("/posts/42/comments").is_none());
    }

    #[test]
    fn test_catch_all_match() {
        let pattern = RoutePattern::parse("/docs/[...slug]");
        assert_eq!(pattern.matches("/docs/a/b/c").unwrap()["slug"], "a/b/c");
        assert!(pattern.matches("/docs").is_none());

        let optional = RoutePattern::parse("/shop/[[...path]]");
        assert_eq!(optional.matches("/shop").unwrap()["path"], "");
        assert_eq!(optional.matches("/shop/x/y").unwrap()["path"], "x/y");
    }

    #[test]
    fn test_rule_syntax() {
        let pattern = RoutePattern::parse("/old/:slug");
        assert_eq!(pattern.matches("/old/hello").unwrap()["slug"], "hello");

        let wildcard = RoutePattern::parse("/proxy/:path*");
        assert_eq!(wildcard.matches("/proxy/a/b").unwrap()["path"], "a/b");
        assert_eq!(wildcard.matches("/proxy").unwrap()["path"], "");
    }

    #[test]
    fn test_root_pattern() {
        let pattern = RoutePattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/a").is_none());
    }

    #[test]
    fn test_specificity_order() {
        let mut patterns = vec![
            RoutePattern::parse("/[...all]"),
            RoutePattern::parse("/blog/[slug]"),
            RoutePattern::parse("/[section]/[slug]"),
            RoutePattern::parse("/blog/featured"),
        ];
        patterns.sort_by(|a, b| a.specificity_cmp(b));
        let order: Vec<&str> = patterns.iter().map(|p| p.source()).collect();
        assert_eq!(
            order,
            vec!["/blog/featured", "/blog/[slug]", "/[section]/[slug]", "/[...all]"]
        );
    }

    #[test]
    fn test_substitute() {
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), "7".to_string());
        params.insert("identifier".to_string(), "abc".to_string());
        assert_eq!(
            substitute("https://api.example.com/:identifier/:id", &params),
            "https://api.example.com/abc/7"
        );
        assert_eq!(substitute("/posts/[id]", &params), "/posts/7");
    }
}
