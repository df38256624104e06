//! URL utilities for provider queries and manifest line resolution

use url::Url;

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Append query parameters to a base URI, respecting an existing query string
    ///
    /// Values are percent-encoded; keys are used as given.
    ///
    /// ```rust
    /// use vod_probe::utils::url::UrlUtils;
    ///
    /// assert_eq!(
    ///     UrlUtils::with_query("http://example.com/api", &[("ac", "detail"), ("wd", "a b")]),
    ///     "http://example.com/api?ac=detail&wd=a%20b"
    /// );
    /// ```
    pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
        let mut url = base.trim().to_string();
        let mut separator = if url.contains('?') {
            if url.ends_with('?') || url.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };

        for (key, value) in params {
            url.push_str(separator);
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
            separator = "&";
        }

        url
    }

    /// Resolve a manifest line against the manifest's own URI
    ///
    /// Absolute `http(s)` lines are returned unchanged, `//host/x` takes the
    /// manifest's scheme, `/x` is rooted at the manifest's origin and anything
    /// else is resolved against the manifest's directory. The manifest's query
    /// string never carries over.
    pub fn resolve_against(base: &str, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(line.to_string());
        }

        match Url::parse(base) {
            Ok(base_url) => base_url.join(line).ok().map(|u| u.to_string()),
            Err(_) => {
                // Unparseable base: fall back to plain string concatenation
                let without_query = base.split(['?', '#']).next().unwrap_or(base);
                without_query
                    .rfind('/')
                    .map(|pos| format!("{}{}", &without_query[..=pos], line))
            }
        }
    }

    /// Check that a URL parses and uses an http(s) scheme
    pub fn is_http_url(url: &str) -> bool {
        Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false)
    }

    /// Obfuscate credentials in URLs for safe logging
    ///
    /// Masks `user:pass@` authority credentials and well-known credential
    /// query parameters.
    pub fn obfuscate_credentials(url: &str) -> String {
        use regex::Regex;

        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url)
            && (!parsed.username().is_empty() || parsed.password().is_some())
        {
            let mut new_url = parsed.clone();
            let _ = new_url.set_username("****");
            let _ = new_url.set_password(Some("****"));
            obfuscated = new_url.to_string();
        }

        let sensitive_params = ["username", "password", "user", "pass", "pwd", "token", "key"];

        for param in &sensitive_params {
            let pattern = format!(r"(?i)([?&]{}=)[^&]*", regex::escape(param));
            if let Ok(re) = Regex::new(&pattern) {
                obfuscated = re.replace_all(&obfuscated, "${1}****").to_string();
            }
        }

        obfuscated
    }
}
