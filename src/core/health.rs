//! Health-check primitives: URL expectations, HTTP probing and log entries.

use serde::Serialize;
use serde_json::Value;
use serde_json_path::JsonPath;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::io;

const DEFAULT_DESIRED_CODE: u16 = 200;
const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// A URL and the HTTP code it should answer with.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UrlExpectation {
    pub url: String,
    pub desired: u16,
}

impl UrlExpectation {
    pub fn new(url: &str, desired: u16) -> Self {
        Self {
            url: url.to_string(),
            desired,
        }
    }
}

/// Desired codes for which the probe must not follow redirects.
pub fn is_redirect_code(code: u16) -> bool {
    REDIRECT_CODES.contains(&code)
}

/// Parse `path|code,path|code,...`. Code defaults to 200.
pub fn parse_url_list(raw: &str) -> Result<Vec<UrlExpectation>> {
    let mut expectations = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (url, code) = match entry.split_once('|') {
            Some((url, code)) => (url.trim(), parse_code(code.trim(), entry)?),
            None => (entry, DEFAULT_DESIRED_CODE),
        };
        if url.is_empty() {
            continue;
        }
        merge_expectations(&mut expectations, vec![UrlExpectation::new(url, code)]);
    }
    Ok(expectations)
}

fn parse_code(code: &str, entry: &str) -> Result<u16> {
    if code.is_empty() {
        return Ok(DEFAULT_DESIRED_CODE);
    }
    code.parse::<u16>().map_err(|_| {
        Error::validation_invalid_argument(
            "urls",
            format!("Invalid HTTP code in '{}'", entry),
            Some(entry.to_string()),
            None,
        )
    })
}

/// Append `more`; a URL already present keeps its position and takes the new code.
pub fn merge_expectations(into: &mut Vec<UrlExpectation>, more: Vec<UrlExpectation>) {
    for expectation in more {
        match into.iter_mut().find(|e| e.url == expectation.url) {
            Some(existing) => existing.desired = expectation.desired,
            None => into.push(expectation),
        }
    }
}

/// Load a YAML URL file. `key` is a JSONPath (`$...`) or a dotted path to a
/// mapping of URL to desired code.
pub fn load_url_file(path: &Path, key: &str) -> Result<Vec<UrlExpectation>> {
    let content = io::read_file(path, "read URL file")?;
    parse_url_file(&content, key, path)
}

pub fn parse_url_file(content: &str, key: &str, path: &Path) -> Result<Vec<UrlExpectation>> {
    let document: Value = serde_yml::from_str(content)
        .map_err(|e| Error::config_invalid_yaml(path.display().to_string(), e.to_string()))?;

    let expression = key_path_expression(key);
    let json_path = JsonPath::parse(&expression).map_err(|e| {
        Error::validation_invalid_argument(
            "file-key",
            format!("Invalid key path '{}': {}", key, e),
            Some(key.to_string()),
            None,
        )
    })?;

    let nodes = json_path.query(&document);
    let node = nodes
        .first()
        .ok_or_else(|| Error::config_missing_key(key, Some(path.display().to_string())))?;

    let mapping = node.as_object().ok_or_else(|| {
        Error::config_invalid_value(
            key,
            None,
            "expected a mapping of URL to HTTP code",
        )
    })?;

    let mut expectations = Vec::with_capacity(mapping.len());
    for (url, code) in mapping {
        let desired = code_value(code).ok_or_else(|| {
            Error::config_invalid_value(
                format!("{}.{}", key, url),
                Some(code.to_string()),
                "HTTP code must be an integer",
            )
        })?;
        merge_expectations(&mut expectations, vec![UrlExpectation::new(url, desired)]);
    }
    Ok(expectations)
}

fn code_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(DEFAULT_DESIRED_CODE),
        _ => None,
    }
}

fn key_path_expression(key: &str) -> String {
    let key = key.trim();
    if key.starts_with('$') {
        return key.to_string();
    }
    let mut expression = String::from("$");
    for segment in key.split('.').filter(|s| !s.is_empty()) {
        expression.push_str(&format!("['{}']", segment.replace('\'', "\\'")));
    }
    expression
}

/// Absolute URL for `url`, resolving host-less paths against `base`.
pub fn resolve_url(url: &str, base: Option<&str>) -> Result<String> {
    let has_host = reqwest::Url::parse(url)
        .map(|parsed| parsed.host_str().is_some())
        .unwrap_or(false);
    if has_host {
        return Ok(url.to_string());
    }

    let base = base.ok_or_else(|| {
        Error::validation_invalid_argument(
            "uri",
            format!("Cannot resolve '{}': no base URI for the target", url),
            Some(url.to_string()),
            None,
        )
        .with_hint("Pass --uri or declare a uri on the target alias")
    })?;

    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    ))
}

/// Answers one HEAD request with the final status code.
pub trait HttpProbe {
    /// Status after following at most `max_redirects` hops; with 0 the first
    /// response is returned as is. Transport failures are code 0.
    fn status(&self, url: &str, max_redirects: usize) -> u16;
}

/// Blocking reqwest probe. A fresh client per request keeps redirect policy
/// scoped to that request.
pub struct ReqwestProbe {
    timeout: Duration,
}

impl ReqwestProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn client(&self, max_redirects: usize) -> reqwest::Result<reqwest::blocking::Client> {
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            // previous() includes the original URL
            if attempt.previous().len() > max_redirects {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        reqwest::blocking::Client::builder()
            .user_agent(format!("sitekit/{}", env!("CARGO_PKG_VERSION")))
            .redirect(policy)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .danger_accept_invalid_certs(true)
            .build()
    }
}

impl HttpProbe for ReqwestProbe {
    fn status(&self, url: &str, max_redirects: usize) -> u16 {
        let client = match self.client(max_redirects) {
            Ok(client) => client,
            Err(e) => {
                log_status!("probe", "Failed to build HTTP client: {}", e);
                return 0;
            }
        };

        match client.head(url).send() {
            Ok(response) => response.status().as_u16(),
            Err(e) => {
                log_status!("probe", "HEAD {} failed: {}", url, e);
                0
            }
        }
    }
}

/// One probed URL.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UrlObservation {
    pub url: String,
    pub observed: u16,
    pub desired: u16,
}

impl UrlObservation {
    pub fn mismatched(&self) -> bool {
        self.observed != self.desired
    }

    pub fn server_error(&self) -> bool {
        (500..600).contains(&self.observed)
    }
}

/// Probe every expectation in order. Redirect following is decided per URL.
pub fn observe(
    probe: &dyn HttpProbe,
    expectations: &[UrlExpectation],
    base: Option<&str>,
    max_redirects: usize,
) -> Result<Vec<UrlObservation>> {
    let mut observations = Vec::with_capacity(expectations.len());
    for expectation in expectations {
        let absolute = resolve_url(&expectation.url, base)?;
        let hops = if is_redirect_code(expectation.desired) {
            0
        } else {
            max_redirects
        };
        let observed = probe.status(&absolute, hops);
        log_status!("probe", "{} -> {} (want {})", absolute, observed, expectation.desired);
        observations.push(UrlObservation {
            url: expectation.url.clone(),
            observed,
            desired: expectation.desired,
        });
    }
    Ok(observations)
}

pub const MISMATCH_HEADERS: [&str; 3] = ["URL", "HTTP code", "Desired HTTP code"];

pub fn mismatch_rows(observations: &[UrlObservation]) -> Vec<Vec<String>> {
    observations
        .iter()
        .filter(|o| o.mismatched())
        .map(|o| vec![o.url.clone(), o.observed.to_string(), o.desired.to_string()])
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warning,
    Other,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl LogEntry {
    pub fn level(&self) -> LogLevel {
        classify_severity(&self.severity)
    }
}

/// `emergency`, `alert`, `critical` and `error` (or RFC 5424 levels 0-3) are
/// errors; `warning` (4) is a warning.
pub fn classify_severity(severity: &str) -> LogLevel {
    let severity = severity.trim().to_ascii_lowercase();
    match severity.as_str() {
        "emergency" | "alert" | "critical" | "error" | "0" | "1" | "2" | "3" => LogLevel::Error,
        "warning" | "4" => LogLevel::Warning,
        _ => LogLevel::Other,
    }
}

/// Parse `watchdog:show --format=json` output: an object keyed by entry id,
/// or an array. Empty output is an empty log.
pub fn parse_log_entries(output: &str) -> Result<Vec<LogEntry>> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(output)
        .map_err(|e| Error::internal_json(e.to_string(), Some("parse log entries".to_string())))?;

    let records: Vec<&Value> = match &value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    };

    Ok(records.into_iter().filter_map(log_entry).collect())
}

fn log_entry(record: &Value) -> Option<LogEntry> {
    let severity = match record.get("severity")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let message = record
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(LogEntry { severity, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn url_list_defaults_and_trims() {
        let list = parse_url_list(" /a , /b|404,, http://www.docksal|301 ,").unwrap();
        assert_eq!(
            list,
            vec![
                UrlExpectation::new("/a", 200),
                UrlExpectation::new("/b", 404),
                UrlExpectation::new("http://www.docksal", 301),
            ]
        );
    }

    #[test]
    fn url_list_duplicate_overrides_code_in_place() {
        let list = parse_url_list("/a|200,/b,/a|410").unwrap();
        assert_eq!(
            list,
            vec![UrlExpectation::new("/a", 410), UrlExpectation::new("/b", 200)]
        );
    }

    #[test]
    fn url_list_rejects_bad_code() {
        let err = parse_url_list("/a|ok").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn url_file_dotted_and_jsonpath_keys() {
        let yaml = "checks:\n  smoke:\n    /: 200\n    /old: 301\nurls:\n  /a: 200\n";
        let path = Path::new("urls.yml");

        let smoke = parse_url_file(yaml, "checks.smoke", path).unwrap();
        assert_eq!(
            smoke,
            vec![UrlExpectation::new("/", 200), UrlExpectation::new("/old", 301)]
        );

        let urls = parse_url_file(yaml, "$.urls", path).unwrap();
        assert_eq!(urls, vec![UrlExpectation::new("/a", 200)]);

        let err = parse_url_file(yaml, "missing", path).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
    }

    #[test]
    fn relative_urls_resolve_against_base() {
        assert_eq!(
            resolve_url("/a", Some("http://www.docksal/")).unwrap(),
            "http://www.docksal/a"
        );
        assert_eq!(
            resolve_url("https://other.test/x", Some("http://www.docksal")).unwrap(),
            "https://other.test/x"
        );
        assert!(resolve_url("/a", None).is_err());
    }

    struct Recording {
        hops: RefCell<Vec<usize>>,
    }

    impl HttpProbe for Recording {
        fn status(&self, _url: &str, max_redirects: usize) -> u16 {
            self.hops.borrow_mut().push(max_redirects);
            200
        }
    }

    #[test]
    fn redirect_expectation_disables_following_for_that_url_only() {
        let probe = Recording {
            hops: RefCell::new(Vec::new()),
        };
        let expectations = vec![
            UrlExpectation::new("/old", 301),
            UrlExpectation::new("/new", 200),
            UrlExpectation::new("/temp", 307),
        ];
        observe(&probe, &expectations, Some("http://www.docksal"), 10).unwrap();
        assert_eq!(*probe.hops.borrow(), vec![0, 10, 0]);
    }

    #[test]
    fn severity_classification() {
        assert_eq!(classify_severity("Critical"), LogLevel::Error);
        assert_eq!(classify_severity("3"), LogLevel::Error);
        assert_eq!(classify_severity("warning"), LogLevel::Warning);
        assert_eq!(classify_severity("notice"), LogLevel::Other);
    }

    #[test]
    fn log_entries_from_keyed_object() {
        let output = r#"{
            "12": {"wid": "12", "type": "php", "message": "Undefined index", "severity": "Error"},
            "11": {"wid": "11", "type": "cron", "message": "Cron run", "severity": "Notice"}
        }"#;
        let entries = parse_log_entries(output).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level(), LogLevel::Error);
        assert_eq!(entries[1].level(), LogLevel::Other);
        assert!(parse_log_entries("").unwrap().is_empty());
    }

    #[test]
    fn mismatch_rows_keep_given_url() {
        let observations = vec![
            UrlObservation {
                url: "/a".to_string(),
                observed: 200,
                desired: 200,
            },
            UrlObservation {
                url: "/b".to_string(),
                observed: 500,
                desired: 404,
            },
        ];
        assert_eq!(
            mismatch_rows(&observations),
            vec![vec!["/b".to_string(), "500".to_string(), "404".to_string()]]
        );
    }
}
