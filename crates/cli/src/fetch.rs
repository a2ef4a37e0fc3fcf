//! `crisis-panel fetch-codes`: download the country code reference table.

use std::path::PathBuf;
use std::time::Duration;

use crisis_panel_io::country_codes::{parse_code_table, write_country_codes};

use crate::CliError;

const USER_AGENT: &str = concat!("crisis-panel/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 30;

pub fn cmd_fetch_codes(url: &str, output: PathBuf) -> Result<(), CliError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CliError::args(format!("not an http(s) URL: {url}")));
    }

    log::info!("fetching country codes from {url}");
    let html = fetch_page(url)?;
    let codes = parse_code_table(&html).map_err(|e| {
        CliError::fetch(format!("{url}: {e}"))
            .with_hint("the page layout may have changed; point --url at a page with the code table")
    })?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", parent.display())))?;
    }
    write_country_codes(&output, &codes).map_err(CliError::runtime)?;

    eprintln!("wrote {} country codes to {}", codes.len(), output.display());
    Ok(())
}

/// One blocking GET. Non-2xx statuses are failures.
fn fetch_page(url: &str) -> Result<String, CliError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| CliError::fetch(format!("cannot build HTTP client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| CliError::fetch(format!("{url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(CliError::fetch(format!("{url}: HTTP {}", status.as_u16())));
    }

    resp.text()
        .map_err(|e| CliError::fetch(format!("{url}: cannot read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_FETCH, EXIT_USAGE};
    use httpmock::prelude::*;
    use tempfile::tempdir;

    const PAGE: &str = "<html><body><table>\
        <tr><td>Country Name</td><td>ISO3</td><td>Code</td></tr>\
        <tr><td>Kenya</td><td>KEN</td><td>404</td></tr>\
        <tr><td>Korea, Rep.</td><td>KOR</td><td>410</td></tr>\
        </table></body></html>";

    #[test]
    fn fetch_writes_code_csv() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/codes.htm");
            then.status(200)
                .header("content-type", "text/html")
                .body(PAGE);
        });

        let dir = tempdir().unwrap();
        let out = dir.path().join("data").join("country_codes.csv");
        cmd_fetch_codes(&server.url("/codes.htm"), out.clone()).unwrap();

        mock.assert();
        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            content,
            "country,iso3,code\nKenya,KEN,404\n\"Korea, Rep.\",KOR,410\n"
        );
    }

    #[test]
    fn http_error_is_fetch_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/codes.htm");
            then.status(503);
        });

        let dir = tempdir().unwrap();
        let err = cmd_fetch_codes(&server.url("/codes.htm"), dir.path().join("c.csv")).unwrap_err();
        assert_eq!(err.code, EXIT_FETCH);
        assert!(err.message.contains("HTTP 503"));
        assert!(!dir.path().join("c.csv").exists());
    }

    #[test]
    fn page_without_table_is_fetch_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/moved");
            then.status(200).body("<html><p>This page has moved</p></html>");
        });

        let dir = tempdir().unwrap();
        let err = cmd_fetch_codes(&server.url("/moved"), dir.path().join("c.csv")).unwrap_err();
        assert_eq!(err.code, EXIT_FETCH);
        assert!(err.hint.is_some());
    }

    #[test]
    fn non_http_url_is_usage_error() {
        let err = cmd_fetch_codes("ftp://example.org/codes", PathBuf::from("c.csv")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }
}
