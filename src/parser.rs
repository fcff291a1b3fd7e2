use regex::Regex;
use std::sync::OnceLock;

/// The two load-bearing fields of an access-log line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request<'a> {
    pub url: &'a str,
    /// Request duration in seconds
    pub request_time: f64,
}

/// Result of matching one line against the access-log schema.
///
/// Malformed lines are an expected outcome, so they are a variant rather
/// than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedLine<'a> {
    Parsed(Request<'a>),
    Unmatched,
}

/// Expected log format (nginx `ui_short`):
///   $remote_addr $remote_user  $http_x_real_ip [$time_local] "$request"
///   $status $body_bytes_sent "$http_referer" "$http_user_agent"
///   "$http_x_forwarded_for" "$http_X_REQUEST_ID" "$http_X_RB_USER"
///   $request_time
///
/// Example:
///   1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/banner/25019354 HTTP/1.1" 200 927 "-" "Lynx/2.8.8dev.9" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" 0.390
static LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r#"^(?P<remote_addr>\S+) (?P<remote_user>\S+) +(?P<real_ip>\S+) "#,
            r#"\[(?P<time_local>[^\]]+)\] "#,
            r#""(?P<method>[^ "]+) (?P<url>[^"]*?)(?: (?P<protocol>HTTP/[^"]*))?" "#,
            r#"(?P<status>\d{3}) (?P<body_bytes>\d+|-) "#,
            r#""(?P<referer>[^"]*)" "(?P<user_agent>[^"]*)" "(?P<forwarded_for>[^"]*)" "#,
            r#""(?P<request_id>[^"]*)" "(?P<rb_user>[^"]*)" "#,
            r#"(?P<request_time>\S+)\s*$"#,
        ))
        .expect("hard-coded regex should always compile")
    })
}

/// Parse one raw log line into its URL and request time.
///
/// Returns [`ParsedLine::Unmatched`] for anything that deviates from the
/// schema, including an unmeasured (`-`) or non-numeric duration.
pub fn parse_line(line: &str) -> ParsedLine<'_> {
    let Some(caps) = get_regex().captures(line) else {
        return ParsedLine::Unmatched;
    };

    let (Some(url), Some(time)) = (caps.name("url"), caps.name("request_time")) else {
        return ParsedLine::Unmatched;
    };

    match parse_request_time(time.as_str()) {
        Some(request_time) => ParsedLine::Parsed(Request {
            url: url.as_str(),
            request_time,
        }),
        None => ParsedLine::Unmatched,
    }
}

fn parse_request_time(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with(request: &str, time: &str) -> String {
        format!(
            r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "{request}" 200 927 "-" "Lynx/2.8.8dev.9 libwww-FM/2.14" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" {time}"#
        )
    }

    fn parsed(line: &str) -> Request<'_> {
        match parse_line(line) {
            ParsedLine::Parsed(req) => req,
            ParsedLine::Unmatched => panic!("expected a match for {line:?}"),
        }
    }

    #[test]
    fn parses_valid_line() {
        let line = line_with("GET /api/v2/banner/25019354 HTTP/1.1", "0.390");
        let req = parsed(&line);
        assert_eq!(req.url, "/api/v2/banner/25019354");
        assert_eq!(req.request_time, 0.390);
    }

    #[test]
    fn parses_line_with_real_ip_and_user() {
        let line = r#"1.169.137.128 user 10.0.0.1 [29/Jun/2017:03:50:23 +0300] "POST /api/1/banners/?campaign=7789704 HTTP/1.0" 200 604049 "-" "-" "-" "1498697421-2760328665-4709-9752772" "712e90144abee9" 0.628"#;
        let req = parsed(line);
        assert_eq!(req.url, "/api/1/banners/?campaign=7789704");
        assert_eq!(req.request_time, 0.628);
    }

    #[test]
    fn accepts_request_without_protocol() {
        let line = line_with("GET /export/appinstall_raw/2017-06-29/", "0.001");
        assert_eq!(parsed(&line).url, "/export/appinstall_raw/2017-06-29/");
    }

    #[test]
    fn accepts_unusual_methods() {
        let line = line_with("M-SEARCH * HTTP/1.1", "0.002");
        assert_eq!(parsed(&line).url, "*");

        let line = line_with("get /lower HTTP/1.1", "0.002");
        assert_eq!(parsed(&line).url, "/lower");
    }

    #[test]
    fn keeps_spaces_inside_url() {
        let line = line_with("GET /a b HTTP/1.1", "0.120");
        let req = parsed(&line);
        assert_eq!(req.url, "/a b");
        assert_eq!(req.request_time, 0.120);
    }

    #[test]
    fn accepts_integer_duration_and_trailing_whitespace() {
        let line = line_with("GET /slow HTTP/1.1", "12  ");
        assert_eq!(parsed(&line).request_time, 12.0);
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(parse_line(""), ParsedLine::Unmatched);
        assert_eq!(parse_line("   "), ParsedLine::Unmatched);
    }

    #[test]
    fn rejects_unmeasured_duration() {
        let line = line_with("GET /api HTTP/1.1", "-");
        assert_eq!(parse_line(&line), ParsedLine::Unmatched);
    }

    #[test]
    fn rejects_non_numeric_duration() {
        for time in ["abc", "0.3s", "NaN", "inf", "-1.0"] {
            let line = line_with("GET /api HTTP/1.1", time);
            assert_eq!(parse_line(&line), ParsedLine::Unmatched, "accepted duration {time:?}");
        }
    }

    #[test]
    fn rejects_malformed_request_token() {
        let line = line_with("0", "0.000");
        assert_eq!(parse_line(&line), ParsedLine::Unmatched);
    }

    #[test]
    fn rejects_truncated_line() {
        let line = r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/banner/25019354 HTTP/1.1" 200 927 "-""#;
        assert_eq!(parse_line(line), ParsedLine::Unmatched);
    }

    #[test]
    fn rejects_missing_quoted_field() {
        let line = r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET /api HTTP/1.1" 200 927 "-" "Lynx" "-" "dc7161be3" 0.390"#;
        assert_eq!(parse_line(line), ParsedLine::Unmatched);
    }
}
