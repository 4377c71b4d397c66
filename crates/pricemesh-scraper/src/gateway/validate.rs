//! Decides whether a fetched page is worth handing to an extractor.

use reqwest::StatusCode;

/// Why a transport's response lost the race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    Status(u16),
    TooShort { len: usize, min: usize },
    NoMarkup,
    BotChallenge,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Status(code) => write!(f, "HTTP {code}"),
            Rejection::TooShort { len, min } => write!(f, "body too short ({len} < {min} bytes)"),
            Rejection::NoMarkup => write!(f, "body has no HTML markup"),
            Rejection::BotChallenge => write!(f, "bot challenge page"),
        }
    }
}

/// Accepts 2xx responses whose body is long enough, looks like HTML and is
/// not an anti-bot interstitial.
pub(crate) fn check_page(status: StatusCode, body: &str, min_bytes: usize) -> Result<(), Rejection> {
    if !status.is_success() {
        return Err(Rejection::Status(status.as_u16()));
    }
    if body.len() < min_bytes {
        return Err(Rejection::TooShort {
            len: body.len(),
            min: min_bytes,
        });
    }

    let lowered = body.to_ascii_lowercase();
    if !has_markup(&lowered) {
        return Err(Rejection::NoMarkup);
    }
    if looks_like_bot_challenge(&lowered) {
        return Err(Rejection::BotChallenge);
    }
    Ok(())
}

fn has_markup(lowered: &str) -> bool {
    ["<html", "<body", "<!doctype"]
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn looks_like_bot_challenge(lowered: &str) -> bool {
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_cf_chl = lowered.contains("cf-chl-");

    has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && has_cookie_gate)
        || (has_just_a_moment && has_cf_chl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(inner: &str) -> String {
        format!("<!DOCTYPE html><html><body>{inner}{}</body></html>", " ".repeat(200))
    }

    #[test]
    fn accepts_regular_page() {
        assert_eq!(check_page(StatusCode::OK, &page("<h1>Milk</h1>"), 100), Ok(()));
    }

    #[test]
    fn rejects_non_success_status() {
        assert_eq!(
            check_page(StatusCode::FORBIDDEN, &page(""), 100),
            Err(Rejection::Status(403))
        );
    }

    #[test]
    fn rejects_short_body() {
        let result = check_page(StatusCode::OK, "<html></html>", 100);
        assert!(matches!(result, Err(Rejection::TooShort { len: 13, min: 100 })));
    }

    #[test]
    fn rejects_json_body() {
        let body = format!("{{\"items\": [{}]}}", "1,".repeat(100) + "1");
        assert_eq!(check_page(StatusCode::OK, &body, 10), Err(Rejection::NoMarkup));
    }

    #[test]
    fn markup_check_is_case_insensitive() {
        let body = format!("<HTML><BODY>{}</BODY></HTML>", "x".repeat(50));
        assert_eq!(check_page(StatusCode::OK, &body, 10), Ok(()));
    }

    #[test]
    fn rejects_cloudflare_interstitial() {
        let body = page("<title>Just a moment...</title><div class=\"cf-chl-widget\"></div>");
        assert_eq!(check_page(StatusCode::OK, &body, 10), Err(Rejection::BotChallenge));
    }

    #[test]
    fn just_a_moment_alone_is_not_a_challenge() {
        let body = page("<p>Just a moment... loading deals</p>");
        assert_eq!(check_page(StatusCode::OK, &body, 10), Ok(()));
    }

    #[test]
    fn rejection_messages_are_readable() {
        assert_eq!(Rejection::Status(503).to_string(), "HTTP 503");
        assert_eq!(
            Rejection::TooShort { len: 5, min: 10 }.to_string(),
            "body too short (5 < 10 bytes)"
        );
    }
}
