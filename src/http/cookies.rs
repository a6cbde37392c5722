use axum::http::{header, HeaderMap};

const ONE_YEAR_SECS: u64 = 60 * 60 * 24 * 365;

/// Value of the named cookie from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value persisting a user id for a year.
pub fn user_id_cookie(name: &str, user_id: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        name, user_id, ONE_YEAR_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
