use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::spotify_rs::types::SpotifyTokenResponse;

const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Everything the import writes: playlists, saved tracks and albums, follows and covers.
pub const SCOPES: &str =
    "playlist-modify-public playlist-modify-private user-library-modify user-follow-modify ugc-image-upload";

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Authorization code flow URL the user opens in a browser.
pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&state={}&scope={}",
        SPOTIFY_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
        urlencoding::encode(SCOPES)
    )
}

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("Not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Authorization was denied: {reason}")]
    Denied { reason: String },
    #[error("State parameter does not match, the redirect belongs to another login attempt")]
    StateMismatch,
    #[error("Redirect URL has no code parameter")]
    MissingCode,
}

/// Pulls the authorization code out of the URL the browser was redirected to.
pub fn extract_code(redirect_url: &str, expected_state: &str) -> Result<String, RedirectError> {
    let url = url::Url::parse(redirect_url.trim())?;
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(reason) = params.get("error") {
        return Err(RedirectError::Denied {
            reason: reason.clone(),
        });
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(RedirectError::StateMismatch);
    }

    params
        .get("code")
        .cloned()
        .ok_or(RedirectError::MissingCode)
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeCodeForTokenError {
    #[error("Invalid code: {reason}")]
    InvalidCode { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response")]
    FailedToParseResponse(reqwest::Error),
}

fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Exchange authorization code for access token
/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
pub async fn exchange_code_for_token(
    client_id: &str,
    client_secret: &str,
    code: &str,
    // Must be the redirect URI the authorize URL was built with
    redirect_uri: &str,
) -> Result<SpotifyTokenResponse, ExchangeCodeForTokenError> {
    let client = reqwest::Client::new();

    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    params.insert("redirect_uri", redirect_uri);

    let response = client
        .post(SPOTIFY_TOKEN_URL)
        .form(&params)
        .header(
            reqwest::header::AUTHORIZATION,
            basic_credentials(client_id, client_secret),
        )
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ExchangeCodeForTokenError::InvalidCode {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToParseResponse)
}

/// Runs the authorization code flow on the terminal: prints the URL, reads the redirect URL
/// back from stdin and exchanges the code.
pub async fn authorize_interactively(
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
) -> Result<SpotifyTokenResponse> {
    let state = generate_state();

    println!("Open this URL in your browser and log in to Spotify:");
    println!();
    println!("{}", authorize_url(client_id, redirect_uri, &state));
    println!();
    println!("Paste the URL you were redirected to:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .wrap_err("Failed to read the redirect URL")?;

    let code = extract_code(&line, &state)?;
    log::debug!("Received authorization code, exchanging for a token");

    let token = exchange_code_for_token(client_id, client_secret, &code, redirect_uri).await?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 16);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_authorize_url() {
        let url = authorize_url("client", "https://open.spotify.com", "abc");

        assert!(url.starts_with(SPOTIFY_AUTH_URL));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fopen.spotify.com"));
        assert!(url.contains("state=abc"));
        assert!(url.contains("ugc-image-upload"));
    }

    #[test]
    fn test_extract_code() {
        let code = extract_code("https://open.spotify.com/?code=AQD123&state=abc\n", "abc").unwrap();
        assert_eq!(code, "AQD123");
    }

    #[test]
    fn test_extract_code_checks_state() {
        let result = extract_code("https://open.spotify.com/?code=AQD123&state=other", "abc");
        assert!(matches!(result, Err(RedirectError::StateMismatch)));
    }

    #[test]
    fn test_extract_code_reports_denial() {
        let result = extract_code("https://open.spotify.com/?error=access_denied&state=abc", "abc");
        match result {
            Err(RedirectError::Denied { reason }) => assert_eq!(reason, "access_denied"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_code_rejects_garbage() {
        assert!(matches!(
            extract_code("not a url", "abc"),
            Err(RedirectError::InvalidUrl(_))
        ));
        assert!(matches!(
            extract_code("https://open.spotify.com/?state=abc", "abc"),
            Err(RedirectError::MissingCode)
        ));
    }

    #[test]
    fn test_basic_credentials_use_standard_base64() {
        assert_eq!(basic_credentials("id", "secret"), "Basic aWQ6c2VjcmV0");
    }
}
