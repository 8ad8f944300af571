//! Session gate: decides whether the visitor is logged in and who they are.
//!
//! A login is signalled by the external login service redirecting back with
//! `logged_in=True&user_id=<id>`. The id is only trusted after the backend
//! confirms it through `/check-user`.

use crate::integrations::backend::TaskApi;
use crate::models::Session;
use reqwest::Url;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use tracing::{error, info};

const LOGGED_IN_FLAG: &str = "True";
const TOKEN_FILE_NAME: &str = "user_token";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub logged_in: Option<String>,
    pub user_id: Option<String>,
}

impl RedirectParams {
    /// Parses a raw query string (with or without the leading `?`).
    /// The first occurrence of a repeated key wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.trim_start_matches('?');
        let Ok(url) = Url::parse(&format!("http://localhost/?{query}")) else {
            return params;
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "logged_in" if params.logged_in.is_none() => {
                    params.logged_in = Some(value.into_owned())
                }
                "user_id" if params.user_id.is_none() => params.user_id = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    pub fn from_url(url: &str) -> Self {
        let without_fragment = url.split('#').next().unwrap_or("");
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query(query),
            None => Self::default(),
        }
    }

    /// The user id to validate, if these params describe a completed login.
    pub fn login_user_id(&self) -> Option<&str> {
        if self.logged_in.as_deref() != Some(LOGGED_IN_FLAG) {
            return None;
        }
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn requests_login(&self) -> bool {
        self.login_user_id().is_some()
    }
}

/// Validates redirect params against the backend. Any failure leaves the
/// visitor anonymous; nothing is retried.
pub fn resolve_session(api: &dyn TaskApi, params: &RedirectParams) -> Option<Session> {
    let user_id = params.login_user_id()?;

    match api.check_user(user_id) {
        Ok(username) => {
            info!(user_id, %username, "session resolved");
            Some(Session {
                user_id: user_id.to_string(),
                username,
            })
        }
        Err(err) => {
            error!(user_id, %err, "error checking user");
            None
        }
    }
}

/// Runs [`resolve_session`] off the UI thread. Returns `None` without touching
/// the network when the params do not describe a login.
pub fn spawn_resolve(
    api: Arc<dyn TaskApi>,
    params: RedirectParams,
) -> Option<Receiver<Option<Session>>> {
    if !params.requests_login() {
        return None;
    }

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(resolve_session(api.as_ref(), &params));
    });
    Some(rx)
}

/// Builds the external login address. `origin` is where the login service
/// sends the browser back to.
pub fn login_url(login_base: &str, origin: &str) -> String {
    format!("{}/?next={}", login_base.trim_end_matches('/'), origin)
}

/// Removes any token left in the data directory. Missing files are fine.
pub fn clear_local_tokens(data_dir: &Path) -> io::Result<()> {
    let path = data_dir.join(TOKEN_FILE_NAME);
    match fs::remove_file(&path) {
        Ok(()) => {
            info!(path = %path.display(), "removed stored token");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeApi;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_and_decodes_query() {
        let params = RedirectParams::from_query("?logged_in=True&user_id=a%20b&user_id=ignored");
        assert_eq!(params.logged_in.as_deref(), Some("True"));
        assert_eq!(params.user_id.as_deref(), Some("a b"));
    }

    #[test]
    fn parses_full_url_and_drops_fragment() {
        let params = RedirectParams::from_url("http://127.0.0.1:3000/?logged_in=True&user_id=5#top");
        assert_eq!(
            params,
            RedirectParams {
                logged_in: Some("True".to_string()),
                user_id: Some("5".to_string()),
            }
        );
        assert_eq!(RedirectParams::from_url("http://127.0.0.1:3000/"), RedirectParams::default());
    }

    #[test]
    fn login_requires_exact_flag_and_non_empty_id() {
        assert!(RedirectParams::from_query("logged_in=True&user_id=1").requests_login());
        assert!(!RedirectParams::from_query("logged_in=true&user_id=1").requests_login());
        assert!(!RedirectParams::from_query("logged_in=True&user_id=").requests_login());
        assert!(!RedirectParams::from_query("logged_in=True").requests_login());
        assert!(!RedirectParams::from_query("user_id=1").requests_login());
    }

    #[test]
    fn anonymous_params_make_no_network_calls() {
        let api = FakeApi::new();
        for query in ["", "logged_in=False&user_id=1", "logged_in=True", "user_id=1"] {
            let params = RedirectParams::from_query(query);
            assert_eq!(resolve_session(&api, &params), None);
        }
        assert_eq!(api.call_count(), 0);

        let shared: Arc<dyn TaskApi> = Arc::new(FakeApi::new());
        assert!(spawn_resolve(shared, RedirectParams::default()).is_none());
    }

    #[test]
    fn resolves_username_from_backend() {
        let api = FakeApi::new().with_user("42", "ada");
        let params = RedirectParams::from_query("logged_in=True&user_id=42");

        let session = resolve_session(&api, &params).expect("session");

        assert_eq!(
            session,
            Session {
                user_id: "42".to_string(),
                username: "ada".to_string(),
            }
        );
        assert_eq!(api.calls(), vec!["check_user 42".to_string()]);
    }

    #[test]
    fn failed_lookup_stays_anonymous() {
        let api = FakeApi::new();
        let params = RedirectParams::from_query("logged_in=True&user_id=404");
        assert_eq!(resolve_session(&api, &params), None);
        assert_eq!(api.call_count(), 1);
    }

    #[test]
    fn spawned_resolve_reports_session() {
        let api: Arc<dyn TaskApi> = Arc::new(FakeApi::new().with_user("7", "grace"));
        let rx = spawn_resolve(api, RedirectParams::from_query("logged_in=True&user_id=7"))
            .expect("resolve should start");
        let session = rx.recv().expect("result").expect("session");
        assert_eq!(session.username, "grace");
    }

    #[test]
    fn login_url_appends_origin_as_next() {
        assert_eq!(
            login_url("https://login.example.com/", "http://127.0.0.1:4000"),
            "https://login.example.com/?next=http://127.0.0.1:4000"
        );
    }

    #[test]
    fn clearing_tokens_tolerates_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        clear_local_tokens(dir.path()).expect("nothing to clear");

        let token = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&token, "abc").expect("write token");
        clear_local_tokens(dir.path()).expect("clear");
        assert!(!token.exists());
    }
}
