use crate::config::LoginConfig;
use crate::error::LoginError;
use crate::session::{RedirectParams, login_url};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long the listener blocks before checking for cancellation.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct LoginDisplay {
    pub login_url: String,
    pub origin: String,
    pub expires_at: DateTime<Local>,
}

/// A bound callback listener waiting for the login service to redirect back.
pub struct LoginFlow {
    pub display: LoginDisplay,
    server: tiny_http::Server,
    timeout: Duration,
}

#[derive(Clone, Debug)]
pub enum LoginPollResult {
    Redirect(RedirectParams),
    Error(String),
}

/// The running listener. Dropping it stops the listener thread and frees
/// the callback port before returning.
pub struct LoginPoll {
    receiver: Receiver<LoginPollResult>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LoginPoll {
    pub fn try_recv(&self) -> Result<LoginPollResult, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wraps a bare channel with no listener behind it.
    #[cfg(test)]
    pub fn from_receiver(receiver: Receiver<LoginPollResult>) -> Self {
        Self {
            receiver,
            cancelled: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Drop for LoginPoll {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("login listener thread panicked");
        }
    }
}

/// Binds the callback listener and computes where the browser must go.
/// The listener's address is the origin the login service returns to.
pub fn start_login_flow(config: &LoginConfig) -> Result<LoginFlow, LoginError> {
    let login_base = config.resolved_url();
    if login_base.is_empty() {
        return Err(LoginError::MissingLoginUrl);
    }

    let server = tiny_http::Server::http(("127.0.0.1", config.callback_port))
        .map_err(|e| LoginError::Bind(e.to_string()))?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .ok_or_else(|| LoginError::Bind("listener has no TCP port".to_string()))?;

    let origin = format!("http://127.0.0.1:{port}");
    let timeout = Duration::from_secs(config.timeout_seconds.max(1));
    let expires_at = Local::now()
        + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::minutes(5));

    Ok(LoginFlow {
        display: LoginDisplay {
            login_url: login_url(&login_base, &origin),
            origin,
            expires_at,
        },
        server,
        timeout,
    })
}

pub fn spawn_login_poll(flow: LoginFlow) -> LoginPoll {
    let (tx, receiver) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let LoginFlow {
        server, timeout, ..
    } = flow;

    let flag = Arc::clone(&cancelled);
    let worker = thread::spawn(move || {
        match wait_for_redirect(&server, timeout, &flag) {
            Ok((params, request)) => {
                // The browser only hears about success once the terminal has the result.
                let delivered = !flag.load(Ordering::SeqCst)
                    && tx.send(LoginPollResult::Redirect(params.clone())).is_ok();
                let message = if !delivered {
                    info!("redirect arrived after login was cancelled");
                    "Login was cancelled in the terminal. Start it again from there."
                } else if params.requests_login() {
                    info!("login redirect received");
                    "Login complete. You can return to the terminal."
                } else {
                    info!("redirect received without a completed login");
                    "Login was not completed. Return to the terminal to retry."
                };
                respond_with_message(request, message);
            }
            Err(LoginError::Cancelled) => info!("login listener stopped"),
            Err(err) => {
                warn!(%err, "login callback failed");
                let _ = tx.send(LoginPollResult::Error(err.to_string()));
            }
        }
    });

    LoginPoll {
        receiver,
        cancelled,
        worker: Some(worker),
    }
}

/// Blocks until a request carrying a query string arrives, the timeout passes
/// or `cancelled` is set. Requests without a query (favicon, preflight) are
/// answered with 204 and ignored.
fn wait_for_redirect(
    server: &tiny_http::Server,
    timeout: Duration,
    cancelled: &AtomicBool,
) -> Result<(RedirectParams, tiny_http::Request), LoginError> {
    let deadline = Instant::now() + timeout;

    loop {
        if cancelled.load(Ordering::SeqCst) {
            return Err(LoginError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(LoginError::TimedOut(timeout.as_secs()));
        }

        let request = match server.recv_timeout(remaining.min(CANCEL_CHECK_INTERVAL)) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => return Err(LoginError::Callback(e.to_string())),
        };

        let url = request.url().to_string();
        let Some((_, query)) = url.split_once('?') else {
            let _ = request.respond(tiny_http::Response::empty(204));
            continue;
        };

        return Ok((RedirectParams::from_query(query), request));
    }
}

fn respond_with_message(request: tiny_http::Request, message: &str) {
    let mut response = tiny_http::Response::from_string(format!(
        "<html><body><h2>todoterm</h2><p>{message}</p></body></html>"
    ));
    if let Ok(header) =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
    {
        response.add_header(header);
    }
    let _ = request.respond(response);
}
