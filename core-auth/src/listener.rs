//! The local consent callback.
//!
//! The interactive handshake sends the user's browser to the authorization
//! server, which redirects back to a loopback address we control. The
//! [`ConsentListener`] trait is the seam: the production implementation owns
//! a real socket for exactly the duration of the wait, the flow tests stub
//! it out.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, Result};

/// The consent redirect, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentReply {
    pub code: String,
    pub state: String,
}

/// Receives the authorization server's redirect.
#[async_trait]
pub trait ConsentListener: Send {
    /// Acquire the local resource the redirect will land on and return the
    /// redirect URI to register in the authorization request.
    async fn bind(&mut self) -> Result<String>;

    /// Block until the consent redirect arrives or the timeout expires. The
    /// underlying resource is released when this returns, on every path.
    async fn wait_for_reply(&mut self, wait: Duration) -> Result<ConsentReply>;
}

/// Loopback HTTP listener on an ephemeral port (exclusive bind on
/// `127.0.0.1:0`).
pub struct LoopbackListener {
    listener: Option<TcpListener>,
}

impl LoopbackListener {
    pub fn new() -> Self {
        Self { listener: None }
    }
}

impl Default for LoopbackListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConsentListener for LoopbackListener {
    async fn bind(&mut self) -> Result<String> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::Network(format!("failed to bind consent listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Network(format!("consent listener has no address: {}", e)))?
            .port();
        self.listener = Some(listener);

        debug!(port, "consent listener bound");
        Ok(format!("http://127.0.0.1:{}", port))
    }

    async fn wait_for_reply(&mut self, wait: Duration) -> Result<ConsentReply> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| AuthError::Protocol("consent listener was never bound".to_string()))?;

        // Taking the listener out of self means it is dropped (and the port
        // released) when this frame unwinds: success, denial, and timeout
        // alike.
        match timeout(wait, serve_until_reply(&listener)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(wait = ?wait, "no consent callback before the deadline");
                Err(AuthError::HandshakeTimeout(wait))
            }
        }
    }
}

/// Accept connections until one carries the consent redirect.
///
/// Browsers also ask for things like `/favicon.ico`; those get a 404 and the
/// loop keeps waiting.
async fn serve_until_reply(listener: &TcpListener) -> Result<ConsentReply> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| AuthError::Network(format!("consent listener accept failed: {}", e)))?;
        debug!(%peer, "consent callback connection");

        let mut buf = vec![0u8; 4096];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| AuthError::Network(format!("failed to read consent callback: {}", e)))?;
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();

        let Some(target) = request_target(&request) else {
            respond(&mut stream, 400, "Bad request.").await;
            continue;
        };

        match parse_redirect(&target) {
            Redirect::Reply(reply) => {
                respond(
                    &mut stream,
                    200,
                    "Authorization received. You may close this tab and return to the terminal.",
                )
                .await;
                return Ok(reply);
            }
            Redirect::Denied => {
                respond(&mut stream, 200, "Authorization was denied.").await;
                return Err(AuthError::UserCancelled);
            }
            Redirect::Error(message) => {
                respond(&mut stream, 400, "Authorization failed.").await;
                return Err(AuthError::InvalidCallback(message));
            }
            Redirect::Unrelated => {
                respond(&mut stream, 404, "Not found.").await;
            }
        }
    }
}

enum Redirect {
    Reply(ConsentReply),
    Denied,
    Error(String),
    Unrelated,
}

/// Pull the request target out of an HTTP request line (`GET /x HTTP/1.1`).
fn request_target(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" {
        return None;
    }
    Some(target.to_string())
}

fn parse_redirect(target: &str) -> Redirect {
    let url = match Url::parse(&format!("http://127.0.0.1{}", target)) {
        Ok(url) => url,
        Err(e) => return Redirect::Error(format!("unparseable redirect target: {}", e)),
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return if error == "access_denied" {
            Redirect::Denied
        } else {
            Redirect::Error(format!("authorization server reported: {}", error))
        };
    }

    match (code, state) {
        (Some(code), Some(state)) => Redirect::Reply(ConsentReply { code, state }),
        (Some(_), None) => Redirect::Error("callback carried no state".to_string()),
        _ => Redirect::Unrelated,
    }
}

async fn respond(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Not Found",
    };
    let page = format!(
        "<!DOCTYPE html><html><body><p>{}</p></body></html>",
        body
    );
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        page.len(),
        page
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(error = %e, "failed to answer consent callback");
    }
}
