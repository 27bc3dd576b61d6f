/* 📖 # Why tiny_http?

The engine is synchronous: rendering a resource is a walk over immutable
representors and does not wait on anything but the route handlers. tiny_http
matches that model, spawns nothing we do not ask for, and keeps the dependency
tree small. Each request is handled on its own thread so a slow route handler
does not block the accept loop.
*/

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use crate::{HyperresResult, err};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Start serving `service` on a background thread.
///
/// Returns once the socket is bound. The server stops when the returned handle
/// (and all its clones) are dropped or `shutdown()` is called.
pub fn start_http_server(
    service: Arc<dyn HttpService>,
    config: &HttpServerConfig,
) -> HyperresResult<HttpServerHandle> {
    let address = config.address();
    let server = tiny_http::Server::http(&address).map_err(|e| {
        err!(configuration, "failed to bind HTTP server to {}: {}", address, e)
    })?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .unwrap_or_default();

    let handle = HttpServerHandle::new(port);
    let shutdown = handle.shutdown_flag();
    let server_name = config.server_name.clone();
    info!(address = %address, port, "HTTP server listening");

    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            let request = match server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "failed to receive HTTP request");
                    continue;
                }
            };
            let service = service.clone();
            let server_name = server_name.clone();
            thread::spawn(move || serve_request(service.as_ref(), request, &server_name));
        }
        info!(port, "HTTP server stopped");
    });

    Ok(handle)
}

fn serve_request(service: &dyn HttpService, mut request: tiny_http::Request, server_name: &str) {
    let response = match to_http_request(&mut request) {
        Ok(http_request) => {
            debug!(method = %http_request.method(), path = http_request.path(), "handling request");
            match service.handle_request(http_request) {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "service failed to handle request");
                    failure_response(&e.to_string())
                }
            }
        }
        Err(response) => response,
    };

    let status = response.status().as_u16();
    let mut tiny_response = tiny_http::Response::from_data(response.body().as_bytes().to_vec())
        .with_status_code(status);
    let headers = response
        .headers()
        .all()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(std::iter::once(("Server", server_name)));
    for (key, value) in headers {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => tiny_response = tiny_response.with_header(header),
            Err(()) => warn!(header = key, "dropping invalid response header"),
        }
    }

    if let Err(e) = request.respond(tiny_response) {
        warn!(error = %e, "failed to write HTTP response");
    }
}

/// Convert a tiny_http request, or answer it directly when the service must not see it.
fn to_http_request(request: &mut tiny_http::Request) -> Result<HttpRequest, HttpResponse> {
    let method = HttpMethod::parse(&request.method().to_string())
        .ok_or_else(|| HttpResponse::new(HttpStatusCode::MethodNotAllowed))?;
    let mut http_request = HttpRequest::new(method, request.url());
    for header in request.headers() {
        http_request
            .headers_mut()
            .insert(header.field.as_str().as_str(), header.value.as_str());
    }
    let body = read_body(request.as_reader())?;
    Ok(http_request.with_body(body))
}

/// A body that cannot be read completely is answered with 400. Passing on the
/// partial body would blame the client for a truncated JSON document instead.
fn read_body(mut reader: impl Read) -> Result<Vec<u8>, HttpResponse> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body).map_err(|e| {
        warn!(error = %e, bytes_read = body.len(), "failed to read request body");
        json_error(HttpStatusCode::BadRequest, &format!("failed to read request body: {}", e))
    })?;
    Ok(body)
}

/// Unexpected service failures are answered with 599 so they are easy to tell apart.
fn failure_response(message: &str) -> HttpResponse {
    json_error(HttpStatusCode::NetworkConnectTimeoutError, message)
}

fn json_error(status: HttpStatusCode, message: &str) -> HttpResponse {
    HttpResponse::new(status)
        .with_content_type("application/json")
        .with_body(format!(r#"{{"error":"{}"}}"#, escape_json(message)))
}

/// Escape special characters for JSON strings.
fn escape_json(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '"' => "\\\"".to_string(),
            '\\' => "\\\\".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        })
        .collect()
}
