//! Single-page upload UI served over HTTP.
//!
//! Requests are handled one at a time on the calling thread; a caption
//! request runs the whole pipeline before the next request is read.


use tiny_http::{Header, Method, Response, Server};
use tracing::{error, info, warn};

use crate::error::StartupError;
use crate::pipeline::Captioner;

pub mod multipart;
pub mod page;

use self::page::Outcome;

/// Rendered response, independent of the HTTP library.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }
}

/// Mime type of an accepted upload, judged by its file name.
pub fn upload_mime(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

pub fn handle(
    captioner: &mut Captioner,
    method: &Method,
    path: &str,
    content_type: &str,
    body: &[u8],
) -> Reply {
    let path = path.split('?').next().unwrap_or("");
    match (method, path) {
        (Method::Get, "/") => Reply::html(200, page::render(Outcome::Empty)),
        (Method::Get, "/health") => Reply::text(200, "OK"),
        (Method::Post, "/caption") => caption(captioner, content_type, body),
        _ => Reply::text(404, "404 Not Found"),
    }
}

fn caption(captioner: &mut Captioner, content_type: &str, body: &[u8]) -> Reply {
    let rejected = |status: u16, message: &str| {
        warn!(status, message, "upload rejected");
        Reply::html(status, page::render(Outcome::Error(message.to_string())))
    };

    let boundary = match multipart::extract_boundary(content_type) {
        Some(b) if content_type.starts_with("multipart/form-data") => b,
        _ => return rejected(400, "Expected a multipart/form-data upload."),
    };
    let part = match multipart::extract_file(body, &boundary) {
        Some(part) if !part.bytes.is_empty() => part,
        _ => return rejected(400, "No image file was uploaded."),
    };
    let mime = match upload_mime(&part.filename) {
        Some(mime) => mime,
        None => return rejected(415, "Only jpg, jpeg and png images are accepted."),
    };

    match captioner.caption_bytes(&part.bytes) {
        Ok(caption) => Reply::html(
            200,
            page::render(Outcome::Captioned {
                image: &part.bytes,
                mime,
                caption: &caption,
                display: &captioner.config().display,
            }),
        ),
        Err(err) if err.is_decode() => rejected(400, &err.to_string()),
        Err(err) => {
            error!(error = %err, filename = %part.filename, "caption generation failed");
            Reply::html(
                500,
                page::render(Outcome::Error(format!("Caption generation failed: {}", err))),
            )
        }
    }
}

/// Binds `address` and serves requests until the listener closes.
pub fn serve(captioner: &mut Captioner, address: &str) -> Result<(), StartupError> {
    let server = Server::http(address).map_err(|e| StartupError::Bind {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    info!(address, "open http://{} in a browser", address);

    for mut request in server.incoming_requests() {
        let content_type = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_owned())
            .unwrap_or_default();

        let mut body = Vec::new();
        let reply = match request.as_reader().read_to_end(&mut body) {
            Ok(_) => handle(
                captioner,
                request.method(),
                request.url(),
                &content_type,
                &body,
            ),
            Err(err) => {
                warn!(error = %err, "cannot read request body");
                Reply::text(400, "cannot read request body")
            }
        };
        info!(method = %request.method(), url = request.url(), status = reply.status, "request");

        let mut response = Response::from_string(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }
        if let Err(err) = request.respond(response) {
            warn!(error = %err, "cannot send response");
        }
    }
    Ok(())
}
