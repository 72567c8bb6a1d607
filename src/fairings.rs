use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Status;
use rocket::{Data, Request, Response};

/// Logs method, URI and status of every request.
///
/// Bodies are never logged: they carry encrypted mnemonics and signing payloads.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request/Response Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let remote = request
            .remote()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            remote = %remote,
            "Incoming request"
        );
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let status = response.status();

        match status.class() {
            rocket::http::StatusClass::Success => tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                status = status.code,
                "Response"
            ),
            rocket::http::StatusClass::ServerError => tracing::error!(
                method = %request.method(),
                uri = %request.uri(),
                status = status.code,
                "Error response"
            ),
            _ => tracing::warn!(
                method = %request.method(),
                uri = %request.uri(),
                status = status.code,
                "Rejected request"
            ),
        }
    }
}

/// Reports 500 responses to Sentry.
///
/// Handlers already report the errors they map to 500; this also catches
/// panics and failures raised outside a handler.
pub struct PanicCatcher;

#[rocket::async_trait]
impl Fairing for PanicCatcher {
    fn info(&self) -> Info {
        Info {
            name: "Panic Catcher",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if response.status() == Status::InternalServerError {
            let method = request.method();
            let uri = request.uri();

            tracing::error!(
                "Internal Server Error detected for {} {} - possible panic or unhandled error",
                method,
                uri
            );

            sentry::capture_message(
                &format!("Internal Server Error: {method} {uri}"),
                sentry::Level::Error,
            );
        }
    }
}
