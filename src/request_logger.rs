use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// How the gateway settled authentication for a request, recorded in the
/// request-local cache so the access log can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthTrace {
    #[default]
    NotApplicable,
    Public,
    Remote,
    LocalFallback,
    Rejected,
}

impl AuthTrace {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthTrace::NotApplicable => "-",
            AuthTrace::Public => "public",
            AuthTrace::Remote => "remote",
            AuthTrace::LocalFallback => "local-fallback",
            AuthTrace::Rejected => "rejected",
        }
    }
}

/// Start time of the request, cached on arrival.
struct RequestStart(Instant);

/// Fairing that writes one access-log line per request.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let duration = request.local_cache(|| RequestStart(Instant::now())).0.elapsed();
        let auth = request.local_cache(AuthTrace::default);

        log::info!(
            "{} {} -> {} ({:.2}ms) auth={}",
            request.method(),
            request.uri(),
            response.status().code,
            duration.as_secs_f64() * 1000.0,
            auth.as_str()
        );
    }
}
