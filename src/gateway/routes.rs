use std::io::Cursor;
use std::sync::Arc;

use rocket::http::{Method, Status};
use rocket::response::{self, Responder};
use rocket::route::{Handler, Outcome};
use rocket::{Data, Request, Response, Route};

use crate::error::ApiError;
use crate::gateway::GatewayState;
use crate::gateway::proxy::ForwardResponse;

/// Rank below every static route so local endpoints (health) win.
const GATEWAY_RANK: isize = 20;

const PROXIED_METHODS: [Method; 5] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Patch,
    Method::Delete,
];

pub enum GatewayResponse {
    Proxied(ForwardResponse),
    Failed(ApiError),
}

impl<'r> Responder<'r, 'static> for GatewayResponse {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match self {
            GatewayResponse::Failed(err) => err.respond_to(request),
            GatewayResponse::Proxied(forwarded) => {
                let mut builder = Response::build();
                builder.status(Status::new(forwarded.status));
                for (name, value) in forwarded.headers {
                    builder.raw_header_adjoin(name, value);
                }
                let len = forwarded.body.len();
                builder.sized_body(len, Cursor::new(forwarded.body)).ok()
            }
        }
    }
}

#[derive(Clone)]
pub struct GatewayHandler {
    state: Arc<GatewayState>,
}

#[rocket::async_trait]
impl Handler for GatewayHandler {
    async fn handle<'r>(&self, request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r> {
        let response = self.state.handle(request, data).await;
        Outcome::from(request, response)
    }
}

/// Catch-all routes that push every method and path through the gateway.
pub fn routes(state: Arc<GatewayState>) -> Vec<Route> {
    let handler = GatewayHandler { state };
    PROXIED_METHODS
        .into_iter()
        .map(|method| Route::ranked(GATEWAY_RANK, method, "/<path..>", handler.clone()))
        .collect()
}
