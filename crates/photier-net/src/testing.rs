//! Canned-response HTTP server for tests.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::net::{Ipv4Addr, TcpListener};

#[derive(Clone, Copy)]
pub struct Route {
    method: &'static str,
    path: &'static str,
    status: u16,
    body: &'static [u8],
}

impl Route {
    pub fn new(method: &'static str, path: &'static str, status: u16, body: &'static [u8]) -> Self {
        Self {
            method,
            path,
            status,
            body,
        }
    }
}

/// Serve `routes` on an ephemeral localhost port; returns the base URL.
/// Anything unrouted answers 404.
pub async fn serve(routes: Vec<Route>) -> String {
    let mut app = Router::new();
    for route in routes {
        let status = StatusCode::from_u16(route.status).unwrap();
        let body = route.body;
        let handler = move || async move { (status, body) };
        app = match route.method {
            "POST" => app.route(route.path, post(handler)),
            _ => app.route(route.path, get(handler)),
        };
    }

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}
