//! HTTP route assembly.
//!
//! A public router and a protected router merged together, with
//! `auth_middleware` layered only on the protected half. Bare paths (no
//! `/api/v1` nest) since this system has no API-versioning prefix of its
//! own.

pub mod handlers;
pub mod view;
pub mod wire_body;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::auth_middleware;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/user/password", put(handlers::auth::change_password))
        .route("/dna-submit", post(handlers::auth::dna_submit))
        .route("/dna-login", post(handlers::auth::dna_login))
        .route("/v2/orders", get(handlers::orders::list_orders))
        .route("/v2/trades", get(handlers::orders::v2_trades))
        .route("/orders", get(handlers::v1::list_orders))
        .route("/collateral/:username", put(handlers::account::set_collateral))
        .route("/v2/stream/trades", get(handlers::stream::trades))
        .route("/v2/stream/order-book", get(handlers::stream::order_book))
        .route("/v2/stream/execution-reports", get(handlers::stream::execution_reports));

    let protected_routes = Router::new()
        .route("/balance", get(handlers::account::balance))
        .route("/v2/orders", post(handlers::orders::create_order))
        .route("/v2/orders/:order_id", put(handlers::orders::modify_order))
        .route("/v2/orders/:order_id", delete(handlers::orders::cancel_order))
        .route("/v2/my-orders", get(handlers::orders::my_orders))
        .route("/v2/my-trades", get(handlers::orders::my_trades))
        .route("/v2/bulk-operations", post(handlers::bulk::bulk_operations))
        .route("/orders", post(handlers::v1::submit_order))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

#[cfg(test)]
mod tests {
    //! End-to-end HTTP-layer tests driving the real router with
    //! `tower::ServiceExt::oneshot` and the GalacticBuf envelope instead of
    //! JSON bodies.

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::create_router;
    use crate::clock::FixedClock;
    use crate::config::AppConfig;
    use crate::engine::Engine;
    use crate::models::Contract;
    use crate::wire::{decode_message, encode_message, Message};
    use crate::AppState;

    fn test_app(now: i64) -> (axum::Router, Arc<AppState>) {
        let state = Arc::new(AppState {
            config: AppConfig {
                port: 0,
                persistent_dir: None,
            },
            engine: Arc::new(Engine::new(Arc::new(FixedClock::new(now)), None)),
        });
        (create_router(state.clone()).with_state(state.clone()), state)
    }

    async fn call(app: &axum::Router, method: &str, uri: &str, token: Option<&str>, body: Option<Message>) -> (StatusCode, Message) {
        let bytes = body.map(|m| encode_message(&m).unwrap()).unwrap_or_default();
        let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/x-galacticbuf");
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {t}"));
        }
        let request = builder.body(Body::from(bytes)).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let msg = if body_bytes.is_empty() { Message::new() } else { decode_message(&body_bytes).unwrap() };
        (status, msg)
    }

    #[tokio::test]
    async fn register_login_submit_order_roundtrips_over_http() {
        let contract = Contract::new(100 * Contract::HOUR_MS, 101 * Contract::HOUR_MS);
        let (app, _state) = test_app(contract.delivery_start - 3_600_000);

        let (status, _) = call(
            &app,
            "POST",
            "/register",
            None,
            Some(Message::new().set("username", "alice").set("password", "hunter2")),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // duplicate registration is a conflict
        let (status, _) = call(
            &app,
            "POST",
            "/register",
            None,
            Some(Message::new().set("username", "alice").set("password", "other")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(
            &app,
            "POST",
            "/login",
            None,
            Some(Message::new().set("username", "alice").set("password", "hunter2")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body.get_str("token").unwrap().to_string();

        // unauthenticated access to a protected route is rejected
        let (status, _) = call(&app, "GET", "/balance", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &app,
            "POST",
            "/v2/orders",
            Some(&token),
            Some(
                Message::new()
                    .set("side", "buy")
                    .set("price", 100i64)
                    .set("quantity", 5i64)
                    .set("delivery_start", contract.delivery_start)
                    .set("delivery_end", contract.delivery_end),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get_str("status"), Some("ACTIVE"));
        let order_id = body.get_str("order_id").unwrap().to_string();

        let (status, body) = call(
            &app,
            "GET",
            &format!(
                "/v2/orders?delivery_start={}&delivery_end={}",
                contract.delivery_start, contract.delivery_end
            ),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get_list("bids").unwrap().len(), 1);

        let (status, _) = call(&app, "DELETE", &format!("/v2/orders/{order_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // second cancel of the same id is a 404
        let (status, _) = call(&app, "DELETE", &format!("/v2/orders/{order_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
