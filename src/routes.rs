use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{
    book_appointment, cancel_appointment, get_availability, health_check, list_appointments,
    AppState,
};

pub fn create_router(app_state: Arc<AppState>, is_production: bool) -> Router {
    let mut router = Router::new();

    // Health check is always available
    let health_route = Router::new().route("/health", get(health_check));
    router = router.merge(health_route);

    // The two core entry points are always available
    let core_routes = Router::new()
        .route("/availability", get(get_availability))
        .route("/bookings", post(book_appointment));
    router = router.merge(core_routes);

    // Only add management API routes if not in production mode
    if !is_production {
        let management_routes = Router::new()
            .route("/appointments", get(list_appointments))
            .route("/appointments/:appointment_id/cancel", post(cancel_appointment));

        router = router.merge(management_routes);

        info!("Management API routes enabled - server running in development mode");
    } else {
        info!("Running in production mode - only core and health endpoints exposed");
    }

    router.with_state(app_state)
}
