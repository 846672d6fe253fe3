use std::fmt::Write;

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};

use crate::state::EnvironmentState;

/// Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const CO2_GAUGE: &str = "co2meter_co2_ppms";
pub const TEMPERATURE_GAUGE: &str = "co2meter_temperature_celsius";

pub fn router(state: EnvironmentState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<EnvironmentState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], render(&state))
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Render the current readings as gauges.
pub fn render(state: &EnvironmentState) -> String {
    let mut out = String::new();
    write_gauge(&mut out, CO2_GAUGE, "CO2 reading in PPM.", f64::from(state.co2()));
    write_gauge(
        &mut out,
        TEMPERATURE_GAUGE,
        "Temperature reading in degree celsius.",
        state.temperature(),
    );
    out
}

fn write_gauge(out: &mut String, name: &str, help: &str, value: f64) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
}
