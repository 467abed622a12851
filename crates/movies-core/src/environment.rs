//! Deployment environment detection.

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;

pub const APPLICATION_NAME_VAR: &str = "COPILOT_APPLICATION_NAME";
pub const ENVIRONMENT_NAME_VAR: &str = "COPILOT_ENVIRONMENT_NAME";
pub const SERVICE_NAME_VAR: &str = "COPILOT_SERVICE_NAME";

/// Name under which this process reports telemetry
///
/// Returns `{app}-{env}-{svc}` when the deployment sets all three Copilot
/// variables, otherwise `fallback`.
pub fn service_name(fallback: &str) -> String {
    compose_service_name(
        read(APPLICATION_NAME_VAR),
        read(ENVIRONMENT_NAME_VAR),
        read(SERVICE_NAME_VAR),
    )
    .unwrap_or_else(|| fallback.to_string())
}

fn compose_service_name(
    application: Option<String>,
    environment: Option<String>,
    service: Option<String>,
) -> Option<String> {
    match (application, environment, service) {
        (Some(app), Some(env), Some(svc)) => Some(format!("{}-{}-{}", app, env, svc)),
        _ => None,
    }
}

fn read(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
