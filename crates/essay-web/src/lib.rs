//! essay-web: HTTP front end for the essay grader.
//!
//! Pages are rendered server-side; the session token travels as a bearer
//! header or an HttpOnly cookie.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod views;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "essay-web"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "essay-web");
    }
}
