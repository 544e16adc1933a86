//! Logical navigation routes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    SignUp,
    Dashboard,
    GradeNew,
    GradeResult(String),
}

impl Route {
    /// Parses a request path; query strings and a trailing slash are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let base = trimmed.split_once('?').map_or(trimmed, |(base, _)| base);
        let base = if base.len() > 1 {
            base.trim_end_matches('/')
        } else {
            base
        };

        match base {
            "" | "/" => Some(Self::Landing),
            "/login" => Some(Self::Login),
            "/signup" => Some(Self::SignUp),
            "/dashboard" => Some(Self::Dashboard),
            "/grade/new" => Some(Self::GradeNew),
            other => {
                let id = other.strip_prefix("/grade/result/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Some(Self::GradeResult(id.to_string()))
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::SignUp => "/signup".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::GradeNew => "/grade/new".to_string(),
            Self::GradeResult(id) => format!("/grade/result/{id}"),
        }
    }

    /// Whether the view needs a signed-in identity.
    #[must_use]
    pub fn requires_identity(&self) -> bool {
        matches!(self, Self::Dashboard | Self::GradeNew | Self::GradeResult(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A request to activate another view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
}

impl Navigation {
    pub fn to(route: Route) -> Self {
        Self { to: route }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_path_round_trip() {
        let routes = [
            Route::Landing,
            Route::Login,
            Route::SignUp,
            Route::Dashboard,
            Route::GradeNew,
            Route::GradeResult("3f2a".into()),
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Some(route.clone()), "{route}");
        }
    }

    #[test]
    fn parse_ignores_query_and_trailing_slash() {
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(
            Route::parse("/grade/result/abc?hover=x"),
            Some(Route::GradeResult("abc".into()))
        );
    }

    #[test]
    fn parse_rejects_unknown_paths() {
        assert_eq!(Route::parse("/grade/result/"), None);
        assert_eq!(Route::parse("/grade/result/a/b"), None);
        assert_eq!(Route::parse("/admin"), None);
    }

    #[test]
    fn protected_routes() {
        assert!(Route::Dashboard.requires_identity());
        assert!(Route::GradeResult("x".into()).requires_identity());
        assert!(!Route::Login.requires_identity());
        assert!(!Route::Landing.requires_identity());
    }
}
