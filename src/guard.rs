use crate::types::Identity;

/// Decision for a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session resolution still in flight: render a placeholder. Never
    /// redirect here: that would bounce a user whose valid session simply
    /// has not resolved yet.
    Loading,
    /// Resolved and authenticated: render the protected content.
    Render,
    /// Resolved with no identity: redirect to the auth entry point.
    RedirectToSignIn,
}

/// Gate a protected view on a resolved, non-loading session.
#[must_use]
pub fn protect(identity: Option<&Identity>, is_loading: bool) -> RouteDecision {
    if is_loading {
        RouteDecision::Loading
    } else if identity.is_some() {
        RouteDecision::Render
    } else {
        RouteDecision::RedirectToSignIn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_identity;

    #[test]
    fn loading_always_wins() {
        let identity = test_identity();
        assert_eq!(protect(Some(&identity), true), RouteDecision::Loading);
        assert_eq!(protect(None, true), RouteDecision::Loading);
    }

    #[test]
    fn resolved_identity_renders() {
        let identity = test_identity();
        assert_eq!(protect(Some(&identity), false), RouteDecision::Render);
    }

    #[test]
    fn resolved_anonymous_redirects() {
        assert_eq!(protect(None, false), RouteDecision::RedirectToSignIn);
    }
}
