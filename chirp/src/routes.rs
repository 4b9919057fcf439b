//! Client-side routes and the protected-route gate.

use std::fmt;

use crate::model::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Profile,
    Login,
    CreateAccount,
    ResetPassword,
    /// Waiting for the user to confirm their email address.
    Verification,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Profile,
        Route::Login,
        Route::CreateAccount,
        Route::ResetPassword,
        Route::Verification,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Profile => "/profile",
            Route::Login => "/login",
            Route::CreateAccount => "/create-account",
            Route::ResetPassword => "/reset-password",
            // spelled as deployed; links in sent emails point here
            Route::Verification => "/vertification",
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Routes that render only for a verified identity.
    pub const fn is_protected(self) -> bool {
        matches!(self, Route::Home | Route::Profile)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of the protected-route check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Render,
    Redirect(Route),
}

/// One-shot check evaluated on every render of a protected route.
pub fn guard(identity: Option<&Identity>) -> Gate {
    match identity {
        None => Gate::Redirect(Route::Login),
        Some(identity) if !identity.email_verified => Gate::Redirect(Route::Verification),
        Some(_) => Gate::Render,
    }
}

/// Resolves a navigation request to the route that ends up rendered.
///
/// Unknown paths fall back to home, which is itself protected.
pub fn resolve(path: &str, identity: Option<&Identity>) -> Route {
    let route = Route::parse(path).unwrap_or(Route::Home);
    if !route.is_protected() {
        return route;
    }
    match guard(identity) {
        Gate::Render => route,
        Gate::Redirect(target) => target,
    }
}
