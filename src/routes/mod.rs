/// Router Module Index
///
/// Routes are split by access level so that authentication is applied as a router layer,
/// never remembered per handler.

/// Routes open to anonymous clients. Post reads only ever expose approved posts.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes under `/admin`. Authenticated like the above, then checked against the policy in
/// each handler.
pub mod admin;
