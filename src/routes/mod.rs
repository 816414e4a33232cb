/// Router Module Index
///
/// Routes are split by the gate they sit behind. The split is what enforces
/// access: each group gets its gate as a route layer in `create_router`, so a
/// handler cannot end up in the wrong tier by accident.

/// Routes open to anonymous callers. Handlers that return content take a
/// `MaybeUser` and run every item through the visibility policy.
pub mod public;

/// Routes behind `require_auth`. Anonymous callers get 401.
pub mod authenticated;

/// Routes behind `require_admin`, nested under `/admin`.
pub mod admin;
