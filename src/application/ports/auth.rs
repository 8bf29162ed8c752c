use crate::domain::value_objects::AccessToken;

/// Read-only view of the current player session. Token refresh is owned by
/// the auth layer; the sync engine only surfaces an auth-expired pause and
/// expects the caller to re-trigger a drain once re-authenticated.
pub trait AuthProvider: Send + Sync {
    fn current_token(&self) -> Option<AccessToken>;
}
