//! Identity of the unprivileged user behind an elevated process

/// Resolves the "real" user who escalated privilege
///
/// Implement this trait to decide where the identity comes from
/// (the `SUDO_USER` environment in production, a fixed value in tests).
pub trait IdentitySource {
    /// Name of the underlying unprivileged user, if discoverable
    fn real_user(&self) -> Option<String>;
}

/// Identity source returning a fixed answer
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(pub Option<String>);

impl FixedIdentity {
    pub fn user(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl IdentitySource for FixedIdentity {
    fn real_user(&self) -> Option<String> {
        self.0.clone()
    }
}
