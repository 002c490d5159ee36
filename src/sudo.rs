//! Identity of the user behind `sudo`
//!
//! The installer runs as root for the whole process; the roles still need
//! to know which desktop user to configure. That user comes from `SUDO_USER`.

use playbook::IdentitySource;

/// Environment variable set by sudo to the invoking user
pub const ENV_SUDO_USER: &str = "SUDO_USER";

/// Resolves the real user from the sudo environment
pub struct SudoIdentity;

impl IdentitySource for SudoIdentity {
    fn real_user(&self) -> Option<String> {
        sudo_user(std::env::var(ENV_SUDO_USER).ok())
    }
}

fn sudo_user(value: Option<String>) -> Option<String> {
    value.filter(|user| !user.trim().is_empty())
}

/// Whether the process runs with an effective uid of root
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sudo_user_present() {
        assert_eq!(sudo_user(Some("alice".to_string())), Some("alice".to_string()));
    }

    #[test]
    fn test_sudo_user_missing_or_blank() {
        assert_eq!(sudo_user(None), None);
        assert_eq!(sudo_user(Some(String::new())), None);
        assert_eq!(sudo_user(Some("  ".to_string())), None);
    }
}
