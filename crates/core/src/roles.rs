//! The closed role enumeration and its single normalisation point.
//!
//! Historical data carries role strings with inconsistent casing and
//! spelling across rows ("admin", "Administrador", "especialista", ...).
//! All of that is absorbed here, once, at the data-access boundary; business
//! logic only ever sees [`Role`] values and never compares strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unauthenticated, or authenticated without a recognised role.
    /// Sees nothing, may do nothing.
    Guest,
    Patient,
    Specialist,
    Administrator,
}

impl Role {
    /// Normalises a stored role string into the closed enumeration.
    ///
    /// Accepts every spelling observed in production data, case-insensitively.
    /// Unknown strings yield `None`; callers treat that as deny-all, not as
    /// an error.
    pub fn normalise(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "patient" | "paciente" => Some(Role::Patient),
            "specialist" | "especialista" => Some(Role::Specialist),
            "admin" | "administrator" | "administrador" => Some(Role::Administrator),
            _ => None,
        }
    }

    /// Canonical stored spelling for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Patient => "patient",
            Role::Specialist => "specialist",
            Role::Administrator => "administrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_accepts_observed_spellings() {
        assert_eq!(Role::normalise("patient"), Some(Role::Patient));
        assert_eq!(Role::normalise("Paciente"), Some(Role::Patient));
        assert_eq!(Role::normalise("ESPECIALISTA"), Some(Role::Specialist));
        assert_eq!(Role::normalise("specialist"), Some(Role::Specialist));
        assert_eq!(Role::normalise("admin"), Some(Role::Administrator));
        assert_eq!(Role::normalise("Administrador"), Some(Role::Administrator));
        assert_eq!(Role::normalise("administrator"), Some(Role::Administrator));
    }

    #[test]
    fn test_normalise_trims_whitespace() {
        assert_eq!(Role::normalise("  paciente "), Some(Role::Patient));
    }

    #[test]
    fn test_normalise_rejects_unknown_strings() {
        assert_eq!(Role::normalise(""), None);
        assert_eq!(Role::normalise("root"), None);
        assert_eq!(Role::normalise("administradorr"), None);
    }
}
