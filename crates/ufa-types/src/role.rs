use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Party allowed to create an agreement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitterRole {
    Seller,
    Buyer,
}

impl SubmitterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seller => "SELLER",
            Self::Buyer => "BUYER",
        }
    }
}

impl FromStr for SubmitterRole {
    type Err = TypeError;

    /// Role names are matched exactly; `"seller"` is not a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SELLER" => Ok(Self::Seller),
            "BUYER" => Ok(Self::Buyer),
            other => Err(TypeError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for SubmitterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("SELLER".parse::<SubmitterRole>().unwrap(), SubmitterRole::Seller);
        assert_eq!("BUYER".parse::<SubmitterRole>().unwrap(), SubmitterRole::Buyer);
    }

    #[test]
    fn role_match_is_case_sensitive() {
        assert_eq!(
            "seller".parse::<SubmitterRole>(),
            Err(TypeError::UnknownRole("seller".into()))
        );
        assert!("AUDITOR".parse::<SubmitterRole>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for role in [SubmitterRole::Seller, SubmitterRole::Buyer] {
            assert_eq!(role.to_string().parse::<SubmitterRole>().unwrap(), role);
        }
    }
}
