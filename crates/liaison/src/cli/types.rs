//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::{Decision, Role};

/// Account role for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArg {
    /// Generic member
    User,
    /// Independent professional
    Freelancer,
    /// Agency account
    Agency,
    /// Company account
    Company,
    /// Mentor
    Mentor,
    /// Recruiter
    Headhunter,
    /// Platform administrator
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Freelancer => Role::Freelancer,
            RoleArg::Agency => Role::Agency,
            RoleArg::Company => Role::Company,
            RoleArg::Mentor => Role::Mentor,
            RoleArg::Headhunter => Role::Headhunter,
            RoleArg::Admin => Role::Admin,
        }
    }
}

/// Response decision for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionArg {
    /// Accept the request
    Accept,
    /// Decline the request
    Reject,
    /// Take back your own request
    Withdraw,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Accept => Decision::Accept,
            DecisionArg::Reject => Decision::Reject,
            DecisionArg::Withdraw => Decision::Withdraw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_an_arg() {
        for role in Role::ALL {
            let arg = RoleArg::from_str(role.as_str(), true).unwrap();
            assert_eq!(Role::from(arg), role);
        }
    }

    #[test]
    fn test_decision_conversion() {
        assert_eq!(Decision::from(DecisionArg::Withdraw), Decision::Withdraw);
        assert_eq!(Decision::from(DecisionArg::Accept), Decision::Accept);
    }
}
