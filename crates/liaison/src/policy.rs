//! Role-based connection policy.
//!
//! The matrix maps each role to the roles it may connect with. A connection
//! between two users is permitted only when each side's role appears in the
//! other side's allowed set, so the check is symmetric regardless of how the
//! table itself is written.
//!
//! Roles without an explicit entry fall back to [`DEFAULT_ALLOWED`].

use crate::domain::Role;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Allowed set for any role that has no explicit entry.
pub const DEFAULT_ALLOWED: [Role; 4] = [Role::User, Role::Freelancer, Role::Agency, Role::Company];

/// Mapping from role to the roles it may connect with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyMatrix {
    rules: BTreeMap<Role, BTreeSet<Role>>,
}

impl PolicyMatrix {
    /// Build a matrix from explicit rules. Unlisted roles use the fallback set.
    pub fn new<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = (Role, R)>,
        R: IntoIterator<Item = Role>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(role, allowed)| (role, allowed.into_iter().collect()))
                .collect(),
        }
    }

    /// The matrix shipped with liaison.
    #[must_use]
    pub fn builtin() -> Self {
        use Role::{Admin, Agency, Company, Freelancer, Headhunter, Mentor, User};

        Self::new([
            (User, vec![User, Freelancer, Agency, Company, Mentor]),
            (
                Freelancer,
                vec![User, Freelancer, Agency, Company, Mentor, Headhunter],
            ),
            (Agency, vec![User, Freelancer, Agency, Company, Headhunter]),
            (
                Company,
                vec![User, Freelancer, Agency, Company, Mentor, Headhunter],
            ),
            (Mentor, vec![User, Freelancer, Company, Mentor]),
            (Headhunter, vec![Freelancer, Agency, Company, Headhunter]),
            (Admin, vec![Admin]),
        ])
    }

    /// Replace the entries for the roles present in `overrides`.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<Role, Vec<Role>>) -> Self {
        for (role, allowed) in overrides {
            self.rules
                .insert(*role, allowed.iter().copied().collect::<BTreeSet<_>>());
        }
        self
    }

    /// Roles that `role` may initiate a connection toward.
    #[must_use]
    pub fn allowed(&self, role: Role) -> BTreeSet<Role> {
        self.rules
            .get(&role)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ALLOWED.into_iter().collect())
    }

    /// Symmetric check: each role must appear in the other's allowed set.
    #[must_use]
    pub fn is_allowed(&self, a: Role, b: Role) -> bool {
        self.permits(a, b) && self.permits(b, a)
    }

    fn permits(&self, from: Role, to: Role) -> bool {
        match self.rules.get(&from) {
            Some(allowed) => allowed.contains(&to),
            None => DEFAULT_ALLOWED.contains(&to),
        }
    }

    /// Full table with fallbacks resolved, for every role.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Role, Vec<Role>> {
        Role::ALL
            .into_iter()
            .map(|role| (role, self.allowed(role).into_iter().collect()))
            .collect()
    }
}

impl Default for PolicyMatrix {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::ALL.to_vec())
    }

    #[rstest]
    #[case(Role::Admin, Role::Admin, true)]
    #[case(Role::Admin, Role::Freelancer, false)]
    #[case(Role::Freelancer, Role::Admin, false)]
    #[case(Role::User, Role::Mentor, true)]
    #[case(Role::Headhunter, Role::User, false)]
    #[case(Role::Freelancer, Role::Headhunter, true)]
    fn test_builtin_pairs(#[case] a: Role, #[case] b: Role, #[case] expected: bool) {
        assert_eq!(PolicyMatrix::builtin().is_allowed(a, b), expected);
    }

    #[test]
    fn test_unlisted_role_uses_fallback() {
        let matrix = PolicyMatrix::new([(Role::Admin, vec![Role::Admin])]);

        assert_eq!(
            matrix.allowed(Role::Mentor),
            DEFAULT_ALLOWED.into_iter().collect()
        );
        assert!(matrix.is_allowed(Role::Freelancer, Role::Company));
        // Mentor is in nobody's fallback set
        assert!(!matrix.is_allowed(Role::User, Role::Mentor));
    }

    #[test]
    fn test_one_sided_entry_is_not_enough() {
        let matrix = PolicyMatrix::new([
            (Role::Mentor, vec![Role::Headhunter]),
            (Role::Headhunter, vec![Role::Freelancer]),
        ]);
        assert!(!matrix.is_allowed(Role::Mentor, Role::Headhunter));
    }

    #[test]
    fn test_overrides_replace_entries() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Role::Admin, vec![Role::Admin, Role::User]);
        overrides.insert(Role::User, vec![Role::Admin]);

        let matrix = PolicyMatrix::builtin().with_overrides(&overrides);
        assert!(matrix.is_allowed(Role::Admin, Role::User));
        assert!(!matrix.is_allowed(Role::User, Role::Freelancer));
    }

    #[test]
    fn test_snapshot_covers_every_role() {
        let snapshot = PolicyMatrix::new(Vec::<(Role, Vec<Role>)>::new()).snapshot();
        assert_eq!(snapshot.len(), Role::ALL.len());
        assert_eq!(snapshot[&Role::Admin], DEFAULT_ALLOWED.to_vec());
    }

    #[test]
    fn test_matrix_deserializes_from_yaml() {
        let yaml = "admin: [admin]\nuser: [user, mentor]\n";
        let matrix: PolicyMatrix = serde_yaml::from_str(yaml).unwrap();
        assert!(matrix.allowed(Role::User).contains(&Role::Mentor));
    }

    proptest! {
        #[test]
        fn prop_builtin_is_symmetric(a in any_role(), b in any_role()) {
            let matrix = PolicyMatrix::builtin();
            prop_assert_eq!(matrix.is_allowed(a, b), matrix.is_allowed(b, a));
        }

        #[test]
        fn prop_arbitrary_matrix_is_symmetric(
            entries in proptest::collection::vec(
                (any_role(), proptest::collection::vec(any_role(), 0..7)),
                0..7,
            ),
            a in any_role(),
            b in any_role(),
        ) {
            let matrix = PolicyMatrix::new(entries);
            prop_assert_eq!(matrix.is_allowed(a, b), matrix.is_allowed(b, a));
        }
    }
}
