//! Presentation-ready summaries of users.
//!
//! [`hydrate`] turns a set of user IDs into [`NodeSummary`] values with one
//! batched store read. Missing profile data becomes `None` or an empty list;
//! summarizing never fails.

use crate::domain::{Profile, Role, User, UserId};
use crate::error::Result;
use crate::storage::NetworkStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Display name used when a referenced user has no record.
pub const UNKNOWN_MEMBER: &str = "Unknown member";

/// User summary shown in network lists, paths and invitations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    /// User ID
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Account role
    pub role: Role,

    /// Professional headline
    pub headline: Option<String>,

    /// Location
    pub location: Option<String>,

    /// Avatar reference
    pub avatar_url: Option<String>,

    /// Biography
    pub bio: Option<String>,

    /// Focus areas, trimmed and de-duplicated
    pub focus_areas: Vec<String>,

    /// Ordered availability descriptors
    pub availability: Vec<String>,

    /// Trust score
    pub trust_score: Option<f64>,
}

/// Build the summary for one user.
#[must_use]
pub fn summarize(user: &User) -> NodeSummary {
    let profile = user.profile.as_ref();

    NodeSummary {
        id: user.id.clone(),
        name: display_name(user),
        role: user.role,
        headline: profile.and_then(|p| non_blank(p.headline.as_deref())),
        location: profile.and_then(|p| non_blank(p.location.as_deref())),
        avatar_url: profile.and_then(|p| non_blank(p.avatar_url.as_deref())),
        bio: profile.and_then(|p| non_blank(p.bio.as_deref())),
        focus_areas: profile
            .map(|p| normalize_list(&p.focus_areas))
            .unwrap_or_default(),
        availability: profile.map(availability).unwrap_or_default(),
        trust_score: profile.and_then(|p| p.trust_score),
    }
}

/// Display name: full name, then email, then the raw ID.
#[must_use]
pub fn display_name(user: &User) -> String {
    let full = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if !full.is_empty() {
        return full;
    }

    non_blank(user.email.as_deref()).unwrap_or_else(|| user.id.to_string())
}

/// Batch-load `ids` and summarize every user that exists.
///
/// IDs are de-duplicated before the single [`NetworkStore::get_users`] call.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn hydrate<'a, I>(
    store: &dyn NetworkStore,
    ids: I,
) -> Result<HashMap<UserId, NodeSummary>>
where
    I: IntoIterator<Item = &'a UserId>,
{
    let unique: BTreeSet<&UserId> = ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<UserId> = unique.into_iter().cloned().collect();
    let users = store.get_users(&ids).await?;
    debug!(requested = ids.len(), found = users.len(), "Hydrated node summaries");

    Ok(users
        .into_iter()
        .map(|(id, user)| (id, summarize(&user)))
        .collect())
}

/// Availability descriptors in a fixed order: status, hours, remote flag,
/// notes. Preferred engagements are used only when none of those are set.
fn availability(profile: &Profile) -> Vec<String> {
    let mut descriptors = Vec::new();

    if let Some(status) = non_blank(profile.availability_status.as_deref()) {
        descriptors.push(humanize(&status));
    }
    if let Some(hours) = profile.weekly_hours {
        descriptors.push(format!("{hours} hrs/week"));
    }
    match profile.remote {
        Some(true) => descriptors.push("Remote friendly".to_string()),
        Some(false) => descriptors.push("On-site".to_string()),
        None => {}
    }
    if let Some(notes) = non_blank(profile.availability_notes.as_deref()) {
        descriptors.push(notes);
    }

    if descriptors.is_empty() {
        descriptors = normalize_list(&profile.preferred_engagements);
    }

    descriptors
}

/// `"open_to_work"` -> `"Open to work"`.
fn humanize(raw: &str) -> String {
    let spaced = raw.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trim entries, drop blanks and case-insensitive duplicates, keep order.
fn normalize_list(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CountingStore;
    use crate::storage::in_memory::InMemoryStore;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Ada"), Some("Lovelace"), Some("ada@example.com"), "Ada Lovelace")]
    #[case(Some("Ada"), None, None, "Ada")]
    #[case(Some("  "), None, Some("ada@example.com"), "ada@example.com")]
    #[case(None, None, None, "u1")]
    fn test_display_name_fallbacks(
        #[case] first: Option<&str>,
        #[case] last: Option<&str>,
        #[case] email: Option<&str>,
        #[case] expected: &str,
    ) {
        let mut user = User::new("u1", Role::User);
        user.first_name = first.map(str::to_string);
        user.last_name = last.map(str::to_string);
        user.email = email.map(str::to_string);
        assert_eq!(display_name(&user), expected);
    }

    #[test]
    fn test_summary_without_profile_is_all_empty() {
        let summary = summarize(&User::new("u1", Role::Mentor));
        assert_eq!(summary.role, Role::Mentor);
        assert!(summary.headline.is_none());
        assert!(summary.focus_areas.is_empty());
        assert!(summary.availability.is_empty());
        assert!(summary.trust_score.is_none());
    }

    #[test]
    fn test_availability_order() {
        let profile = Profile {
            availability_status: Some("open_to_work".into()),
            weekly_hours: Some(20),
            remote: Some(true),
            availability_notes: Some(" Evenings only ".into()),
            preferred_engagements: vec!["contract".into()],
            ..Profile::default()
        };
        assert_eq!(
            availability(&profile),
            vec!["Open to work", "20 hrs/week", "Remote friendly", "Evenings only"]
        );
    }

    #[test]
    fn test_availability_falls_back_to_engagements() {
        let profile = Profile {
            preferred_engagements: vec!["Contract".into(), "contract".into(), " advisory ".into()],
            ..Profile::default()
        };
        assert_eq!(availability(&profile), vec!["Contract", "advisory"]);

        let on_site = Profile {
            remote: Some(false),
            preferred_engagements: vec!["contract".into()],
            ..Profile::default()
        };
        assert_eq!(availability(&on_site), vec!["On-site"]);
    }

    #[test]
    fn test_focus_areas_are_normalized() {
        let user = User::new("u1", Role::Freelancer).with_profile(Profile {
            focus_areas: vec![" Rust ".into(), "rust".into(), String::new(), "Go".into()],
            ..Profile::default()
        });
        assert_eq!(summarize(&user).focus_areas, vec!["Rust", "Go"]);
    }

    #[tokio::test]
    async fn test_hydrate_issues_one_batch_and_skips_missing() {
        let store = CountingStore::new(InMemoryStore::new());
        store.upsert_user(User::new("a", Role::User)).await.unwrap();
        store.upsert_user(User::new("b", Role::Agency)).await.unwrap();

        let ids = [UserId::new("a"), UserId::new("b"), UserId::new("a"), UserId::new("gone")];
        let summaries = hydrate(&store, ids.iter()).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[&UserId::new("b")].role, Role::Agency);
        assert_eq!(store.counts().get_users, 1);
        assert_eq!(store.counts().get_user, 0);
    }

    #[tokio::test]
    async fn test_hydrate_empty_input_skips_store() {
        let store = CountingStore::new(InMemoryStore::new());
        let summaries = hydrate(&store, std::iter::empty()).await.unwrap();
        assert!(summaries.is_empty());
        assert_eq!(store.counts().get_users, 0);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let user = User::new("u1", Role::User).with_profile(Profile {
            avatar_url: Some("a.png".into()),
            trust_score: Some(4.5),
            ..Profile::default()
        });
        let json = serde_json::to_value(summarize(&user)).unwrap();
        assert_eq!(json["avatarUrl"], "a.png");
        assert_eq!(json["trustScore"], 4.5);
        assert_eq!(json["focusAreas"], serde_json::json!([]));
    }
}
