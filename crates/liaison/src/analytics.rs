//! Invitation response analytics.
//!
//! Computed from the connections a user has responded to as addressee.

use crate::domain::{Connection, ConnectionStatus};
use serde::{Deserialize, Serialize};

/// Acceptance rate and response latency for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationAnalytics {
    /// Percentage of responded invitations that were accepted, 0-100
    pub acceptance_rate: Option<u32>,

    /// Median hours between invitation and response
    pub median_response_hours: Option<f64>,

    /// Compact label for the median, e.g. "26h" or "3d"
    pub median_response: Option<String>,

    /// Number of responded invitations
    pub closed_count: usize,
}

/// Aggregate responded invitations.
///
/// Pending connections in `responded` are ignored. Latencies are
/// `updated_at - created_at`; negative values are discarded.
#[must_use]
pub fn compute(responded: &[Connection]) -> InvitationAnalytics {
    let closed: Vec<&Connection> = responded
        .iter()
        .filter(|c| matches!(c.status, ConnectionStatus::Accepted | ConnectionStatus::Rejected))
        .collect();

    let accepted = closed
        .iter()
        .filter(|c| c.status == ConnectionStatus::Accepted)
        .count();

    let acceptance_rate = if closed.is_empty() {
        None
    } else {
        Some(percentage(accepted, closed.len()))
    };

    #[allow(clippy::cast_precision_loss)]
    let latencies: Vec<f64> = closed
        .iter()
        .map(|c| (c.updated_at - c.created_at).num_seconds() as f64 / 3600.0)
        .filter(|hours| *hours >= 0.0)
        .collect();

    let median_response_hours = median(latencies);

    InvitationAnalytics {
        acceptance_rate,
        median_response_hours,
        median_response: median_response_hours.map(format_response_label),
        closed_count: closed.len(),
    }
}

/// Statistical median. `None` for an empty input.
#[must_use]
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        Some(values[mid])
    }
}

/// Compact latency label.
///
/// Under one hour is `"<1h"`; under 48 hours is whole hours; anything longer
/// is whole days.
#[must_use]
pub fn format_response_label(hours: f64) -> String {
    if hours < 1.0 {
        "<1h".to_string()
    } else if hours < 48.0 {
        format!("{}h", hours.round())
    } else {
        format!("{}d", (hours / 24.0).round())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> u32 {
    (100.0 * part as f64 / total as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionId, UserId};
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    fn responded(status: ConnectionStatus, hours: i64) -> Connection {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Connection {
            id: ConnectionId::new(format!("c{hours}")),
            requester_id: UserId::new("r"),
            addressee_id: UserId::new("me"),
            status,
            connected_at: None,
            last_interacted_at: None,
            relationship_tag: None,
            notes: None,
            created_at: created,
            updated_at: created + Duration::hours(hours),
        }
    }

    #[test]
    fn test_three_responses() {
        let analytics = compute(&[
            responded(ConnectionStatus::Accepted, 2),
            responded(ConnectionStatus::Rejected, 26),
            responded(ConnectionStatus::Accepted, 50),
        ]);

        assert_eq!(analytics.acceptance_rate, Some(67));
        assert_eq!(analytics.median_response_hours, Some(26.0));
        assert_eq!(analytics.median_response.as_deref(), Some("26h"));
        assert_eq!(analytics.closed_count, 3);
    }

    #[test]
    fn test_no_history() {
        let analytics = compute(&[]);
        assert_eq!(analytics, InvitationAnalytics::default());
    }

    #[test]
    fn test_negative_latency_is_discarded_but_counted() {
        let analytics = compute(&[
            responded(ConnectionStatus::Accepted, -5),
            responded(ConnectionStatus::Rejected, 4),
        ]);
        assert_eq!(analytics.acceptance_rate, Some(50));
        assert_eq!(analytics.median_response_hours, Some(4.0));
        assert_eq!(analytics.closed_count, 2);
    }

    #[test]
    fn test_pending_is_ignored() {
        let analytics = compute(&[responded(ConnectionStatus::Pending, 3)]);
        assert_eq!(analytics.closed_count, 0);
        assert!(analytics.acceptance_rate.is_none());
    }

    #[rstest]
    #[case(vec![], None)]
    #[case(vec![3.0], Some(3.0))]
    #[case(vec![9.0, 1.0, 4.0], Some(4.0))]
    #[case(vec![1.0, 2.0, 3.0, 10.0], Some(2.5))]
    fn test_median(#[case] values: Vec<f64>, #[case] expected: Option<f64>) {
        assert_eq!(median(values), expected);
    }

    #[rstest]
    #[case(0.2, "<1h")]
    #[case(1.0, "1h")]
    #[case(5.6, "6h")]
    #[case(26.0, "26h")]
    #[case(47.4, "47h")]
    #[case(50.0, "2d")]
    #[case(84.0, "4d")]
    fn test_format_response_label(#[case] hours: f64, #[case] expected: &str) {
        assert_eq!(format_response_label(hours), expected);
    }
}
