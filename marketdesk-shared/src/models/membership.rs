/// Membership status of an organization
///
/// Membership decides which pricing tier applies to an organization. Paid
/// members get the discounted tier; everybody else is priced as a
/// non-member.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_status AS ENUM ('member_paid', 'not-a-member');
/// ```
///
/// The same type is used for the membership of an account and for the tier a
/// pricing configuration applies to.
///
/// # Example
///
/// ```
/// use marketdesk_shared::models::membership::MembershipStatus;
///
/// assert_eq!(MembershipStatus::from_caller("member_paid"), MembershipStatus::MemberPaid);
/// assert_eq!(MembershipStatus::from_caller("member_unpaid"), MembershipStatus::NotAMember);
/// assert!(MembershipStatus::MemberPaid.is_paid_member());
/// ```

use serde::{Deserialize, Serialize};

/// Paid membership vs. standard pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_status")]
pub enum MembershipStatus {
    /// Organization holds an active, paid membership
    #[serde(rename = "member_paid")]
    #[sqlx(rename = "member_paid")]
    MemberPaid,

    /// Organization is not a paying member
    #[serde(rename = "not-a-member", alias = "not_a_member")]
    #[sqlx(rename = "not-a-member")]
    NotAMember,
}

impl MembershipStatus {
    /// Wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::MemberPaid => "member_paid",
            MembershipStatus::NotAMember => "not-a-member",
        }
    }

    /// Maps a caller-supplied status string to a pricing tier
    ///
    /// Only the exact value `"member_paid"` (surrounding whitespace and case
    /// ignored) counts as a paid membership. Any other value, including
    /// unknown statuses such as `"member_unpaid"`, prices as a non-member.
    pub fn from_caller(status: &str) -> Self {
        if status.trim().eq_ignore_ascii_case("member_paid") {
            MembershipStatus::MemberPaid
        } else {
            MembershipStatus::NotAMember
        }
    }

    /// Whether this tier receives member discounts
    pub fn is_paid_member(&self) -> bool {
        matches!(self, MembershipStatus::MemberPaid)
    }
}

impl Default for MembershipStatus {
    fn default() -> Self {
        MembershipStatus::NotAMember
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_caller() {
        assert_eq!(MembershipStatus::from_caller("member_paid"), MembershipStatus::MemberPaid);
        assert_eq!(MembershipStatus::from_caller(" MEMBER_PAID "), MembershipStatus::MemberPaid);
        assert_eq!(MembershipStatus::from_caller("not-a-member"), MembershipStatus::NotAMember);
        assert_eq!(MembershipStatus::from_caller(""), MembershipStatus::NotAMember);
        assert_eq!(MembershipStatus::from_caller("member_unpaid"), MembershipStatus::NotAMember);
    }

    #[test]
    fn test_serde_representation() {
        let json = serde_json::to_string(&MembershipStatus::NotAMember).unwrap();
        assert_eq!(json, "\"not-a-member\"");

        let parsed: MembershipStatus = serde_json::from_str("\"not_a_member\"").unwrap();
        assert_eq!(parsed, MembershipStatus::NotAMember);

        let parsed: MembershipStatus = serde_json::from_str("\"member_paid\"").unwrap();
        assert_eq!(parsed, MembershipStatus::MemberPaid);
    }

    #[test]
    fn test_default_is_not_a_member() {
        assert_eq!(MembershipStatus::default(), MembershipStatus::NotAMember);
        assert!(!MembershipStatus::default().is_paid_member());
    }
}
