use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DocumentStatus;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!("unknown transition policy '{other}'")),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::Permissive => f.write_str("permissive"),
            TransitionPolicy::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Workflow {
    policy: TransitionPolicy,
}

impl Workflow {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Returns the status that should be stored when `requested` is asked for
    /// on a document currently in `current`.
    pub fn resolve(
        &self,
        current: DocumentStatus,
        requested: DocumentStatus,
    ) -> StoreResult<DocumentStatus> {
        let target = effective_target(current, requested);
        if target == current || self.policy == TransitionPolicy::Permissive {
            return Ok(target);
        }
        if allowed_targets(current).contains(&target) {
            Ok(target)
        } else {
            Err(StoreError::InvalidTransition {
                from: current,
                to: target,
            })
        }
    }
}

// a live document asked to go under-review stays published as live-cr
pub fn effective_target(current: DocumentStatus, requested: DocumentStatus) -> DocumentStatus {
    match (current, requested) {
        (DocumentStatus::Live, DocumentStatus::UnderReview) => DocumentStatus::LiveCr,
        _ => requested,
    }
}

/// Legal successors of `from` under the strict policy.
pub fn allowed_targets(from: DocumentStatus) -> &'static [DocumentStatus] {
    use DocumentStatus::*;

    match from {
        Draft => &[UnderReview, Archived, Deleted],
        UnderReview => &[
            Draft,
            Queried,
            Reviewed,
            PendingCreatorApproval,
            PendingRequesterApproval,
            PendingOwnerApproval,
            Rejected,
            Deleted,
        ],
        Queried => &[UnderReview, UnderRevision, PendingWithRequester, Deleted],
        PendingWithRequester => &[UnderReview, UnderRevision, Deleted],
        Reviewed => &[
            PendingCreatorApproval,
            PendingRequesterApproval,
            PendingOwnerApproval,
            UnderRevision,
            Rejected,
        ],
        UnderRevision => &[UnderReview, PendingOwnerApproval, Deleted],
        PendingCreatorApproval => &[
            PendingRequesterApproval,
            PendingOwnerApproval,
            Approved,
            Rejected,
            UnderRevision,
            Queried,
        ],
        PendingRequesterApproval => &[PendingOwnerApproval, Approved, Rejected, UnderRevision, Queried],
        PendingOwnerApproval => &[Approved, Rejected, UnderRevision, Queried],
        Approved => &[Live, UnderRevision, Archived],
        Rejected => &[Draft, UnderRevision, Archived, Deleted],
        Live => &[LiveCr, UnderRevision, Archived],
        LiveCr => &[Live, Approved, UnderRevision, Archived],
        Archived | Deleted => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use DocumentStatus::*;

    #[test]
    fn live_under_review_becomes_live_cr() {
        let workflow = Workflow::default();
        assert_eq!(workflow.resolve(Live, UnderReview).unwrap(), LiveCr);
        assert_eq!(workflow.resolve(Draft, UnderReview).unwrap(), UnderReview);
    }

    #[test]
    fn permissive_accepts_any_target() {
        let workflow = Workflow::new(TransitionPolicy::Permissive);
        for from in DocumentStatus::ALL {
            for to in DocumentStatus::ALL {
                assert!(workflow.resolve(*from, *to).is_ok(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn strict_rejects_unlisted_pairs() {
        let workflow = Workflow::new(TransitionPolicy::Strict);
        let err = workflow.resolve(Draft, Live).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(workflow.resolve(Approved, Live).unwrap(), Live);
        assert_eq!(workflow.resolve(Live, UnderReview).unwrap(), LiveCr);
    }

    #[test]
    fn strict_terminal_states_have_no_exits_but_allow_same_status() {
        let workflow = Workflow::new(TransitionPolicy::Strict);
        for to in DocumentStatus::ALL.iter().filter(|s| **s != Archived) {
            assert!(workflow.resolve(Archived, *to).is_err(), "archived -> {to}");
        }
        assert_eq!(workflow.resolve(Archived, Archived).unwrap(), Archived);
        assert_eq!(workflow.resolve(Deleted, Deleted).unwrap(), Deleted);
    }

    #[test]
    fn live_cr_only_entered_from_live() {
        for from in DocumentStatus::ALL {
            if allowed_targets(*from).contains(&LiveCr) {
                assert_eq!(*from, Live);
            }
        }
        assert!(allowed_targets(LiveCr).contains(&Live));
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::Strict);
        assert!("lenient".parse::<TransitionPolicy>().is_err());
    }
}
