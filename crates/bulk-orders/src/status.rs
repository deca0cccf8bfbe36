use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;

/// Bulk order status lifecycle.
///
/// ```text
/// Draft -> Pending -> Approved -> Processing -> Shipped -> Delivered
///   \________\__________\___________\_____________\------> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOrderStatus {
    Draft,
    Pending,
    Approved,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl BulkOrderStatus {
    pub const ALL: [BulkOrderStatus; 7] = [
        BulkOrderStatus::Draft,
        BulkOrderStatus::Pending,
        BulkOrderStatus::Approved,
        BulkOrderStatus::Processing,
        BulkOrderStatus::Shipped,
        BulkOrderStatus::Delivered,
        BulkOrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BulkOrderStatus::Draft => "draft",
            BulkOrderStatus::Pending => "pending",
            BulkOrderStatus::Approved => "approved",
            BulkOrderStatus::Processing => "processing",
            BulkOrderStatus::Shipped => "shipped",
            BulkOrderStatus::Delivered => "delivered",
            BulkOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BulkOrderStatus::Delivered | BulkOrderStatus::Cancelled)
    }

    /// The single forward edge out of this state, if any.
    pub fn next_forward(self) -> Option<BulkOrderStatus> {
        match self {
            BulkOrderStatus::Draft => Some(BulkOrderStatus::Pending),
            BulkOrderStatus::Pending => Some(BulkOrderStatus::Approved),
            BulkOrderStatus::Approved => Some(BulkOrderStatus::Processing),
            BulkOrderStatus::Processing => Some(BulkOrderStatus::Shipped),
            BulkOrderStatus::Shipped => Some(BulkOrderStatus::Delivered),
            BulkOrderStatus::Delivered | BulkOrderStatus::Cancelled => None,
        }
    }

    pub fn can_transition_to(self, to: BulkOrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == BulkOrderStatus::Cancelled || self.next_forward() == Some(to)
    }

    /// Every status reachable in one step.
    pub fn allowed_transitions(self) -> Vec<BulkOrderStatus> {
        Self::ALL
            .into_iter()
            .filter(|to| self.can_transition_to(*to))
            .collect()
    }

    pub fn ensure_transition(self, to: BulkOrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self, to))
        }
    }
}

impl core::fmt::Display for BulkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for BulkOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::validation(format!("unknown bulk order status '{s}'")))
    }
}

/// Fulfilment priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOrderPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl BulkOrderPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            BulkOrderPriority::Low => "low",
            BulkOrderPriority::Medium => "medium",
            BulkOrderPriority::High => "high",
            BulkOrderPriority::Urgent => "urgent",
        }
    }
}

impl core::str::FromStr for BulkOrderPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(DomainError::validation(format!("unknown priority '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BulkOrderStatus::*;

    #[test]
    fn forward_path_is_linear() {
        let mut s = Draft;
        let mut path = vec![s];
        while let Some(next) = s.next_forward() {
            assert!(s.can_transition_to(next));
            s = next;
            path.push(s);
        }
        assert_eq!(path, vec![Draft, Pending, Approved, Processing, Shipped, Delivered]);
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!Draft.can_transition_to(Shipped));
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Approved.can_transition_to(Delivered));
        assert!(matches!(
            Draft.ensure_transition(Shipped),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn cancellation_from_every_non_terminal_state() {
        for s in [Draft, Pending, Approved, Processing, Shipped] {
            assert!(s.can_transition_to(Cancelled), "{s} should be cancellable");
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [Delivered, Cancelled] {
            assert!(s.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn self_loops_are_rejected() {
        for s in BulkOrderStatus::ALL {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn parse_and_display_agree() {
        for s in BulkOrderStatus::ALL {
            assert_eq!(s.as_str().parse::<BulkOrderStatus>().unwrap(), s);
        }
        assert_eq!("SHIPPED".parse::<BulkOrderStatus>().unwrap(), Shipped);
        assert!("lost".parse::<BulkOrderStatus>().is_err());
        assert_eq!("Urgent".parse::<BulkOrderPriority>().unwrap(), BulkOrderPriority::Urgent);
        assert_eq!(BulkOrderPriority::default(), BulkOrderPriority::Medium);
    }
}
