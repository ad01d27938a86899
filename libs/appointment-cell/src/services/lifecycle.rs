// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status a fresh booking starts in.
    pub fn initial_status(&self, auto_confirm: bool) -> AppointmentStatus {
        if auto_confirm {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::CheckedIn => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::InProgress => vec![AppointmentStatus::Completed],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_happy_path_is_allowed() {
        let lifecycle = AppointmentLifecycleService::new();
        let path = [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::CheckedIn,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
        ];

        for pair in path.windows(2) {
            assert!(lifecycle.validate_status_transition(&pair[0], &pair[1]).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in AppointmentStatus::ALL.iter().filter(|s| s.is_terminal()) {
            assert!(lifecycle.get_valid_transitions(status).is_empty());
        }
    }

    #[test]
    fn test_no_transition_reactivates_an_appointment() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in AppointmentStatus::ALL.iter().filter(|s| !s.is_active()) {
            for to in lifecycle.get_valid_transitions(from) {
                assert!(!to.is_active(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_matches!(
            lifecycle.validate_status_transition(&AppointmentStatus::Completed, &AppointmentStatus::Confirmed),
            Err(AppointmentError::InvalidTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Confirmed,
            })
        );
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::InProgress)
            .is_err());
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::InProgress, &AppointmentStatus::Cancelled)
            .is_err());
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Pending)
            .is_err());
    }

    #[test]
    fn test_initial_status_follows_auto_confirm() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_eq!(lifecycle.initial_status(false), AppointmentStatus::Pending);
        assert_eq!(lifecycle.initial_status(true), AppointmentStatus::Confirmed);
    }
}
