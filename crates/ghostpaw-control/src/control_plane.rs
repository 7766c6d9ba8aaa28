//! Main GhostpawControlPlane implementation
//!
//! The control plane is the entry point the dashboard and the monitor talk
//! to. It checks the caller's role before anything that changes a spirit,
//! then hands the work to the alert intake.

use std::sync::Arc;

use dashmap::DashMap;
use ghostpaw_health::{AlertIntake, HealthError};
use ghostpaw_matrix::{Mood, SpiritProfile, StyleToken};
use ghostpaw_types::{
    AlertId, HealthAlert, LifecycleEventEnvelope, OperatorResponse, ServiceAction, SpiritId,
    SpiritRecord, SpiritState,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::context::RequestContext;
use crate::error::{ControlPlaneError, Result};
use crate::operations::ControlPlaneOperation;

/// Role-gated facade over the alert intake and spirit profiles
pub struct GhostpawControlPlane {
    intake: Arc<AlertIntake>,

    /// Relationship profiles registered by the dashboard
    profiles: DashMap<SpiritId, SpiritProfile>,
}

impl GhostpawControlPlane {
    pub fn new(intake: Arc<AlertIntake>) -> Self {
        Self {
            intake,
            profiles: DashMap::new(),
        }
    }

    pub fn intake(&self) -> &Arc<AlertIntake> {
        &self.intake
    }

    /// Subscribe to lifecycle events from every spirit
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEventEnvelope> {
        self.intake.subscribe()
    }

    // ========== Alert Operations ==========

    /// Forward a monitor alert. Not role-gated: the monitor is trusted.
    pub fn submit_alert(&self, alert: HealthAlert) -> Result<()> {
        Ok(self.intake.submit_alert(alert)?)
    }

    /// Deliver an operator's answer to an escalation prompt.
    ///
    /// Returns `false` when nothing is waiting on that alert.
    #[instrument(skip(self, response, ctx), fields(alert_id = %response.alert_id, actor = %ctx.actor_id()))]
    pub fn submit_operator_response(
        &self,
        response: OperatorResponse,
        ctx: &RequestContext,
    ) -> Result<bool> {
        self.check_policy(
            &ControlPlaneOperation::RespondToPrompt {
                alert_id: response.alert_id.clone(),
            },
            ctx,
        )?;

        Ok(self.intake.submit_operator_response(response))
    }

    /// Alerts currently waiting on an operator, with their spirit
    pub fn pending_prompts(&self) -> Vec<(AlertId, SpiritId)> {
        self.intake.pending_prompts().pending()
    }

    // ========== Spirit Operations ==========

    pub fn get_spirit_state(&self, spirit_id: &SpiritId) -> Option<SpiritState> {
        self.intake.get_spirit_state(spirit_id)
    }

    pub fn get_spirit(&self, spirit_id: &SpiritId) -> Result<SpiritRecord> {
        self.intake
            .get_spirit_record(spirit_id)
            .ok_or_else(|| ControlPlaneError::spirit_not_found(spirit_id))
    }

    /// All tracked spirits, ordered by id
    pub fn list_spirits(&self) -> Vec<SpiritRecord> {
        let mut spirits = self.intake.spirits();
        spirits.sort_by(|a, b| a.id.cmp(&b.id));
        spirits
    }

    /// Start, stop or restart a spirit's service
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
    pub async fn manage_service(
        &self,
        spirit_id: &SpiritId,
        action: ServiceAction,
        ctx: &RequestContext,
    ) -> Result<()> {
        self.check_policy(
            &ControlPlaneOperation::ManageService {
                spirit_id: spirit_id.clone(),
                action,
            },
            ctx,
        )?;

        self.intake
            .manage_service(spirit_id, action, &ctx.actor_id())
            .await?;

        info!(spirit_id = %spirit_id, action = %action, "Service action completed");
        Ok(())
    }

    /// Stop tracking a spirit once its queued work is done
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
    pub async fn decommission_spirit(&self, spirit_id: &SpiritId, ctx: &RequestContext) -> Result<()> {
        self.check_policy(
            &ControlPlaneOperation::DecommissionSpirit {
                spirit_id: spirit_id.clone(),
            },
            ctx,
        )?;

        match self.intake.decommission(spirit_id).await {
            Ok(()) => {
                info!(spirit_id = %spirit_id, "Spirit decommissioned");
                Ok(())
            }
            Err(HealthError::SpiritNotFound(id)) => Err(ControlPlaneError::spirit_not_found(&id)),
            Err(e) => Err(e.into()),
        }
    }

    // ========== Profile Operations ==========

    /// Register or replace a spirit's relationship profile
    #[instrument(skip(self, profile, ctx), fields(spirit_id = %profile.id, actor = %ctx.actor_id()))]
    pub fn register_profile(&self, profile: SpiritProfile, ctx: &RequestContext) -> Result<()> {
        self.check_policy(
            &ControlPlaneOperation::UpdateProfile {
                spirit_id: profile.id.clone(),
            },
            ctx,
        )?;
        profile.validate()?;

        info!(relationships = profile.relationships().count(), "Profile registered");
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub fn get_profile(&self, spirit_id: &SpiritId) -> Option<SpiritProfile> {
        self.profiles.get(spirit_id).map(|p| p.clone())
    }

    /// Change a registered spirit's mood
    pub fn set_mood(&self, spirit_id: &SpiritId, mood: Mood, ctx: &RequestContext) -> Result<()> {
        self.check_policy(
            &ControlPlaneOperation::UpdateProfile {
                spirit_id: spirit_id.clone(),
            },
            ctx,
        )?;

        let mut profile = self
            .profiles
            .get_mut(spirit_id)
            .ok_or_else(|| ControlPlaneError::profile_not_found(spirit_id))?;
        profile.mood = mood;
        Ok(())
    }

    /// Behavioral style `spirit_id` shows toward `peer`
    pub fn behavioral_style(&self, spirit_id: &SpiritId, peer: &SpiritId) -> Result<StyleToken> {
        let profile = self
            .profiles
            .get(spirit_id)
            .ok_or_else(|| ControlPlaneError::profile_not_found(spirit_id))?;

        profile.style_toward(peer)?.ok_or_else(|| {
            ControlPlaneError::NotFound(format!(
                "Relationship from spirit {} toward {}",
                spirit_id, peer
            ))
        })
    }

    // ========== Policy ==========

    fn check_policy(&self, operation: &ControlPlaneOperation, ctx: &RequestContext) -> Result<()> {
        let required = operation.required_role();
        if ctx.has_role(required) {
            return Ok(());
        }

        warn!(
            actor = %ctx.actor_id(),
            role = %ctx.role(),
            required = %required,
            request_id = %ctx.request_id,
            "Operation denied"
        );
        Err(ControlPlaneError::PolicyDenied(format!(
            "Operation {} requires role {} (actor {} has {})",
            operation.description(),
            required,
            ctx.actor_id(),
            ctx.role()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;
    use ghostpaw_health::testing::RecordingPorts;
    use ghostpaw_health::LifecycleConfig;
    use ghostpaw_types::AlertKind;

    fn control_plane() -> (GhostpawControlPlane, RecordingPorts) {
        let recording = RecordingPorts::new();
        let intake = Arc::new(AlertIntake::new(LifecycleConfig::default(), recording.ports()));
        (GhostpawControlPlane::new(intake), recording)
    }

    #[tokio::test]
    async fn test_reader_cannot_manage_services() {
        let (cp, recording) = control_plane();
        let ctx = RequestContext::user("guest", Role::Reader);

        let result = cp
            .manage_service(&SpiritId::new("eira"), ServiceAction::Restart, &ctx)
            .await;

        assert!(matches!(result, Err(ControlPlaneError::PolicyDenied(_))));
        assert!(recording.service.actions().is_empty());
        assert_eq!(cp.get_spirit_state(&SpiritId::new("eira")), None);
    }

    #[tokio::test]
    async fn test_maintainer_manages_services() {
        let (cp, recording) = control_plane();
        let ctx = RequestContext::user("mel", Role::Maintainer);
        let eira = SpiritId::new("eira");

        cp.manage_service(&eira, ServiceAction::Restart, &ctx)
            .await
            .unwrap();

        assert_eq!(recording.service.restarts_for(&eira), 1);
        assert!(recording
            .log
            .contains("Service restart requested for spirit eira by user:mel"));
        assert_eq!(cp.get_spirit(&eira).unwrap().state, SpiritState::Idle);
    }

    #[tokio::test]
    async fn test_decommission_requires_admin() {
        let (cp, _recording) = control_plane();
        let eira = SpiritId::new("eira");
        cp.submit_alert(HealthAlert::new("a1", "eira", AlertKind::Memory, 90.0, 80.0, true))
            .unwrap();

        let denied = cp
            .decommission_spirit(&eira, &RequestContext::user("mel", Role::Maintainer))
            .await;
        assert!(matches!(denied, Err(ControlPlaneError::PolicyDenied(_))));

        cp.decommission_spirit(&eira, &RequestContext::user("ada", Role::Admin))
            .await
            .unwrap();
        assert_eq!(cp.get_spirit_state(&eira), None);

        let missing = cp
            .decommission_spirit(&eira, &RequestContext::user("ada", Role::Owner))
            .await;
        assert!(matches!(missing, Err(ControlPlaneError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reader_cannot_answer_prompts() {
        let (cp, _recording) = control_plane();
        let result = cp.submit_operator_response(
            OperatorResponse::new("a1", "restart"),
            &RequestContext::user("guest", Role::Reader),
        );
        assert!(matches!(result, Err(ControlPlaneError::PolicyDenied(_))));
    }

    #[tokio::test]
    async fn test_behavioral_style() {
        let (cp, _recording) = control_plane();
        let ctx = RequestContext::user("mel", Role::Maintainer);
        let eira = SpiritId::new("eira");
        let cantrelle = SpiritId::new("cantrelle");

        let profile = SpiritProfile::new("eira", "Eira", Mood::Neutral)
            .with_relationship("cantrelle", 85)
            .unwrap();
        cp.register_profile(profile, &ctx).unwrap();

        let neutral = cp.behavioral_style(&eira, &cantrelle).unwrap();
        cp.set_mood(&eira, Mood::Defensive, &ctx).unwrap();
        let defensive = cp.behavioral_style(&eira, &cantrelle).unwrap();

        assert_eq!(neutral.as_str(), "calm sync");
        assert_eq!(defensive.as_str(), "protective");
        assert_eq!(cp.get_profile(&eira).unwrap().mood, Mood::Defensive);
        assert!(matches!(
            cp.behavioral_style(&eira, &SpiritId::new("vex")),
            Err(ControlPlaneError::NotFound(_))
        ));
        assert!(matches!(
            cp.behavioral_style(&cantrelle, &eira),
            Err(ControlPlaneError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_with_invalid_score_is_rejected() {
        let (cp, _recording) = control_plane();
        let mut profile = SpiritProfile::new("eira", "Eira", Mood::Neutral);
        profile.relationships.insert(SpiritId::new("vex"), 150);

        let result = cp.register_profile(profile, &RequestContext::system("test"));
        assert!(matches!(result, Err(ControlPlaneError::Matrix(_))));
        assert!(cp.get_profile(&SpiritId::new("eira")).is_none());
    }

    #[tokio::test]
    async fn test_list_spirits_sorted() {
        let (cp, _recording) = control_plane();
        for (id, spirit) in [("a1", "vex"), ("a2", "cantrelle"), ("a3", "eira")] {
            cp.submit_alert(HealthAlert::new(id, spirit, AlertKind::Memory, 90.0, 80.0, true))
                .unwrap();
        }

        let ids: Vec<String> = cp
            .list_spirits()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["cantrelle", "eira", "vex"]);
    }
}
