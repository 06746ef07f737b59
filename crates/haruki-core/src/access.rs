//! Role checks and component value parsing shared by both wizards

use haruki_api::{Caller, ComponentId, Reply};
use haruki_config::WizardSettings;
use haruki_util::{HarukiError, OwnerKey, Result};

/// Privileged callers may abort anyone's session
pub fn is_privileged(settings: &WizardSettings, caller: &Caller) -> bool {
    caller.privileged
        || settings
            .privileged_role
            .as_deref()
            .is_some_and(|role| caller.has_role(role))
}

/// The session owner or a privileged caller
pub fn may_act_for(settings: &WizardSettings, caller: &Caller, owner: &OwnerKey) -> bool {
    caller.owner == *owner || is_privileged(settings, caller)
}

/// Ephemeral refusal when a role is required and the caller lacks it
pub fn role_denied(settings: &WizardSettings, caller: &Caller) -> Option<Reply> {
    let role = settings.required_role.as_deref()?;
    if caller.has_role(role) || is_privileged(settings, caller) {
        return None;
    }
    Some(Reply::ephemeral(format!(
        "You need the `{}` role to use this command.",
        role
    )))
}

pub(crate) fn first_value(component: ComponentId, values: &[String]) -> Result<&str> {
    values
        .first()
        .map(String::as_str)
        .ok_or_else(|| HarukiError::invalid_value(component.as_str(), "<none>"))
}

pub(crate) fn parse_value<T: std::str::FromStr>(component: ComponentId, values: &[String]) -> Result<T> {
    let raw = first_value(component, values)?;
    raw.trim()
        .parse()
        .map_err(|_| HarukiError::invalid_value(component.as_str(), raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(required: Option<&str>, privileged: Option<&str>) -> WizardSettings {
        WizardSettings {
            required_role: required.map(str::to_string),
            privileged_role: privileged.map(str::to_string),
            ..WizardSettings::default()
        }
    }

    #[test]
    fn missing_role_is_refused() {
        let s = settings(Some("plex"), None);
        let reply = role_denied(&s, &Caller::new("1", "ann")).unwrap();
        assert_eq!(
            reply,
            Reply::ephemeral("You need the `plex` role to use this command.")
        );
        assert!(role_denied(&s, &Caller::new("1", "ann").with_role("plex")).is_none());
    }

    #[test]
    fn no_required_role_admits_everyone() {
        assert!(role_denied(&settings(None, None), &Caller::new("1", "ann")).is_none());
    }

    #[test]
    fn privilege_from_flag_or_role() {
        let s = settings(None, Some("admin"));
        let owner = OwnerKey::new("1");
        assert!(may_act_for(&s, &Caller::new("1", "ann"), &owner));
        assert!(!may_act_for(&s, &Caller::new("2", "bob"), &owner));
        assert!(may_act_for(&s, &Caller::new("2", "bob").with_role("admin"), &owner));
        assert!(may_act_for(&s, &Caller::new("2", "bob").privileged(), &owner));
    }

    #[test]
    fn values_are_parsed() {
        let id: u64 = parse_value(ComponentId::RequestSelect, &["42".to_string()]).unwrap();
        assert_eq!(id, 42);

        let err = parse_value::<u64>(ComponentId::RequestSelect, &["abc".to_string()]).unwrap_err();
        assert!(matches!(err, HarukiError::InvalidValue { .. }));
        assert!(first_value(ComponentId::RemedyApprove, &[]).is_err());
    }
}
