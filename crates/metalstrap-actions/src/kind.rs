//! The closed set of pipeline steps
//!
//! Every step a target can run is a variant here. Per-target sequences are
//! lists of these variants, so an unknown step name is rejected when the
//! configuration is parsed instead of halfway through a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Purge the host's entries from the local known_hosts file
    RemoveFromLocalKnownHosts,
    /// Activate the provider's rescue system
    EnableRescueMode,
    /// Hardware-reset the host through the provider
    Reset,
    /// Wait until SSH stops answering
    WaitForSshDown,
    /// Wait until SSH answers again
    WaitForSshUp,
    /// Log in once, recording a changed host key
    UpdateLocalKnownHosts,
    /// Install the target OS from the rescue system
    #[serde(rename = "installimage")]
    InstallImage,
    /// Reboot into the installed system
    Reboot,
    /// Check the installed system's hostname
    VerifyInstallation,
    /// Run the host's network route command, if any
    ConfigureRoute,
    /// Initialise or join the docker swarm
    DockerSwarm,
    /// Run the post-install script on the controller
    PostInstall,
    /// Run the post-install commands on the host
    PostInstallRemote,
}

/// The default pipeline, in order
pub const DEFAULT_SEQUENCE: [ActionKind; 17] = [
    ActionKind::RemoveFromLocalKnownHosts,
    ActionKind::EnableRescueMode,
    ActionKind::Reset,
    ActionKind::WaitForSshDown,
    ActionKind::WaitForSshUp,
    ActionKind::UpdateLocalKnownHosts,
    ActionKind::InstallImage,
    ActionKind::Reboot,
    ActionKind::WaitForSshDown,
    ActionKind::WaitForSshUp,
    ActionKind::UpdateLocalKnownHosts,
    ActionKind::RemoveFromLocalKnownHosts,
    ActionKind::VerifyInstallation,
    ActionKind::ConfigureRoute,
    ActionKind::DockerSwarm,
    ActionKind::PostInstall,
    ActionKind::PostInstallRemote,
];

impl ActionKind {
    /// All variants, one each
    pub const ALL: [ActionKind; 13] = [
        ActionKind::RemoveFromLocalKnownHosts,
        ActionKind::EnableRescueMode,
        ActionKind::Reset,
        ActionKind::WaitForSshDown,
        ActionKind::WaitForSshUp,
        ActionKind::UpdateLocalKnownHosts,
        ActionKind::InstallImage,
        ActionKind::Reboot,
        ActionKind::VerifyInstallation,
        ActionKind::ConfigureRoute,
        ActionKind::DockerSwarm,
        ActionKind::PostInstall,
        ActionKind::PostInstallRemote,
    ];

    /// Identifier used in configuration files and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::RemoveFromLocalKnownHosts => "remove_from_local_known_hosts",
            ActionKind::EnableRescueMode => "enable_rescue_mode",
            ActionKind::Reset => "reset",
            ActionKind::WaitForSshDown => "wait_for_ssh_down",
            ActionKind::WaitForSshUp => "wait_for_ssh_up",
            ActionKind::UpdateLocalKnownHosts => "update_local_known_hosts",
            ActionKind::InstallImage => "installimage",
            ActionKind::Reboot => "reboot",
            ActionKind::VerifyInstallation => "verify_installation",
            ActionKind::ConfigureRoute => "configure_route",
            ActionKind::DockerSwarm => "docker_swarm",
            ActionKind::PostInstall => "post_install",
            ActionKind::PostInstallRemote => "post_install_remote",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown action: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "format_disk".parse::<ActionKind>().unwrap_err();
        assert_eq!(err, "unknown action: format_disk");
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&ActionKind::InstallImage).unwrap();
        assert_eq!(json, "\"installimage\"");

        let kind: ActionKind = serde_json::from_str("\"wait_for_ssh_down\"").unwrap();
        assert_eq!(kind, ActionKind::WaitForSshDown);
        assert!(serde_json::from_str::<ActionKind>("\"bogus\"").is_err());
    }

    #[test]
    fn test_default_sequence_shape() {
        assert_eq!(DEFAULT_SEQUENCE.len(), 17);
        assert_eq!(DEFAULT_SEQUENCE[0], ActionKind::RemoveFromLocalKnownHosts);
        assert_eq!(DEFAULT_SEQUENCE[6], ActionKind::InstallImage);
        assert_eq!(DEFAULT_SEQUENCE[12], ActionKind::VerifyInstallation);
        assert_eq!(DEFAULT_SEQUENCE[14], ActionKind::DockerSwarm);
        assert_eq!(DEFAULT_SEQUENCE[16], ActionKind::PostInstallRemote);
    }
}
