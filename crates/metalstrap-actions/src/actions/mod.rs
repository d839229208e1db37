//! Built-in step handlers
//!
//! One handler per [`ActionKind`](crate::ActionKind):
//!
//! - `remove_from_local_known_hosts` / `update_local_known_hosts` - keep the
//!   controller's `known_hosts` in step with the host's changing keys
//! - `enable_rescue_mode` / `reset` - provider calls, retried with backoff
//! - `wait_for_ssh_down` / `wait_for_ssh_up` - reboot detection
//! - `installimage` - render the configuration document and run the installer
//! - `reboot` / `verify_installation` - boot the installed system and check it
//! - `configure_route` - the host's route command, if any
//! - `docker_swarm` - cluster join, manager or worker side
//! - `post_install` / `post_install_remote` - user scripts

mod install;
mod known_hosts;
mod post_install;
mod reboot;
mod rescue;
mod reset;
mod route;
mod swarm;
mod verify;
mod wait_ssh;

pub use install::{install_commands, InstallImageAction};
pub use known_hosts::{RemoveFromKnownHostsAction, UpdateKnownHostsAction};
pub use post_install::{PostInstallAction, PostInstallRemoteAction};
pub use reboot::RebootAction;
pub use rescue::EnableRescueModeAction;
pub use reset::ResetAction;
pub use route::ConfigureRouteAction;
pub use swarm::{DockerSwarmAction, SWARM_INIT, SWARM_JOIN_TOKEN};
pub use verify::{check_hostname, VerifyInstallationAction, HOSTNAME_COMMAND};
pub use wait_ssh::{WaitForSshDownAction, WaitForSshUpAction};

use crate::ActionEngine;

/// Register every built-in handler with the engine
pub fn register_all(engine: &mut ActionEngine) {
    engine.register(RemoveFromKnownHostsAction);
    engine.register(EnableRescueModeAction);
    engine.register(ResetAction);
    engine.register(WaitForSshDownAction);
    engine.register(WaitForSshUpAction);
    engine.register(UpdateKnownHostsAction);
    engine.register(InstallImageAction);
    engine.register(RebootAction);
    engine.register(VerifyInstallationAction);
    engine.register(ConfigureRouteAction);
    engine.register(DockerSwarmAction);
    engine.register(PostInstallAction);
    engine.register(PostInstallRemoteAction);
}
