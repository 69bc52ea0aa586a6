use std::{future::Future, io};

use tokio_util::sync::CancellationToken;

pub mod launcher;
pub mod provider;

#[cfg(feature = "dbus")]
pub mod dbus;

pub use launcher::CommandLauncher;
pub use provider::{join_terms, MethodCall, MethodReply, SearchProvider, SearchProviderService};

/// Trigger `shutdown` once `signal` fires.
///
/// If the signal cannot be listened for, `shutdown` is left untouched and
/// the provider keeps serving.
pub async fn cancel_on_signal<S>(signal: S, shutdown: CancellationToken)
where
    S: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            log::info!("Received interrupt");
            shutdown.cancel();
        }
        Err(e) => log::warn!("Unable to listen for interrupt: {e}"),
    }
}
