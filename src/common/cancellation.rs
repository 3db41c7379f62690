//! Run-wide cancellation.
//!
//! The dispatcher and every in-flight job share one [`CancellationToken`];
//! Ctrl-C is turned into a cancellation by [`cancel_on_interrupt`].

pub use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives an interrupt (Ctrl-C).
///
/// On unix the SIGINT handler is registered before this returns, so
/// children spawned afterwards can never miss an interrupt.
#[cfg(unix)]
pub fn cancel_on_interrupt(
    token: &CancellationToken,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let token = token.clone();
    Ok(tokio::spawn(async move {
        tokio::select! {
            Some(()) = interrupt.recv() => {
                tracing::warn!("interrupt received, cancelling run");
                token.cancel();
            }
            () = token.cancelled() => {}
        }
    }))
}

#[cfg(not(unix))]
pub fn cancel_on_interrupt(
    token: &CancellationToken,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let token = token.clone();
    Ok(tokio::spawn(async move {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupt received, cancelling run");
                token.cancel();
            }
            () = token.cancelled() => {}
        }
    }))
}
