use crate::error::App;
use log::{debug, info};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task;

const QUIT_SIGNALS: [(&str, fn() -> SignalKind); 4] = [
    ("SIGINT", SignalKind::interrupt),
    ("SIGTERM", SignalKind::terminate),
    ("SIGQUIT", SignalKind::quit),
    ("SIGHUP", SignalKind::hangup),
];

// Returns false once the controller is gone.
fn forward_quit(quit_sender: &mpsc::Sender<()>) -> bool {
    match quit_sender.try_send(()) {
        Ok(()) => true,
        Err(TrySendError::Full(())) => {
            debug!("Quit already pending");
            true
        }
        Err(TrySendError::Closed(())) => false,
    }
}

/// Registration is complete when this returns. Must be called from within a
/// tokio runtime.
pub fn listen(quit_sender: &mpsc::Sender<()>) -> Result<(), App> {
    for (name, kind) in QUIT_SIGNALS {
        let mut stream = signal(kind())
            .map_err(|e| App::Io(format!("failed to register {name} handler: {e}")))?;
        let quit_sender = quit_sender.clone();

        task::spawn(async move {
            while stream.recv().await.is_some() {
                info!("{} received, quitting", name);
                if !forward_quit(&quit_sender) {
                    break;
                }
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn hangup() {
        // SAFETY: raise only delivers a signal to this process; the tokio
        // handler registered by `listen` replaces the default action.
        unsafe {
            libc::raise(libc::SIGHUP);
        }
    }

    #[test]
    fn forwarding_into_a_full_slot_keeps_one_request() {
        let (quit_sender, mut quit_receiver) = mpsc::channel(1);
        quit_sender.try_send(()).unwrap();

        assert!(forward_quit(&quit_sender));
        assert!(forward_quit(&quit_sender));

        assert!(quit_receiver.try_recv().is_ok());
        assert!(quit_receiver.try_recv().is_err());
    }

    #[test]
    fn forwarding_stops_once_the_controller_is_gone() {
        let (quit_sender, quit_receiver) = mpsc::channel(1);
        drop(quit_receiver);
        assert!(!forward_quit(&quit_sender));
    }

    #[tokio::test]
    async fn signal_while_quit_pending_is_dropped_and_listener_survives() {
        let (quit_sender, mut quit_receiver) = mpsc::channel(1);
        listen(&quit_sender).unwrap();

        quit_sender.try_send(()).unwrap();
        hangup();
        sleep(Duration::from_millis(100)).await;

        // Only the request that was already pending is queued.
        assert!(quit_receiver.try_recv().is_ok());
        assert!(quit_receiver.try_recv().is_err());

        // The listener kept running after finding the slot full.
        hangup();
        timeout(Duration::from_secs(2), quit_receiver.recv())
            .await
            .expect("no quit request after second SIGHUP")
            .unwrap();
    }
}
