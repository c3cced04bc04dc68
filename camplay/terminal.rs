use crate::error::App;
use crate::player::controller::ControlEvent;
use log::{debug, error, info};
use rustix::fd::{AsFd, OwnedFd};
use rustix::termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios};
use std::io::{self, Read};
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Byte produced by Ctrl+C when the terminal does not turn it into SIGINT.
pub const INTERRUPT: u8 = 3;

const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

// `release` is idempotent: Drop, the panic hook and main all call it.
pub struct RawModeGuard {
    fd: OwnedFd,
    saved: Mutex<Option<Termios>>,
}

impl RawModeGuard {
    /// Fails if `fd` is not a terminal, e.g. when input is redirected.
    pub fn acquire<Fd: AsFd>(fd: Fd) -> Result<Self, App> {
        let fd = rustix::io::dup(fd)
            .map_err(|e| App::Terminal(format!("failed to duplicate terminal descriptor: {e}")))?;

        let original = termios::tcgetattr(&fd)
            .map_err(|e| App::Terminal(format!("failed to retrieve terminal attributes: {e}")))?;

        // Canonical mode and echo only; ISIG stays on so Ctrl+C still raises SIGINT.
        let mut raw = original.clone();
        raw.local_modes.remove(LocalModes::ICANON | LocalModes::ECHO);
        raw.special_codes[SpecialCodeIndex::VMIN] = 1;
        raw.special_codes[SpecialCodeIndex::VTIME] = 0;
        termios::tcsetattr(&fd, OptionalActions::Now, &raw)
            .map_err(|e| App::Terminal(format!("failed to set terminal attributes: {e}")))?;

        debug!("Terminal switched to raw mode");
        Ok(Self {
            fd,
            saved: Mutex::new(Some(original)),
        })
    }

    pub fn is_active(&self) -> bool {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn release(&self) -> Result<(), App> {
        let original = self
            .saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(original) = original {
            termios::tcsetattr(&self.fd, OptionalActions::Now, &original).map_err(|e| {
                App::Terminal(format!("failed to restore terminal attributes: {e}"))
            })?;
            debug!("Terminal mode restored");
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("{}", e);
        }
    }
}

/// Restores the terminal before the default panic output is printed.
pub fn restore_on_panic(guard: &Arc<RawModeGuard>) {
    let guard = Arc::downgrade(guard);
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if let Some(guard) = guard.upgrade().filter(|guard| guard.is_active()) {
            if let Err(e) = guard.release() {
                error!("{}", e);
            }
        }
        previous(panic_info);
    }));
}

pub fn key_event(byte: u8) -> Option<ControlEvent> {
    match byte {
        b' ' => Some(ControlEvent::PauseToggle),
        INTERRUPT => Some(ControlEvent::Quit),
        _ => None,
    }
}

// A full slot drops the request. Returns at end of file or once the
// controller is gone.
pub fn read_keys<R: Read>(
    mut input: R,
    pause_sender: &mpsc::Sender<()>,
    quit_sender: &mpsc::Sender<()>,
) {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => {
                info!("Standard input closed, keyboard control stopped");
                return;
            }
            Ok(_) => {
                let sender = match key_event(buf[0]) {
                    Some(ControlEvent::PauseToggle) => pause_sender,
                    Some(ControlEvent::Quit) => quit_sender,
                    _ => continue,
                };
                if let Err(TrySendError::Closed(())) = sender.try_send(()) {
                    debug!("Controller gone, keyboard reader exiting");
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!("Keyboard read failed, retrying: {}", e);
                thread::sleep(READ_RETRY_DELAY);
            }
        }
    }
}

/// The returned guard is shared with the reader thread; either side may
/// release it.
pub fn spawn_keyboard(
    pause_sender: mpsc::Sender<()>,
    quit_sender: mpsc::Sender<()>,
) -> Result<Arc<RawModeGuard>, App> {
    let stdin = io::stdin();
    let guard = Arc::new(RawModeGuard::acquire(&stdin)?);
    let reader_guard = Arc::clone(&guard);

    thread::Builder::new()
        .name("keyboard".to_string())
        .spawn(move || {
            read_keys(stdin.lock(), &pause_sender, &quit_sender);
            if let Err(e) = reader_guard.release() {
                error!("{}", e);
            }
        })
        .map_err(|e| App::Terminal(format!("failed to spawn keyboard reader: {e}")))?;

    Ok(guard)
}
