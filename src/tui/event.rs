use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use super::message::MountEvent;

/// The position readout only changes every poll, so a slow redraw is enough.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mount(MountEvent),
    /// Time to redraw. Also picks up terminal resizes.
    Tick,
}

/// Waits on the terminal, the mount task and the redraw timer at once.
pub struct EventHandler {
    terminal: EventStream,
    mount_rx: mpsc::UnboundedReceiver<MountEvent>,
    /// False once the mount task has exited and its channel drained.
    mount_open: bool,
    redraw: Interval,
}

impl EventHandler {
    pub fn new(mount_rx: mpsc::UnboundedReceiver<MountEvent>) -> Self {
        let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
        redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            terminal: EventStream::new(),
            mount_rx,
            mount_open: true,
            redraw,
        }
    }

    /// Next event for the UI, or `None` once the terminal stream has ended.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            tokio::select! {
                event = self.terminal.next() => match event {
                    // crossterm 0.28 reports Press and Release on some platforms.
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        return Some(AppEvent::Key(key));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => return None,
                },
                event = self.mount_rx.recv(), if self.mount_open => match event {
                    Some(event) => return Some(AppEvent::Mount(event)),
                    None => self.mount_open = false,
                },
                _ = self.redraw.tick() => return Some(AppEvent::Tick),
            }
        }
    }
}
