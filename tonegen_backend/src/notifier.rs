//! Playback-state notifications to the host.
//!
//! Observers hear about the Idle→Running and Running→Idle transitions,
//! exactly once each; intermediate states are not reported.

use crossbeam::channel::{Receiver, Sender, unbounded};

/// Callback interface for playback-state changes.
///
/// Invoked from the control thread (never the feeding loop), once per
/// transition: `true` when playback starts, `false` when it stops.
pub trait PlaybackObserver: Send + Sync {
    fn playback_state_changed(&self, playing: bool);
}

/// An observer that forwards transitions into a channel, for hosts that
/// consume state changes as an event stream.
pub struct ChannelObserver {
    tx: Sender<bool>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<bool>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl PlaybackObserver for ChannelObserver {
    fn playback_state_changed(&self, playing: bool) {
        // A disconnected receiver just means the host stopped listening.
        let _ = self.tx.send(playing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_transitions_in_order() {
        let (observer, rx) = ChannelObserver::new();
        observer.playback_state_changed(true);
        observer.playback_state_changed(false);
        assert_eq!(rx.try_recv(), Ok(true));
        assert_eq!(rx.try_recv(), Ok(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.playback_state_changed(true);
    }
}
