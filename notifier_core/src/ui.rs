use crate::protocol::ClientEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Work marshalled onto the single UI context.
#[derive(Debug, Clone, PartialEq)]
pub enum UiTask {
    /// A client event for the notification router.
    Notify(ClientEvent),
    /// A connection-lifecycle event for the supervisor.
    Connection(ClientEvent),
}

/// Producer side of the UI queue. Unbounded so client threads never block and
/// nothing is dropped.
#[derive(Clone)]
pub struct UiSender(Sender<UiTask>);

impl UiSender {
    pub fn send(&self, task: UiTask) {
        // Only fails once the main loop is gone, at which point there is
        // nobody left to deliver to.
        let _ = self.0.send(task);
    }
}

pub fn ui_channel() -> (UiSender, Receiver<UiTask>) {
    let (tx, rx) = unbounded();
    (UiSender(tx), rx)
}
