//! The one-way command channel between producer and consumer threads

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::RenderCommand;

/// Create the command queue connecting the two threads
///
/// Unbounded so the producer never blocks; backpressure is bounded in
/// practice by the per-frame drain on the consumer side.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer-side handle: enqueue is fire-and-forget
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<RenderCommand>,
}

impl CommandSender {
    /// Enqueue a command
    ///
    /// If the consumer has shut down the command is dropped with a
    /// diagnostic; the producer must never block or fail on enqueue.
    pub fn send(&self, command: RenderCommand) {
        if let Err(error) = self.tx.send(command) {
            log::warn!(
                "render consumer disconnected, dropping {}",
                error.into_inner().name()
            );
        }
    }
}

/// Consumer-side handle: drained fully once per frame
pub struct CommandReceiver {
    rx: Receiver<RenderCommand>,
}

impl CommandReceiver {
    /// Take every command currently queued, in enqueue order
    ///
    /// Does not wait for stragglers: commands enqueued while the drain is in
    /// progress are picked up next frame.
    pub fn drain(&self) -> Vec<RenderCommand> {
        let mut commands = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ProxyHandle;

    #[test]
    fn drain_preserves_enqueue_order() {
        let (tx, rx) = command_queue();
        for i in 0..16 {
            tx.send(RenderCommand::SetPriority {
                handle: ProxyHandle(1),
                priority: i,
            });
        }
        let drained = rx.drain();
        let priorities: Vec<_> = drained
            .iter()
            .map(|cmd| match cmd {
                RenderCommand::SetPriority { priority, .. } => *priority,
                _ => panic!("unexpected command"),
            })
            .collect();
        assert_eq!(priorities, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let (_tx, rx) = command_queue();
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn send_after_consumer_drop_does_not_panic() {
        let (tx, rx) = command_queue();
        drop(rx);
        tx.send(RenderCommand::DestroyProxy {
            handle: ProxyHandle(1),
        });
    }

    #[test]
    fn cross_thread_order_matches_enqueue_order() {
        let (tx, rx) = command_queue();
        let producer = std::thread::spawn(move || {
            for i in 0..256 {
                tx.send(RenderCommand::SetPriority {
                    handle: ProxyHandle(7),
                    priority: i,
                });
            }
        });
        producer.join().unwrap();

        let drained = rx.drain();
        assert_eq!(drained.len(), 256);
        for (i, cmd) in drained.iter().enumerate() {
            match cmd {
                RenderCommand::SetPriority { priority, .. } => {
                    assert_eq!(*priority, i as i32);
                }
                _ => panic!("unexpected command"),
            }
        }
    }
}
