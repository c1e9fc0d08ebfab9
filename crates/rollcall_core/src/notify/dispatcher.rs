//! Background notification dispatcher.
//!
//! One worker thread drains an unbounded channel and hands each notice to a
//! [`NotificationSink`]. Enqueueing never blocks the caller.

use crate::notify::{MeetingNotice, MeetingNotifier, NotificationError, NotificationSink};
use log::{error, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Delivery counters reported when the dispatcher shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Owns the notification worker thread.
///
/// Dropping the dispatcher behaves like [`NotificationDispatcher::shutdown`]
/// without returning the counters.
pub struct NotificationDispatcher {
    sender: Option<Sender<MeetingNotice>>,
    worker: Option<JoinHandle<DispatchStats>>,
}

impl NotificationDispatcher {
    /// Starts the worker thread delivering through `sink`.
    pub fn spawn<S: NotificationSink>(sink: S) -> Result<Self, NotificationError> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("rollcall-notify".to_string())
            .spawn(move || run_worker(sink, receiver))
            .map_err(|err| NotificationError::Delivery(format!("failed to spawn worker: {err}")))?;

        info!("event=notify_dispatcher_start module=notify status=ok");
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Stops accepting notices, drains the queue and joins the worker.
    pub fn shutdown(mut self) -> DispatchStats {
        self.finish()
    }

    fn finish(&mut self) -> DispatchStats {
        // Closing the channel lets the worker exit once the queue is empty.
        self.sender.take();
        let Some(worker) = self.worker.take() else {
            return DispatchStats::default();
        };

        match worker.join() {
            Ok(stats) => {
                info!(
                    "event=notify_dispatcher_stop module=notify status=ok delivered={} failed={}",
                    stats.delivered, stats.failed
                );
                stats
            }
            Err(_) => {
                error!(
                    "event=notify_dispatcher_stop module=notify status=error error_code=notify_worker_panicked"
                );
                DispatchStats::default()
            }
        }
    }
}

impl MeetingNotifier for NotificationDispatcher {
    fn notify_meeting_created(&self, notice: MeetingNotice) -> Result<(), NotificationError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(NotificationError::DispatcherClosed)?;
        sender
            .send(notice)
            .map_err(|_| NotificationError::DispatcherClosed)
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.finish();
    }
}

fn run_worker<S: NotificationSink>(sink: S, receiver: Receiver<MeetingNotice>) -> DispatchStats {
    let mut stats = DispatchStats::default();
    for notice in receiver {
        match sink.deliver(&notice) {
            Ok(()) => stats.delivered += 1,
            Err(err) => {
                stats.failed += 1;
                warn!(
                    "event=meeting_notify module=notify status=error meeting_id={} error_code={}",
                    notice.meeting.id,
                    err.code()
                );
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::NotificationDispatcher;
    use crate::model::meeting::{Location, Meeting, MeetingDraft};
    use crate::notify::{MeetingNotice, MeetingNotifier, NotificationError, NotificationSink};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<Uuid>>>);

    impl NotificationSink for Recording {
        fn deliver(&self, notice: &MeetingNotice) -> Result<(), NotificationError> {
            self.0
                .lock()
                .expect("recording lock")
                .push(notice.meeting.id);
            Ok(())
        }
    }

    struct AlwaysFails;

    impl NotificationSink for AlwaysFails {
        fn deliver(&self, _notice: &MeetingNotice) -> Result<(), NotificationError> {
            Err(NotificationError::Delivery("smtp unavailable".to_string()))
        }
    }

    fn notice() -> MeetingNotice {
        let draft = MeetingDraft {
            title: "Retro".to_string(),
            description: "what went well".to_string(),
            venue: "Room 1".to_string(),
            location: Location::default(),
            start_time: 10_000,
        };
        MeetingNotice {
            meeting: Meeting::from_draft(Uuid::new_v4(), &draft, 1_000),
            team_name: "Core".to_string(),
            recipients: Vec::new(),
        }
    }

    #[test]
    fn shutdown_drains_queued_notices_in_order() {
        let sink = Recording::default();
        let dispatcher = NotificationDispatcher::spawn(sink.clone()).expect("spawn dispatcher");

        let notices: Vec<MeetingNotice> = (0..5).map(|_| notice()).collect();
        let expected: Vec<Uuid> = notices.iter().map(|n| n.meeting.id).collect();
        for notice in notices {
            dispatcher
                .notify_meeting_created(notice)
                .expect("enqueue should succeed");
        }

        let stats = dispatcher.shutdown();
        assert_eq!(stats.delivered, 5);
        assert_eq!(stats.failed, 0);
        assert_eq!(*sink.0.lock().expect("recording lock"), expected);
    }

    #[test]
    fn sink_failures_are_counted_not_raised() {
        let dispatcher = NotificationDispatcher::spawn(AlwaysFails).expect("spawn dispatcher");
        dispatcher
            .notify_meeting_created(notice())
            .expect("enqueue succeeds even if delivery will fail");
        let stats = dispatcher.shutdown();
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.failed, 1);
    }
}
