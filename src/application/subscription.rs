//! Session subscription - a client's view of one session's topic.

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::foundation::SessionId;
use crate::domain::session::{Session, SessionUpdate};

/// Stream of updates for one live session, plus the snapshot taken when
/// the subscription was opened.
///
/// The snapshot and the receiver are captured together under the session's
/// handle lock, so the first update received is the first commit after the
/// snapshot.
pub struct SessionSubscription {
    session_id: SessionId,
    snapshot: Session,
    receiver: broadcast::Receiver<SessionUpdate>,
    finished: bool,
}

impl SessionSubscription {
    pub(crate) fn new(snapshot: Session, receiver: broadcast::Receiver<SessionUpdate>) -> Self {
        Self {
            session_id: snapshot.id(),
            snapshot,
            receiver,
            finished: false,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Session state at subscription time.
    pub fn snapshot(&self) -> &Session {
        &self.snapshot
    }

    /// Next update, or `None` once the session has closed.
    ///
    /// A subscriber that falls behind skips the overwritten updates; every
    /// update carries the full session, so the next one received is still
    /// a complete picture.
    pub async fn next(&mut self) -> Option<SessionUpdate> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.recv().await {
                Ok(update) => {
                    if update.is_closed() {
                        self.finished = true;
                    }
                    return Some(update);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        skipped,
                        "Subscriber lagged, skipping missed updates"
                    );
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Updates as a stream that ends once the session has closed.
    pub fn into_stream(self) -> impl Stream<Item = SessionUpdate> + Send {
        stream::unfold(self, |mut subscription| async move {
            let update = subscription.next().await?;
            Some((update, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::session::SessionCode;

    fn open_session() -> Session {
        let mut session = Session::new(UserId::new("author").unwrap(), "Lecture", None).unwrap();
        session
            .start(SessionCode::new("SUBS01").unwrap(), Timestamp::now())
            .unwrap();
        session
    }

    #[tokio::test]
    async fn ends_after_closed_update() {
        let session = open_session();
        let (tx, rx) = broadcast::channel(8);
        let mut sub = SessionSubscription::new(session.clone(), rx);

        let mut closed = session.clone();
        closed.close(Timestamp::now()).unwrap();
        tx.send(SessionUpdate::Updated(session.clone())).unwrap();
        tx.send(SessionUpdate::Closed(closed)).unwrap();
        tx.send(SessionUpdate::Updated(session)).unwrap();

        assert!(!sub.next().await.unwrap().is_closed());
        assert!(sub.next().await.unwrap().is_closed());
        assert!(sub.next().await.is_none());
        assert!(sub.is_finished());
    }

    #[tokio::test]
    async fn skips_lagged_gap() {
        let session = open_session();
        let (tx, rx) = broadcast::channel(2);
        let mut sub = SessionSubscription::new(session.clone(), rx);

        for _ in 0..5 {
            tx.send(SessionUpdate::Updated(session.clone())).unwrap();
        }
        drop(tx);

        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_yields_until_closed() {
        use futures::StreamExt;

        let session = open_session();
        let (tx, rx) = broadcast::channel(8);
        let sub = SessionSubscription::new(session.clone(), rx);

        let mut closed = session.clone();
        closed.close(Timestamp::now()).unwrap();
        tx.send(SessionUpdate::Updated(session)).unwrap();
        tx.send(SessionUpdate::Closed(closed)).unwrap();

        let updates: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(updates.len(), 2);
        assert!(updates[1].is_closed());
    }

    #[tokio::test]
    async fn snapshot_is_kept() {
        let session = open_session();
        let (_tx, rx) = broadcast::channel(2);
        let sub = SessionSubscription::new(session.clone(), rx);
        assert_eq!(sub.session_id(), session.id());
        assert_eq!(sub.snapshot().code(), session.code());
    }
}
