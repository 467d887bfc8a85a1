use super::PlayerStore;
use crate::game::scoreboard;
use crate::game::types::ScoreboardEntry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    UpdateName { uuid: String, name: String },
    UpdateColor { uuid: String, color: String },
    UpdateMaxLength { uuid: String, candidate: usize },
    RefreshScoreboard,
}

impl StoreCommand {
    fn touches_scoreboard(&self) -> bool {
        !matches!(self, StoreCommand::UpdateColor { .. })
    }
}

/// Fire-and-forget entry point into the store worker.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::UnboundedSender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(sender: mpsc::UnboundedSender<StoreCommand>) -> Self {
        Self { sender }
    }

    pub fn submit(&self, command: StoreCommand) {
        if let Err(error) = self.sender.send(command) {
            tracing::warn!(command = ?error.0, "store worker stopped, dropping command");
        }
    }
}

pub fn spawn_store_worker(
    store: PlayerStore,
    scoreboard_limit: usize,
    scoreboard_tx: mpsc::UnboundedSender<Vec<ScoreboardEntry>>,
) -> (StoreHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_store_worker(
        store,
        receiver,
        scoreboard_limit,
        scoreboard_tx,
    ));
    (StoreHandle::new(sender), task)
}

/// Applies queued commands in order. Commands that arrive together are
/// handled as one batch followed by at most one scoreboard refresh. Failed
/// writes are logged and not retried.
pub async fn run_store_worker(
    store: PlayerStore,
    mut receiver: mpsc::UnboundedReceiver<StoreCommand>,
    scoreboard_limit: usize,
    scoreboard_tx: mpsc::UnboundedSender<Vec<ScoreboardEntry>>,
) {
    while let Some(first) = receiver.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = receiver.try_recv() {
            batch.push(next);
        }

        let mut refresh = false;
        for command in batch {
            refresh |= command.touches_scoreboard();
            if let Err(error) = apply(&store, &command).await {
                tracing::warn!(?error, ?command, "store write failed");
            }
        }
        if !refresh {
            continue;
        }

        match load_scoreboard(&store, scoreboard_limit).await {
            Ok(entries) => {
                if scoreboard_tx.send(entries).is_err() {
                    tracing::debug!("scoreboard receiver closed, stopping store worker");
                    break;
                }
            }
            Err(error) => tracing::warn!(?error, "scoreboard refresh failed"),
        }
    }
}

async fn apply(store: &PlayerStore, command: &StoreCommand) -> anyhow::Result<()> {
    match command {
        StoreCommand::UpdateName { uuid, name } => store.update_name(uuid, name).await,
        StoreCommand::UpdateColor { uuid, color } => store.update_color(uuid, color).await,
        StoreCommand::UpdateMaxLength { uuid, candidate } => {
            store.update_max_length(uuid, *candidate as i64).await
        }
        StoreCommand::RefreshScoreboard => Ok(()),
    }
}

pub async fn load_scoreboard(
    store: &PlayerStore,
    limit: usize,
) -> anyhow::Result<Vec<ScoreboardEntry>> {
    let limit = scoreboard::clamp_limit(limit);
    let records = store.top_n(limit).await?;
    Ok(scoreboard::project(
        records.into_iter().map(ScoreboardEntry::from),
        limit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_applied_and_scoreboard_pushed() {
        let store = PlayerStore::connect("sqlite::memory:", 1)
            .await
            .expect("store");
        store.create("u1", "Ada", "#aa0000").await.expect("create");
        store.create("u2", "Bob", "#00aa00").await.expect("create");

        let (scoreboard_tx, mut scoreboard_rx) = mpsc::unbounded_channel();
        let (handle, _task) = spawn_store_worker(store.clone(), 10, scoreboard_tx);
        handle.submit(StoreCommand::UpdateMaxLength {
            uuid: "u2".to_string(),
            candidate: 6,
        });
        handle.submit(StoreCommand::UpdateName {
            uuid: "u1".to_string(),
            name: "Grace".to_string(),
        });

        let mut latest = scoreboard_rx.recv().await.expect("scoreboard");
        while latest.first().map(|entry| entry.max_length_ever_reached) != Some(6)
            || !latest.iter().any(|entry| entry.name == "Grace")
        {
            latest = scoreboard_rx.recv().await.expect("scoreboard");
        }
        assert_eq!(
            latest,
            vec![
                ScoreboardEntry {
                    name: "Bob".to_string(),
                    max_length_ever_reached: 6,
                },
                ScoreboardEntry {
                    name: "Grace".to_string(),
                    max_length_ever_reached: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn color_changes_do_not_refresh_the_scoreboard() {
        let store = PlayerStore::connect("sqlite::memory:", 1)
            .await
            .expect("store");
        store.create("u1", "Ada", "#aa0000").await.expect("create");

        let (sender, receiver) = mpsc::unbounded_channel();
        let (scoreboard_tx, mut scoreboard_rx) = mpsc::unbounded_channel();
        sender
            .send(StoreCommand::UpdateColor {
                uuid: "u1".to_string(),
                color: "#0000ff".to_string(),
            })
            .expect("send");
        drop(sender);

        run_store_worker(store.clone(), receiver, 10, scoreboard_tx).await;

        assert!(scoreboard_rx.try_recv().is_err());
        let record = store.get("u1").await.expect("get").expect("record");
        assert_eq!(record.color, "#0000ff");
    }
}
