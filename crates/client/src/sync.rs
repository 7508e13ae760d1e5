//! Feed synchronizer: one task that owns the feed and serializes every
//! mutation.
//!
//! Three inputs reach the task, in any order:
//! - commands from [`SyncHandle`] (sentinel visibility, refresh, search)
//! - completions of page fetches it issued
//! - live arrivals forwarded by the live connection
//!
//! Each one is handled to completion before the next is looked at, so the
//! store never observes a half-applied change. After every change a new
//! [`FeedSnapshot`] is published on a watch channel.

use std::sync::Arc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use snapfeed_shared::{FeedError, FeedPage, Image};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::api_client::PageSource;
use crate::config::PAGE_SIZE;
use crate::scroll::ScrollTrigger;
use crate::search::SearchIndex;
use crate::stores::{FeedSnapshot, FeedStore};

enum SyncCommand {
    SentinelVisible(bool),
    Refresh,
    Search {
        query: String,
        reply: oneshot::Sender<Vec<Image>>,
    },
    Shutdown,
}

/// Result of one page fetch, tagged with the generation that issued it.
struct PageCompletion {
    generation: u64,
    offset: usize,
    result: Result<FeedPage, FeedError>,
}

/// Handle for driving a running synchronizer. Cheap to clone.
#[derive(Clone)]
pub struct SyncHandle {
    commands: UnboundedSender<SyncCommand>,
    snapshot: watch::Receiver<FeedSnapshot>,
}

impl SyncHandle {
    fn send(&self, cmd: SyncCommand) -> Result<(), String> {
        self.commands
            .unbounded_send(cmd)
            .map_err(|e| format!("synchronizer stopped: {}", e))
    }

    /// The current feed state.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch feed state changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot.clone()
    }

    /// Report that the end-of-feed sentinel became visible or hidden.
    pub fn set_sentinel_visible(&self, visible: bool) -> Result<(), String> {
        self.send(SyncCommand::SentinelVisible(visible))
    }

    /// Drop the feed and load it again from the first page. The live
    /// channel is left alone.
    pub fn refresh(&self) -> Result<(), String> {
        self.send(SyncCommand::Refresh)
    }

    /// Filter the current feed by tag. A blank query returns everything.
    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<Image>, String> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::Search {
            query: query.into(),
            reply,
        })?;
        rx.await.map_err(|_| "synchronizer stopped".to_string())
    }

    /// Stop the synchronizer and wait until it is gone. Fetches still in
    /// flight are discarded.
    pub async fn shutdown(&self) {
        if self.send(SyncCommand::Shutdown).is_err() {
            return;
        }
        let mut snapshot = self.snapshot.clone();
        while snapshot.changed().await.is_ok() {}
    }
}

pub struct FeedSynchronizer {
    source: Arc<dyn PageSource>,
    store: FeedStore,
    index: SearchIndex,
    trigger: ScrollTrigger,
    loading: bool,
    initial_load: bool,
    /// Bumped on refresh; completions from older generations are stale.
    generation: u64,
    last_error: Option<String>,
    in_flight: Option<JoinHandle<()>>,
    completions: UnboundedSender<PageCompletion>,
    snapshot: watch::Sender<FeedSnapshot>,
}

impl FeedSynchronizer {
    /// Start the synchronizer task and issue the first page request.
    pub fn spawn(source: Arc<dyn PageSource>, arrivals: UnboundedReceiver<Image>) -> SyncHandle {
        let (commands_tx, commands_rx) = unbounded();
        let (completions_tx, completions_rx) = unbounded();

        let synchronizer = Self {
            source,
            store: FeedStore::new(),
            index: SearchIndex::new(),
            trigger: ScrollTrigger::new(PAGE_SIZE),
            loading: false,
            initial_load: true,
            generation: 0,
            last_error: None,
            in_flight: None,
            completions: completions_tx,
            snapshot: watch::Sender::new(FeedSnapshot {
                initial_load: true,
                ..FeedSnapshot::default()
            }),
        };
        let snapshot = synchronizer.snapshot.subscribe();

        tokio::spawn(synchronizer.run(commands_rx, arrivals, completions_rx));

        SyncHandle {
            commands: commands_tx,
            snapshot,
        }
    }

    async fn run(
        mut self,
        mut commands: UnboundedReceiver<SyncCommand>,
        mut arrivals: UnboundedReceiver<Image>,
        mut completions: UnboundedReceiver<PageCompletion>,
    ) {
        self.request_page(0, PAGE_SIZE);

        let mut arrivals_open = true;
        loop {
            tokio::select! {
                command = commands.next() => match command {
                    Some(SyncCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                image = arrivals.next(), if arrivals_open => match image {
                    Some(image) => self.apply_live_arrival(image),
                    None => {
                        tracing::info!("live arrivals closed, continuing with history only");
                        arrivals_open = false;
                    }
                },
                Some(completion) = completions.next() => self.apply_completion(completion),
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        tracing::info!("feed synchronizer stopped");
    }

    fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::SentinelVisible(visible) => {
                let request =
                    self.trigger
                        .set_visible(visible, &self.store, self.loading, self.initial_load);
                if let Some(request) = request {
                    self.request_page(request.offset, request.limit);
                }
            }
            SyncCommand::Refresh => {
                self.generation += 1;
                self.store.reset();
                self.initial_load = true;
                self.last_error = None;
                tracing::info!("refreshing feed (generation {})", self.generation);
                self.request_page(0, PAGE_SIZE);
            }
            SyncCommand::Search { query, reply } => {
                let results = self.index.search(&self.store, &query);
                let _ = reply.send(results);
            }
            SyncCommand::Shutdown => {}
        }
    }

    fn request_page(&mut self, offset: usize, limit: usize) {
        self.loading = true;
        self.publish();

        let source = self.source.clone();
        let completions = self.completions.clone();
        let generation = self.generation;
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_page(offset, limit).await;
            let _ = completions.unbounded_send(PageCompletion {
                generation,
                offset,
                result,
            });
        }));
    }

    fn apply_completion(&mut self, completion: PageCompletion) {
        if completion.generation != self.generation {
            tracing::debug!(
                "discarding stale page at offset {} (generation {} != {})",
                completion.offset,
                completion.generation,
                self.generation
            );
            return;
        }

        self.loading = false;
        self.initial_load = false;
        self.in_flight = None;

        match completion.result {
            Ok(page) => {
                tracing::debug!(
                    "merging {} images at offset {} (total {})",
                    page.images.len(),
                    completion.offset,
                    page.total
                );
                self.store.apply_page(page, completion.offset);
                self.last_error = None;
                self.publish();

                // The sentinel may still be on screen after a short page.
                if let Some(request) = self.trigger.poll(&self.store, self.loading, self.initial_load) {
                    self.request_page(request.offset, request.limit);
                }
            }
            Err(e) => {
                tracing::error!("feed fetch error: {e}");
                self.last_error = Some(e.user_message().to_string());
                self.publish();
            }
        }
    }

    fn apply_live_arrival(&mut self, image: Image) {
        let id = image.id.clone();
        if self.store.apply_live_arrival(image) {
            tracing::debug!("prepended live image {id}");
            self.publish();
        } else {
            tracing::debug!("ignoring duplicate live image {id}");
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(FeedSnapshot::capture(
            &self.store,
            self.loading,
            self.initial_load,
            self.last_error.clone(),
        ));
    }
}
