//! In-process event bus with consumer groups and at-least-once delivery.
//!
//! Each `(topic, group)` pair owns a queue. Publishing appends a copy of the
//! message to the queue of every group subscribed to the topic; messages
//! published before any group exists are held and handed to the first group
//! that subscribes. Members of one group compete for messages.
//!
//! Per-key ordering: while a message is in flight, or waiting out its
//! redelivery delay, later messages with the same key stay queued behind it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::delivery::{Acknowledger, Delivery, DeliveryStream, Message, Settlement, Subscription};
use crate::error::BusError;
use crate::EventBus;

/// Redelivery policy for [`InMemoryBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Deliveries before a message is dead-lettered, first delivery included.
    pub max_deliveries: u32,
    /// Wait before a nacked message becomes eligible again.
    pub redelivery_delay: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_deliveries: 5,
            redelivery_delay: Duration::from_millis(500),
        }
    }
}

/// A message that exhausted its deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub group: String,
    pub message: Message,
    pub attempts: u32,
}

#[derive(Debug)]
struct Pending {
    message: Message,
    /// Deliveries already made.
    deliveries: u32,
    not_before: Option<Instant>,
}

#[derive(Debug, Default)]
struct GroupState {
    queue: VecDeque<Pending>,
    in_flight: HashSet<String>,
    closed: bool,
}

enum Take {
    Ready(Message, u32),
    WaitUntil(Instant),
    Idle,
    Closed,
}

impl GroupState {
    fn take(&mut self, now: Instant) -> Take {
        if self.closed {
            return Take::Closed;
        }
        let mut blocked: HashSet<&str> = self.in_flight.iter().map(String::as_str).collect();
        let mut ready = None;
        let mut earliest: Option<Instant> = None;
        for (pos, pending) in self.queue.iter().enumerate() {
            let key = pending.message.key.as_str();
            if blocked.contains(key) {
                continue;
            }
            match pending.not_before {
                Some(at) if at > now => {
                    earliest = Some(earliest.map_or(at, |e| e.min(at)));
                    blocked.insert(key);
                }
                _ => {
                    ready = Some(pos);
                    break;
                }
            }
        }

        match ready.and_then(|pos| self.queue.remove(pos)) {
            Some(pending) => {
                self.in_flight.insert(pending.message.key.clone());
                Take::Ready(pending.message, pending.deliveries + 1)
            }
            None => earliest.map_or(Take::Idle, Take::WaitUntil),
        }
    }
}

struct GroupQueue {
    name: String,
    config: BusConfig,
    state: Mutex<GroupState>,
    notify: Notify,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl GroupQueue {
    fn lock(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: Message) {
        self.lock().queue.push_back(Pending {
            message,
            deliveries: 0,
            not_before: None,
        });
        self.notify.notify_waiters();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }
}

impl Acknowledger for GroupQueue {
    fn settle(&self, message: &Message, attempt: u32, settlement: Settlement) {
        let mut state = self.lock();
        state.in_flight.remove(&message.key);
        match settlement {
            Settlement::Ack => {}
            Settlement::Nack if attempt >= self.config.max_deliveries => {
                warn!(
                    topic = %message.topic,
                    group = %self.name,
                    key = %message.key,
                    attempts = attempt,
                    "message_dead_lettered"
                );
                self.dead_letters
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(DeadLetter {
                        group: self.name.clone(),
                        message: message.clone(),
                        attempts: attempt,
                    });
            }
            Settlement::Nack => {
                debug!(
                    topic = %message.topic,
                    group = %self.name,
                    key = %message.key,
                    attempt,
                    "message_redelivery_scheduled"
                );
                // Front of the queue keeps it ahead of later messages for the key.
                state.queue.push_front(Pending {
                    message: message.clone(),
                    deliveries: attempt,
                    not_before: Some(Instant::now() + self.config.redelivery_delay),
                });
            }
        }
        drop(state);
        self.notify.notify_waiters();
    }
}

struct MemoryStream {
    group: Arc<GroupQueue>,
}

#[async_trait]
impl DeliveryStream for MemoryStream {
    async fn next(&mut self) -> Option<Delivery> {
        loop {
            let notified = self.group.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let take = self.group.lock().take(Instant::now());
            match take {
                Take::Ready(message, attempt) => {
                    let acker: Arc<dyn Acknowledger> = self.group.clone();
                    return Some(Delivery::new(message, attempt, acker));
                }
                Take::Closed => return None,
                Take::Idle => notified.await,
                Take::WaitUntil(at) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
            }
        }
    }
}

#[derive(Default)]
struct Topics {
    groups: HashMap<String, HashMap<String, Arc<GroupQueue>>>,
    /// Published before any group subscribed.
    unrouted: HashMap<String, VecDeque<Message>>,
    closed: bool,
}

/// At-least-once event bus living in the current process.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    config: BusConfig,
    topics: Arc<Mutex<Topics>>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl InMemoryBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    fn topics(&self) -> MutexGuard<'_, Topics> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages that exhausted `max_deliveries`, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages waiting (not in flight) for `group` on `topic`.
    pub fn pending(&self, topic: &str, group: &str) -> usize {
        self.topics()
            .groups
            .get(topic)
            .and_then(|groups| groups.get(group))
            .map_or(0, |queue| queue.lock().queue.len())
    }

    /// Stops the bus: further publishes fail and every subscription ends.
    pub fn close(&self) {
        let mut topics = self.topics();
        topics.closed = true;
        for queue in topics.groups.values().flat_map(HashMap::values) {
            queue.close();
        }
    }
}

impl std::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBus")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), BusError> {
        let message = Message {
            topic: topic.to_owned(),
            key: key.to_owned(),
            payload,
        };
        let mut topics = self.topics();
        if topics.closed {
            return Err(BusError::Closed);
        }
        match topics.groups.get(topic) {
            Some(groups) if !groups.is_empty() => {
                for queue in groups.values() {
                    queue.push(message.clone());
                }
            }
            _ => topics
                .unrouted
                .entry(topic.to_owned())
                .or_default()
                .push_back(message),
        }
        debug!(topic, key, "message_published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BusError> {
        let mut topics = self.topics();
        if topics.closed {
            return Err(BusError::Closed);
        }
        let backlog = topics.unrouted.remove(topic).unwrap_or_default();
        let queue = topics
            .groups
            .entry(topic.to_owned())
            .or_default()
            .entry(group.to_owned())
            .or_insert_with(|| {
                Arc::new(GroupQueue {
                    name: group.to_owned(),
                    config: self.config,
                    state: Mutex::new(GroupState::default()),
                    notify: Notify::new(),
                    dead_letters: self.dead_letters.clone(),
                })
            })
            .clone();
        for message in backlog {
            queue.push(message);
        }
        Ok(Subscription::new(
            topic,
            group,
            Box::new(MemoryStream { group: queue }),
        ))
    }
}
