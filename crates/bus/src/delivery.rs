use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::BusError;

/// A published record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub key: String,
    pub payload: Bytes,
}

/// How a consumer settled a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Processed (or deliberately dropped); never deliver again.
    Ack,
    /// Not processed; deliver again later.
    Nack,
}

/// Backend hook that records the settlement of a delivery.
pub trait Acknowledger: Send + Sync {
    fn settle(&self, message: &Message, attempt: u32, settlement: Settlement);
}

/// One delivery of a message to a consumer group member.
///
/// Must be settled with [`ack`](Self::ack) or [`nack`](Self::nack). A
/// delivery dropped unsettled counts as a nack, so a consumer that panics or
/// is cancelled mid-message gets it redelivered.
pub struct Delivery {
    message: Message,
    attempt: u32,
    acker: Arc<dyn Acknowledger>,
    settled: bool,
}

impl Delivery {
    pub fn new(message: Message, attempt: u32, acker: Arc<dyn Acknowledger>) -> Self {
        Self {
            message,
            attempt,
            acker,
            settled: false,
        }
    }

    pub fn topic(&self) -> &str {
        &self.message.topic
    }

    pub fn key(&self) -> &str {
        &self.message.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.message.payload
    }

    /// 1 on first delivery, incremented on every redelivery.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn decode<E: DeserializeOwned>(&self) -> Result<E, BusError> {
        Ok(serde_json::from_slice(&self.message.payload)?)
    }

    pub fn ack(mut self) {
        self.settle(Settlement::Ack);
    }

    pub fn nack(mut self) {
        self.settle(Settlement::Nack);
    }

    fn settle(&mut self, settlement: Settlement) {
        if self.settled {
            return;
        }
        self.settled = true;
        self.acker.settle(&self.message, self.attempt, settlement);
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.settle(Settlement::Nack);
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("topic", &self.message.topic)
            .field("key", &self.message.key)
            .field("attempt", &self.attempt)
            .field("payload_len", &self.message.payload.len())
            .finish()
    }
}

/// Backend side of a [`Subscription`].
#[async_trait]
pub trait DeliveryStream: Send {
    /// Next delivery, or `None` once the bus is closed.
    async fn next(&mut self) -> Option<Delivery>;
}

/// A consumer group membership on one topic.
pub struct Subscription {
    topic: String,
    group: String,
    inner: Box<dyn DeliveryStream>,
}

impl Subscription {
    pub fn new(
        topic: impl Into<String>,
        group: impl Into<String>,
        inner: Box<dyn DeliveryStream>,
    ) -> Self {
        Self {
            topic: topic.into(),
            group: group.into(),
            inner,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub async fn next(&mut self) -> Option<Delivery> {
        self.inner.next().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u32, Settlement)>>);

    impl Acknowledger for Recorder {
        fn settle(&self, _message: &Message, attempt: u32, settlement: Settlement) {
            self.0.lock().unwrap().push((attempt, settlement));
        }
    }

    fn delivery(acker: &Arc<Recorder>) -> Delivery {
        let message = Message {
            topic: "t".into(),
            key: "k".into(),
            payload: Bytes::from_static(br#"{"a":1}"#),
        };
        Delivery::new(message, 1, acker.clone())
    }

    #[test]
    fn ack_settles_once() {
        let acker = Arc::new(Recorder::default());
        delivery(&acker).ack();
        assert_eq!(*acker.0.lock().unwrap(), vec![(1, Settlement::Ack)]);
    }

    #[test]
    fn drop_counts_as_nack() {
        let acker = Arc::new(Recorder::default());
        drop(delivery(&acker));
        assert_eq!(*acker.0.lock().unwrap(), vec![(1, Settlement::Nack)]);
    }

    #[test]
    fn decode_json_payload() {
        #[derive(serde::Deserialize)]
        struct A {
            a: u32,
        }
        let acker = Arc::new(Recorder::default());
        let d = delivery(&acker);
        assert_eq!(d.decode::<A>().unwrap().a, 1);
        assert!(matches!(
            d.decode::<Vec<u8>>(),
            Err(BusError::Codec(_))
        ));
        d.ack();
    }
}
