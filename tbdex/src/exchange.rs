//! One negotiation between Alice and a PFI, from RFQ to close.
//!
//! The exchange holds no lock; callers serialize mutations per exchange id.

use crate::{
    definitions::{MessageKind, parse_timestamp},
    message::{AnyMessage, Close, Order, OrderStatus, Quote, Rfq},
};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("{id}: {kind} is not a valid next message")]
    InvalidNext { id: String, kind: MessageKind },
    #[error("{id}: protocol version {found} does not match exchange protocol version {expected}")]
    ProtocolMismatch {
        id: String,
        expected: String,
        found: String,
    },
    #[error("{id}: exchange id {found} does not match exchange {expected}")]
    ExchangeIdMismatch {
        id: String,
        expected: String,
        found: String,
    },
    #[error("{id}: invalid createdAt '{created_at}'")]
    InvalidTimestamp { id: String, created_at: String },
}

/// The messages of one exchange, one slot per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    pub rfq: Option<Rfq>,
    pub quote: Option<Quote>,
    pub order: Option<Order>,
    pub order_statuses: Vec<OrderStatus>,
    pub close: Option<Close>,
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an exchange from messages in any order
    pub fn from_messages(messages: Vec<AnyMessage>) -> Result<Self, ExchangeError> {
        let mut exchange = Self::new();
        exchange.add_messages(messages)?;

        Ok(exchange)
    }

    /// Add a batch of messages in `createdAt` order.
    ///
    /// The batch is applied all-or-nothing: if any message is rejected the
    /// exchange is left as it was.
    pub fn add_messages(&mut self, messages: Vec<AnyMessage>) -> Result<(), ExchangeError> {
        let mut keyed = Vec::with_capacity(messages.len());
        for message in messages {
            let created_at = parse_timestamp(&message.metadata().created_at).map_err(|_| {
                ExchangeError::InvalidTimestamp {
                    id: message.id().to_string(),
                    created_at: message.metadata().created_at.clone(),
                }
            })?;
            keyed.push((created_at, message));
        }

        // stable, so equal timestamps keep their input order
        keyed.sort_by_key(|(created_at, _)| *created_at);

        let mut scratch = self.clone();
        for (_, message) in keyed {
            scratch.add_next_message(message)?;
        }
        *self = scratch;

        Ok(())
    }

    /// Add the message that follows the latest one in this exchange
    pub fn add_next_message(&mut self, message: impl Into<AnyMessage>) -> Result<(), ExchangeError> {
        let message = message.into();
        let metadata = message.metadata();

        if let Some(expected) = self.protocol() {
            if metadata.protocol != expected {
                return Err(ExchangeError::ProtocolMismatch {
                    id: metadata.id.clone(),
                    expected: expected.to_string(),
                    found: metadata.protocol.clone(),
                });
            }
        }

        // an rfq names the exchange after itself
        if message.kind() == MessageKind::Rfq && metadata.exchange_id != metadata.id {
            return Err(ExchangeError::ExchangeIdMismatch {
                id: metadata.id.clone(),
                expected: metadata.id.clone(),
                found: metadata.exchange_id.clone(),
            });
        }

        if let Some(expected) = self.exchange_id() {
            if metadata.exchange_id != expected {
                return Err(ExchangeError::ExchangeIdMismatch {
                    id: metadata.id.clone(),
                    expected: expected.to_string(),
                    found: metadata.exchange_id.clone(),
                });
            }
        }

        if !self.is_valid_next(message.kind()) {
            tracing::debug!(
                "rejected {} {} in exchange {}",
                message.kind(),
                message.id(),
                message.exchange_id()
            );
            return Err(ExchangeError::InvalidNext {
                id: metadata.id.clone(),
                kind: message.kind(),
            });
        }

        tracing::trace!("exchange {} accepted {}", message.exchange_id(), message.id());

        match message {
            AnyMessage::Rfq(rfq) => self.rfq = Some(rfq),
            AnyMessage::Quote(quote) => self.quote = Some(quote),
            AnyMessage::Order(order) => self.order = Some(order),
            AnyMessage::OrderStatus(order_status) => self.order_statuses.push(order_status),
            AnyMessage::Close(close) => self.close = Some(close),
        }

        Ok(())
    }

    /// Whether a message of `kind` may be added next. An empty exchange
    /// only accepts an RFQ.
    pub fn is_valid_next(&self, kind: MessageKind) -> bool {
        match self.latest_kind() {
            Some(latest) => latest.valid_next().contains(&kind),
            None => kind == MessageKind::Rfq,
        }
    }

    /// The messages in protocol order: rfq, quote, order, every order
    /// status in arrival order, close
    pub fn messages(&self) -> Vec<AnyMessage> {
        let mut messages = Vec::with_capacity(4 + self.order_statuses.len());

        messages.extend(self.rfq.clone().map(AnyMessage::from));
        messages.extend(self.quote.clone().map(AnyMessage::from));
        messages.extend(self.order.clone().map(AnyMessage::from));
        messages.extend(self.order_statuses.iter().cloned().map(AnyMessage::from));
        messages.extend(self.close.clone().map(AnyMessage::from));

        messages
    }

    /// The latest message by protocol position, not by timestamp:
    /// close, then the last order status, then order, quote and rfq.
    /// Sequencing is enforced on insert, so protocol position is monotonic.
    pub fn latest_message(&self) -> Option<AnyMessage> {
        if let Some(close) = &self.close {
            return Some(close.clone().into());
        }
        if let Some(order_status) = self.order_statuses.last() {
            return Some(order_status.clone().into());
        }
        if let Some(order) = &self.order {
            return Some(order.clone().into());
        }
        if let Some(quote) = &self.quote {
            return Some(quote.clone().into());
        }

        self.rfq.clone().map(AnyMessage::from)
    }

    fn latest_kind(&self) -> Option<MessageKind> {
        if self.close.is_some() {
            Some(MessageKind::Close)
        } else if !self.order_statuses.is_empty() {
            Some(MessageKind::OrderStatus)
        } else if self.order.is_some() {
            Some(MessageKind::Order)
        } else if self.quote.is_some() {
            Some(MessageKind::Quote)
        } else if self.rfq.is_some() {
            Some(MessageKind::Rfq)
        } else {
            None
        }
    }

    /// The exchange id, taken from the first message present
    pub fn exchange_id(&self) -> Option<&str> {
        self.first_metadata()
            .map(|metadata| metadata.exchange_id.as_str())
    }

    /// The protocol version fixed by the first message present
    pub fn protocol(&self) -> Option<&str> {
        self.first_metadata().map(|metadata| metadata.protocol.as_str())
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }

    fn first_metadata(&self) -> Option<&crate::message::MessageMetadata> {
        self.rfq
            .as_ref()
            .map(|message| message.metadata())
            .or_else(|| self.quote.as_ref().map(|message| message.metadata()))
            .or_else(|| self.order.as_ref().map(|message| message.metadata()))
            .or_else(|| self.order_statuses.first().map(|message| message.metadata()))
            .or_else(|| self.close.as_ref().map(|message| message.metadata()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::Algorithm,
        dev_tools::{self, generate_party},
        did::BearerDid,
        message::Message,
    };

    struct Parties {
        alice: BearerDid,
        pfi: BearerDid,
    }

    fn parties() -> Parties {
        Parties {
            alice: generate_party(Algorithm::EdDsa).unwrap(),
            pfi: generate_party(Algorithm::Es256k).unwrap(),
        }
    }

    fn at<D>(mut message: Message<D>, second: u32) -> Message<D> {
        message.metadata_mut().created_at = format!("2024-01-01T00:00:{second:02}.000Z");
        message
    }

    fn rfq_quote_order(parties: &Parties) -> (Rfq, Quote, Order) {
        let offering = dev_tools::create_offering(&parties.pfi).unwrap();
        let rfq = dev_tools::create_rfq(&parties.alice, &offering, vec![]).unwrap();
        let quote = dev_tools::create_quote(&parties.pfi, &rfq).unwrap();
        let order = dev_tools::create_order(&parties.alice, &rfq).unwrap();

        (at(rfq, 1), at(quote, 2), at(order, 3))
    }

    #[test]
    fn empty_exchange_accepts_only_rfq() {
        let parties = parties();
        let (rfq, quote, _) = rfq_quote_order(&parties);

        let mut exchange = Exchange::new();
        assert!(exchange.latest_message().is_none());
        assert!(exchange.exchange_id().is_none());

        let err = exchange.add_next_message(quote.clone()).unwrap_err();
        assert!(err.to_string().contains("not a valid next message"));
        assert_eq!(
            err,
            ExchangeError::InvalidNext {
                id: quote.metadata().id.clone(),
                kind: MessageKind::Quote
            }
        );
        assert_eq!(exchange, Exchange::new());

        exchange.add_next_message(rfq.clone()).unwrap();
        assert_eq!(exchange.exchange_id(), Some(rfq.metadata().id.as_str()));
        assert_eq!(exchange.protocol(), Some("1.0"));
    }

    #[test]
    fn linear_sequence() {
        let parties = parties();
        let (rfq, quote, order) = rfq_quote_order(&parties);

        let mut exchange = Exchange::new();
        exchange.add_next_message(rfq.clone()).unwrap();
        assert!(exchange.add_next_message(rfq.clone()).is_err());
        exchange.add_next_message(quote).unwrap();
        exchange.add_next_message(order.clone()).unwrap();

        assert_eq!(exchange.order, Some(order.clone()));
        assert_eq!(exchange.latest_message(), Some(order.into()));
        assert!(exchange.is_valid_next(MessageKind::OrderStatus));
        assert!(!exchange.is_valid_next(MessageKind::Close));

        for status in ["PAYIN_PENDING", "PAYOUT_SETTLED"] {
            let order_status = dev_tools::create_order_status(&parties.pfi, &rfq, status).unwrap();
            exchange.add_next_message(order_status).unwrap();
        }

        assert_eq!(exchange.order_statuses.len(), 2);
        assert_eq!(
            exchange.latest_message().unwrap().id(),
            exchange.order_statuses[1].metadata().id
        );
        assert!(exchange.is_valid_next(MessageKind::Close));
    }

    #[test]
    fn close_is_terminal() {
        let parties = parties();
        let (rfq, quote, order) = rfq_quote_order(&parties);

        let mut exchange = Exchange::new();
        exchange.add_next_message(rfq.clone()).unwrap();
        exchange
            .add_next_message(dev_tools::create_close(&parties.pfi, &rfq, Some("no liquidity")).unwrap())
            .unwrap();
        assert!(exchange.is_closed());

        let order_status = dev_tools::create_order_status(&parties.pfi, &rfq, "PAYIN_PENDING").unwrap();
        let another_close = dev_tools::create_close(&parties.alice, &rfq, None).unwrap();

        let attempts: Vec<AnyMessage> = vec![
            rfq.into(),
            quote.into(),
            order.into(),
            order_status.into(),
            another_close.into(),
        ];
        for message in attempts {
            assert!(matches!(
                exchange.add_next_message(message),
                Err(ExchangeError::InvalidNext { .. })
            ));
        }
        assert_eq!(exchange.messages().len(), 2);
    }

    #[test]
    fn exchange_id_and_protocol_consistency() {
        let parties = parties();
        let (rfq, _, _) = rfq_quote_order(&parties);
        let (other_rfq, other_quote, _) = rfq_quote_order(&parties);

        let mut exchange = Exchange::new();
        exchange.add_next_message(rfq.clone()).unwrap();

        assert!(matches!(
            exchange.add_next_message(other_quote),
            Err(ExchangeError::ExchangeIdMismatch { id, .. }) if id.starts_with("quote_")
        ));

        let mut quote = dev_tools::create_quote(&parties.pfi, &rfq).unwrap();
        quote.metadata_mut().protocol = "2.0".to_string();
        assert!(matches!(
            exchange.add_next_message(quote),
            Err(ExchangeError::ProtocolMismatch { expected, found, .. }) if expected == "1.0" && found == "2.0"
        ));

        // the protocol check comes before sequencing
        let mut second_rfq = other_rfq;
        second_rfq.metadata_mut().protocol = "2.0".to_string();
        assert!(matches!(
            exchange.add_next_message(second_rfq),
            Err(ExchangeError::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn rfq_must_name_its_own_exchange() {
        let parties = parties();
        let (mut rfq, _, _) = rfq_quote_order(&parties);
        rfq.metadata_mut().exchange_id = "rfq_someoneelse".to_string();

        let mut exchange = Exchange::new();
        assert!(matches!(
            exchange.add_next_message(rfq),
            Err(ExchangeError::ExchangeIdMismatch { found, .. }) if found == "rfq_someoneelse"
        ));
        assert_eq!(exchange.exchange_id(), None);
    }

    #[test]
    fn batch_order_does_not_matter() {
        let parties = parties();
        let (rfq, quote, order) = rfq_quote_order(&parties);

        let mut expected = Exchange::new();
        expected.add_next_message(rfq.clone()).unwrap();
        expected.add_next_message(quote.clone()).unwrap();
        expected.add_next_message(order.clone()).unwrap();

        let messages: [AnyMessage; 3] = [rfq.into(), quote.into(), order.into()];
        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for permutation in permutations {
            let batch = permutation.iter().map(|&i| messages[i].clone()).collect();
            let exchange = Exchange::from_messages(batch).unwrap();

            assert_eq!(exchange.messages(), expected.messages());
            assert_eq!(exchange, expected);
        }
    }

    #[test]
    fn failed_batch_leaves_exchange_untouched() {
        let parties = parties();
        let (rfq, quote, _) = rfq_quote_order(&parties);
        let close = at(dev_tools::create_close(&parties.pfi, &rfq, None).unwrap(), 3);
        let late_quote = at(dev_tools::create_quote(&parties.pfi, &rfq).unwrap(), 4);

        let mut exchange = Exchange::new();
        exchange.add_next_message(rfq).unwrap();
        let before = exchange.clone();

        let err = exchange
            .add_messages(vec![late_quote.clone().into(), close.into(), quote.into()])
            .unwrap_err();

        assert_eq!(
            err,
            ExchangeError::InvalidNext {
                id: late_quote.metadata().id.clone(),
                kind: MessageKind::Quote
            }
        );
        assert_eq!(exchange, before);
    }

    #[test]
    fn unparseable_timestamp() {
        let parties = parties();
        let (mut rfq, _, _) = rfq_quote_order(&parties);
        rfq.metadata_mut().created_at = "yesterday".to_string();

        assert!(matches!(
            Exchange::from_messages(vec![rfq.into()]),
            Err(ExchangeError::InvalidTimestamp { created_at, .. }) if created_at == "yesterday"
        ));
    }
}
