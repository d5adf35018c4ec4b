//! Kafka protocol client implementation.

mod client;
pub mod groups;
mod metadata;

pub use client::KafkaClient;
pub use groups::{
    commit_offsets, describe_groups, fetch_offsets, find_coordinator, list_groups,
    CommittedOffset, ConsumerGroup, ConsumerGroupDescription, ConsumerGroupMember, Coordinator,
};
pub use metadata::{fetch_brokers, BrokerAddress};
