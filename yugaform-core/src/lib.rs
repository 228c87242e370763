//! Yugaform Core
//!
//! Resource model, attribute schemas, planning and the apply engine for a
//! declarative YugabyteDB Anywhere adapter. Providers plug in through the
//! [`provider::Provider`] and [`provider::ResourceType`] traits.

pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
