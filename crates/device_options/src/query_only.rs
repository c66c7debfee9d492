//! Query-only option
//!
//! No local cache: every read goes through the control channel.

use std::sync::Arc;

use contracts::{ContractError, OptionHandle, OptionId};

use crate::control::ControlChannel;

/// Option that can only be read with a live query
pub struct QueryOnlyOption {
    option_id: OptionId,
    channel: Arc<dyn ControlChannel>,
}

impl QueryOnlyOption {
    pub fn new(option_id: OptionId, channel: Arc<dyn ControlChannel>) -> Self {
        Self { option_id, channel }
    }
}

impl OptionHandle for QueryOnlyOption {
    fn option_id(&self) -> &OptionId {
        &self.option_id
    }

    fn query(&self) -> Result<f32, ContractError> {
        self.channel.query_option(&self.option_id)
    }
}
