use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};

use crate::device::SimInventory;
use crate::facade::Capability;

pub const GET_SIM_CARDS_ACTION: &str = "getSimCards";

/// `getSimCards`: one entry per slot, numbered from 1.
pub struct SimCards {
    sims: Arc<dyn SimInventory>,
}

impl SimCards {
    pub fn new(sims: Arc<dyn SimInventory>) -> Self {
        Self { sims }
    }
}

#[async_trait]
impl Capability for SimCards {
    type Request = ();

    const NAME: &'static str = "sim_cards";
    const RIGHTS: &'static [PermissionRight] = &[PermissionRight::ReadPhoneState];

    fn handles(&self, action: &str) -> bool {
        action == GET_SIM_CARDS_ACTION
    }

    fn parse(&self, _call: &MethodCall) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn execute(&self, _request: ()) -> Reply {
        let cards = (0..self.sims.sim_count())
            .map(|index| -> Result<Value, BridgeError> {
                let slot = self.sims.sim_slot(index)?;
                Ok(json!({
                    "slot": index + 1,
                    "imei": slot.imei,
                    "state": slot.state,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Payload::Value(cards.into()))
    }
}
