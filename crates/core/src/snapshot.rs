use cputest_config::StopReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct MachineSnapshot {
    pub cycles: u64,
    pub gie: bool,
    pub interrupts: u64,
    pub stop_reason: Option<StopReason>,
    pub peripherals: HashMap<String, serde_json::Value>,
}
