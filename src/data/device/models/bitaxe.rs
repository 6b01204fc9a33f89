use serde::Serialize;
use strum::{Display, EnumString};

use super::super::MinerHardware;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BitaxeModel {
    Supra,
    Gamma,
    Max,
    Ultra,
}

impl BitaxeModel {
    pub fn hardware(&self) -> MinerHardware {
        // Every BitAxe is a single-chip, single-fan board.
        MinerHardware {
            chips: Some(1),
            fans: Some(1),
            boards: Some(1),
        }
    }
}
