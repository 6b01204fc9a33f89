use serde::Serialize;
use strum::{Display, EnumString};

use super::super::MinerHardware;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum WhatsMinerModel {
    #[strum(to_string = "M32 V10", serialize = "M32V10")]
    M32V10,
    #[strum(to_string = "M32 V20", serialize = "M32V20")]
    M32V20,
}

impl WhatsMinerModel {
    pub fn hardware(&self) -> MinerHardware {
        let chips = match self {
            WhatsMinerModel::M32V10 => 78,
            WhatsMinerModel::M32V20 => 74,
        };
        MinerHardware {
            chips: Some(chips),
            fans: Some(2),
            boards: Some(3),
        }
    }
}
