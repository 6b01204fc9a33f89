use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumString};

pub mod models;

use models::bitaxe::BitaxeModel;
use models::whatsminer::WhatsMinerModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum MinerMake {
    WhatsMiner,
    BitAxe,
}

/// The firmware family running on the control board.
/// This decides which web API the miner speaks, independent of the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MinerFirmware {
    Stock,
    #[strum(to_string = "ePIC", serialize = "epic")]
    EPic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum HashAlgorithm {
    SHA256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MinerModel {
    WhatsMiner(WhatsMinerModel),
    BitAxe(BitaxeModel),
}

impl MinerModel {
    pub fn make(&self) -> MinerMake {
        match self {
            MinerModel::WhatsMiner(_) => MinerMake::WhatsMiner,
            MinerModel::BitAxe(_) => MinerMake::BitAxe,
        }
    }

    pub fn hardware(&self) -> MinerHardware {
        match self {
            MinerModel::WhatsMiner(m) => m.hardware(),
            MinerModel::BitAxe(m) => m.hardware(),
        }
    }
}

impl fmt::Display for MinerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinerModel::WhatsMiner(m) => write!(f, "{}", m),
            MinerModel::BitAxe(m) => write!(f, "{}", m),
        }
    }
}

impl FromStr for MinerModel {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WhatsMinerModel::from_str(s)
            .map(MinerModel::WhatsMiner)
            .or_else(|_| BitaxeModel::from_str(s).map(MinerModel::BitAxe))
    }
}

/// Static capability metadata for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinerHardware {
    /// Expected number of chips on each hashboard
    pub chips: Option<u16>,
    /// Expected number of fans
    pub fans: Option<u8>,
    /// Expected number of hashboards
    pub boards: Option<u8>,
}

/// Identity of one device. Set once at construction and never changed by collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub make: MinerMake,
    pub model: MinerModel,
    pub firmware: MinerFirmware,
    pub algo: HashAlgorithm,
    pub hardware: MinerHardware,
}

impl DeviceInfo {
    pub fn new(model: MinerModel, firmware: MinerFirmware, algo: HashAlgorithm) -> Self {
        DeviceInfo {
            make: model.make(),
            model,
            firmware,
            algo,
            hardware: model.hardware(),
        }
    }

    pub fn expected_hashboards(&self) -> u8 {
        self.hardware.boards.unwrap_or_default()
    }

    pub fn expected_chips(&self) -> Option<u16> {
        self.hardware.chips
    }

    pub fn expected_fans(&self) -> Option<u8> {
        self.hardware.fans
    }
}
