use crate::data::device::{MinerFirmware, MinerModel};
use crate::miners::api::ApiError;
use crate::miners::backends::epic::EPic;
use crate::miners::backends::espminer::ESPMiner;
use crate::miners::backends::traits::Miner;
use crate::settings::ClientSettings;
use std::net::IpAddr;

pub mod api;
pub mod backends;
pub mod collector;
pub mod data;

/// Build the backend for a known model and firmware.
///
/// Returns `Ok(None)` when no backend speaks that firmware on that hardware.
pub fn get_miner(
    ip: IpAddr,
    model: MinerModel,
    firmware: MinerFirmware,
    settings: &ClientSettings,
) -> Result<Option<Box<dyn Miner>>, ApiError> {
    let miner: Box<dyn Miner> = match (firmware, model) {
        (MinerFirmware::EPic, MinerModel::WhatsMiner(_)) => {
            Box::new(EPic::new(ip, model, settings)?)
        }
        (MinerFirmware::Stock, MinerModel::BitAxe(_)) => {
            Box::new(ESPMiner::new(ip, model, settings)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(miner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::device::models::bitaxe::BitaxeModel;
    use crate::data::device::models::whatsminer::WhatsMinerModel;

    #[test]
    fn picks_backend_by_firmware_and_hardware() {
        let ip = IpAddr::from([192, 168, 1, 10]);
        let settings = ClientSettings::default();

        let epic = get_miner(
            ip,
            MinerModel::WhatsMiner(WhatsMinerModel::M32V20),
            MinerFirmware::EPic,
            &settings,
        )
        .unwrap()
        .unwrap();
        assert_eq!(epic.device_info().firmware, MinerFirmware::EPic);
        assert_eq!(epic.device_info().expected_chips(), Some(74));

        let bitaxe = get_miner(
            ip,
            MinerModel::BitAxe(BitaxeModel::Ultra),
            MinerFirmware::Stock,
            &settings,
        )
        .unwrap()
        .unwrap();
        assert_eq!(bitaxe.ip(), ip);

        let unknown = get_miner(
            ip,
            MinerModel::BitAxe(BitaxeModel::Max),
            MinerFirmware::EPic,
            &settings,
        )
        .unwrap();
        assert!(unknown.is_none());
    }
}
