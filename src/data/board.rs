use super::hashrate::HashRate;
use measurements::Temperature;

#[derive(Debug, Clone, PartialEq)]
pub struct BoardData {
    /// The board position in the miner, indexed from 0
    pub position: u8,
    /// The current hashrate of the board
    pub hashrate: Option<HashRate>,
    /// The board temperature, also sometimes called PCB temperature
    pub board_temperature: Option<Temperature>,
    /// The expected number of chips on this board
    pub expected_chips: Option<u16>,
    /// The number of working chips on this board
    pub working_chips: Option<u16>,
    /// Whether this slot was expected but the board did not report
    pub missing: bool,
}

impl BoardData {
    /// An expected slot that has not reported any data.
    pub fn missing(position: u8, expected_chips: Option<u16>) -> Self {
        BoardData {
            position,
            hashrate: None,
            board_temperature: None,
            expected_chips,
            working_chips: None,
            missing: true,
        }
    }
}
