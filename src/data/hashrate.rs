use measurements::Power;
use std::ops::Div;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashRateUnit {
    Hash,
    KiloHash,
    MegaHash,
    GigaHash,
    TeraHash,
    PetaHash,
    ExaHash,
}

impl HashRateUnit {
    /// Number of hashes per second represented by one of this unit.
    fn multiplier(self) -> f64 {
        match self {
            HashRateUnit::Hash => 1.0,
            HashRateUnit::KiloHash => 1e3,
            HashRateUnit::MegaHash => 1e6,
            HashRateUnit::GigaHash => 1e9,
            HashRateUnit::TeraHash => 1e12,
            HashRateUnit::PetaHash => 1e15,
            HashRateUnit::ExaHash => 1e18,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashRate {
    /// The current amount of hashes being computed
    pub value: f64,
    /// The unit of the hashes in value
    pub unit: HashRateUnit,
    /// The algorithm of the computed hashes
    pub algo: String,
}

impl HashRate {
    /// A SHA256 hashrate in TH/s.
    pub fn terahash(value: f64) -> Self {
        HashRate {
            value,
            unit: HashRateUnit::TeraHash,
            algo: String::from("SHA256"),
        }
    }

    /// Convert this hashrate into another unit, keeping the algorithm.
    pub fn as_unit(&self, unit: HashRateUnit) -> HashRate {
        HashRate {
            value: self.value * self.unit.multiplier() / unit.multiplier(),
            unit,
            algo: self.algo.clone(),
        }
    }
}

/// Round to two decimal places, the precision every family reports hashrate at.
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Efficiency in W/TH.
impl Div<HashRate> for Power {
    type Output = f64;

    fn div(self, hash_rate: HashRate) -> Self::Output {
        self.as_watts() / hash_rate.as_unit(HashRateUnit::TeraHash).value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_units() {
        let hr = HashRate {
            value: 480.0,
            unit: HashRateUnit::GigaHash,
            algo: "SHA256".into(),
        };
        let th = hr.as_unit(HashRateUnit::TeraHash);
        assert!((th.value - 0.48).abs() < 1e-9);
        assert_eq!(th.unit, HashRateUnit::TeraHash);
    }

    #[test]
    fn efficiency_is_watts_per_terahash() {
        let eff = Power::from_watts(3000.0) / HashRate::terahash(100.0);
        assert!((eff - 30.0).abs() < 1e-9);
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round_2(95.123456), 95.12);
        assert_eq!(round_2(0.005), 0.01);
    }
}
