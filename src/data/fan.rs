use measurements::AngularVelocity;

#[derive(Debug, Clone, PartialEq)]
pub struct FanData {
    /// The position or index of the fan as seen by the device
    /// Usually dependent on where to fan is connected to the control board
    pub position: i16,
    /// The RPM of the fan, `None` if the device reported a value that could not be read
    pub rpm: Option<AngularVelocity>,
}

impl FanData {
    pub fn new(position: i16, rpm: f64) -> Self {
        FanData {
            position,
            rpm: Some(AngularVelocity::from_rpm(rpm)),
        }
    }

    /// A fan that is known to exist but whose speed is unknown.
    pub fn unknown(position: i16) -> Self {
        FanData {
            position,
            rpm: None,
        }
    }
}
