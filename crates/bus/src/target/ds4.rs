//! DualShock 4 wired target

use super::{PrepareError, TargetIdentity, hardware_id};

/// Length of the USB input report, report ID included
pub const DS4_REPORT_LEN: usize = 64;

const DS4_REPORT_ID: u8 = 0x01;
const STICK_CENTER: u8 = 0x80;
const DPAD_RELEASED: u8 = 0x08;

#[derive(Debug)]
pub struct Ds4Target {
    identity: TargetIdentity,
    hardware_id: Option<String>,
    report: Option<[u8; DS4_REPORT_LEN]>,
}

impl Ds4Target {
    pub fn new(identity: TargetIdentity) -> Self {
        Self {
            identity,
            hardware_id: None,
            report: None,
        }
    }

    pub fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    /// Build the hardware ID and the neutral input report
    pub fn prepare(&mut self) -> Result<(), PrepareError> {
        if self.report.is_some() {
            return Err(PrepareError::AlreadyPrepared);
        }

        self.hardware_id = Some(hardware_id(self.identity.ids));
        self.report = Some(neutral_report());
        Ok(())
    }

    pub fn hardware_id(&self) -> Option<&str> {
        self.hardware_id.as_deref()
    }

    /// Current input report, once prepared
    pub fn input_report(&self) -> Option<&[u8; DS4_REPORT_LEN]> {
        self.report.as_ref()
    }
}

/// Sticks centered, d-pad released, no buttons or triggers
fn neutral_report() -> [u8; DS4_REPORT_LEN] {
    let mut report = [0u8; DS4_REPORT_LEN];
    report[0] = DS4_REPORT_ID;
    report[1..5].fill(STICK_CENTER);
    report[5] = DPAD_RELEASED;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{DUALSHOCK4_WIRED_IDS, SerialNo, SessionId};

    fn target() -> Ds4Target {
        Ds4Target::new(TargetIdentity {
            serial_no: SerialNo(4),
            session_id: SessionId(2),
            ids: DUALSHOCK4_WIRED_IDS,
        })
    }

    #[test]
    fn test_prepare_builds_neutral_report() {
        let mut t = target();
        assert!(t.input_report().is_none());

        t.prepare().unwrap();
        let report = t.input_report().unwrap();
        assert_eq!(report[0], 0x01);
        assert_eq!(&report[1..5], &[0x80; 4]);
        assert_eq!(report[5], 0x08);
        assert!(report[6..].iter().all(|&b| b == 0));
        assert_eq!(t.hardware_id(), Some("USB\\VID_054C&PID_05C4"));
    }

    #[test]
    fn test_prepare_twice() {
        let mut t = target();
        t.prepare().unwrap();
        assert_eq!(t.prepare(), Err(PrepareError::AlreadyPrepared));
    }
}
