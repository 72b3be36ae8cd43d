// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! One-shot capability negotiation after the link opens.

use tracing::{debug, info, warn};

use crate::radio::freq::{range_for, step_for};
use crate::rig::command::RigCommand;
use crate::rig::param::{ParamSet, Parameter};
use crate::rig::state::{Acquired, Capabilities};
use crate::rig::{DriverCaps, RigDriver};

/// Outcome of probing a freshly opened driver.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub capabilities: Capabilities,
    pub acquired: Acquired,
    /// Contradictions between the descriptor and observed behavior.
    pub defects: Vec<(Option<RigCommand>, String)>,
}

/// Work out what the driver can do and take an initial snapshot.
///
/// Never fails: a parameter that cannot be read keeps its default value
/// (power defaults to ON).
pub async fn probe(driver: &mut dyn RigDriver) -> ProbeReport {
    let caps = driver.capabilities().clone();
    let mut defects = Vec::new();

    let mut write = ParamSet::empty();
    for param in caps.supported_set.iter() {
        if param.is_settable() {
            write.insert(param);
        } else {
            defects.push((
                Some(RigCommand::Set(param)),
                "driver advertises SET for a read-only parameter".to_string(),
            ));
        }
    }
    let capabilities = Capabilities {
        read: caps.supported_get,
        write,
    };

    let vfo_used = caps.can_get(Parameter::Vfo)
        || caps.can_set(Parameter::Vfo)
        || caps.can_get(Parameter::SplitFrequency)
        || caps.can_set(Parameter::SplitFrequency);
    if vfo_used && caps.vfo_list.is_empty() {
        defects.push((
            None,
            "VFO access advertised but the VFO list is empty".to_string(),
        ));
    }

    let mut acquired = Acquired {
        rit_max: caps.max_rit,
        xit_max: caps.max_xit,
        rit_step: if caps.rit_step > 0 { caps.rit_step } else { 10 },
        ..Acquired::default()
    };

    let mut freq_read = false;
    for param in Parameter::ALL {
        if !capabilities.read.contains(param) {
            continue;
        }
        let cmd = RigCommand::Get(param);
        let vfo = if param.targets_other_vfo() {
            match acquired.vfo.and_then(|v| v.other()) {
                Some(other) => Some(other),
                None => {
                    defects.push((Some(cmd), "no VFO to address".to_string()));
                    continue;
                }
            }
        } else {
            None
        };

        match driver.get(param, vfo).await {
            Ok(value) => {
                if acquired.apply(param, value.clone()) {
                    debug!("Probe {}: {:?}", cmd, value);
                    freq_read |= param == Parameter::Frequency;
                } else {
                    defects.push((Some(cmd), format!("returned {:?}", value)));
                }
            }
            Err(e) => {
                debug!("Probe {} failed, keeping {:?}: {}", cmd, acquired.value(param), e);
            }
        }
    }

    // Without a frequency reading there is nothing to look up.
    if !update_derived(&mut acquired, &caps) && freq_read {
        defects.push((
            None,
            format!(
                "no frequency range covers {} in {:?}",
                acquired.freq, acquired.mode
            ),
        ));
    }

    info!(
        "Probed {} {}: {} readable, {} writable",
        driver.info().manufacturer,
        driver.info().model,
        capabilities.read.len(),
        capabilities.write.len()
    );
    if !defects.is_empty() {
        warn!("Probe found {} likely driver bug(s)", defects.len());
    }

    ProbeReport {
        capabilities,
        acquired,
        defects,
    }
}

/// Refresh the fields derived from the range table entry matching the
/// current frequency and mode. Returns false when no entry matches, in
/// which case the derived fields are left untouched.
pub(crate) fn update_derived(acquired: &mut Acquired, caps: &DriverCaps) -> bool {
    let Some(range) = range_for(&caps.rx_ranges, acquired.freq, &acquired.mode) else {
        return false;
    };
    acquired.freq_min = range.start;
    acquired.freq_max = range.end;
    acquired.modes = range.modes;
    acquired.freq_step = step_for(&caps.tuning_steps, &acquired.mode).unwrap_or(1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::freq::Freq;
    use crate::rig::controller::mock::MockDriver;
    use crate::rig::param::{ParamValue, PowerStatus, Vfo, VfoSet};
    use crate::rig::state::{ModeSet, RigMode};

    #[tokio::test]
    async fn test_capabilities_from_descriptor() {
        let (mut driver, _handle) = MockDriver::new(
            &[Parameter::Frequency, Parameter::Ptt],
            &[Parameter::Frequency, Parameter::Ptt],
        );
        let report = probe(&mut driver).await;
        assert_eq!(
            report.capabilities.read,
            ParamSet::from([Parameter::Frequency, Parameter::Ptt])
        );
        assert_eq!(report.capabilities.write, report.capabilities.read);
        assert_eq!(report.acquired.freq, Freq::new(14_074_000));
    }

    #[tokio::test]
    async fn test_unreadable_power_defaults_on() {
        let (mut driver, handle) = MockDriver::new(&[Parameter::Power], &[Parameter::Power]);
        handle.set_value(Parameter::Power, ParamValue::Power(PowerStatus::Off));
        handle.fail_get(Parameter::Power);
        let report = probe(&mut driver).await;
        assert_eq!(report.acquired.power, PowerStatus::On);
    }

    #[tokio::test]
    async fn test_read_only_set_is_a_defect() {
        let (mut driver, _handle) = MockDriver::new(&[Parameter::Swr], &[Parameter::Swr]);
        let report = probe(&mut driver).await;
        assert!(report.capabilities.write.is_empty());
        assert_eq!(report.defects[0].0, Some(RigCommand::Set(Parameter::Swr)));
    }

    #[tokio::test]
    async fn test_missing_range_is_not_fatal() {
        let (mut driver, handle) = MockDriver::new(&[Parameter::Frequency], &[]);
        handle.set_value(Parameter::Frequency, ParamValue::Freq(Freq::new(5)));
        let report = probe(&mut driver).await;
        assert_eq!(report.acquired.freq, Freq::new(5));
        assert!(report
            .defects
            .iter()
            .any(|(_, reason)| reason.contains("no frequency range")));
    }

    #[tokio::test]
    async fn test_no_range_lookup_without_frequency() {
        let (mut driver, _handle) = MockDriver::new(&[Parameter::Ptt], &[Parameter::Ptt]);
        let report = probe(&mut driver).await;
        assert!(report.defects.is_empty(), "{:?}", report.defects);
    }

    #[tokio::test]
    async fn test_no_range_lookup_when_frequency_read_fails() {
        let params = &[Parameter::Power, Parameter::Frequency, Parameter::Ptt];
        let (mut driver, handle) = MockDriver::new(params, params);
        handle.set_value(Parameter::Power, ParamValue::Power(PowerStatus::Off));
        handle.fail_get(Parameter::Frequency);

        let report = probe(&mut driver).await;
        assert!(report.defects.is_empty(), "{:?}", report.defects);
        assert_eq!(report.acquired.power, PowerStatus::Off);
        assert!(report.capabilities.read.contains(Parameter::Frequency));
    }

    #[tokio::test]
    async fn test_derived_fields_follow_mode() {
        let (mut driver, handle) =
            MockDriver::new(&[Parameter::Frequency, Parameter::Mode], &[]);
        handle.set_value(
            Parameter::Mode,
            ParamValue::Mode {
                mode: RigMode::FM,
                passband_hz: 15_000,
            },
        );
        handle.set_value(Parameter::Frequency, ParamValue::Freq(Freq::new(145_500_000)));
        let report = probe(&mut driver).await;
        assert!(report.defects.is_empty(), "{:?}", report.defects);
        assert_eq!(report.acquired.freq_min, Freq::new(144_000_000));
        assert_eq!(report.acquired.freq_step, 12_500);
        assert!(report.acquired.modes.contains(ModeSet::FM));
        assert_eq!(report.acquired.passband_hz, 15_000);
    }

    #[tokio::test]
    async fn test_split_freq_targets_other_vfo() {
        let (mut driver, handle) =
            MockDriver::new(&[Parameter::Vfo, Parameter::SplitFrequency], &[]);
        handle.set_value(Parameter::Vfo, ParamValue::Vfo(Vfo::A));
        let report = probe(&mut driver).await;
        assert_eq!(
            handle.vfo_args(),
            vec![(RigCommand::Get(Parameter::SplitFrequency), Some(Vfo::B))]
        );
        assert_eq!(report.acquired.vfo, Some(Vfo::A));
    }

    #[tokio::test]
    async fn test_empty_vfo_list_is_a_defect() {
        let (mut driver, _handle) = MockDriver::new(&[Parameter::Vfo], &[]);
        driver.caps_mut().vfo_list = VfoSet::empty();
        let report = probe(&mut driver).await;
        assert!(report
            .defects
            .iter()
            .any(|(_, reason)| reason.contains("VFO list is empty")));
    }
}
