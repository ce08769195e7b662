//! Per-leg configuration of a multi-stage class.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{LegType, Seconds, StartType};

use super::ClassError;

/// Configuration of one leg.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegInfo {
    pub start_type: StartType,
    pub leg_type: LegType,
    /// Start clock time, or a count, depending on [`LegInfo::start_type`].
    pub start_data: Seconds,
    pub restart_time: Option<Seconds>,
    pub rope_time: Option<Seconds>,
    /// Earlier leg run by the same physical runner.
    pub duplicate_runner: Option<usize>,
    #[serde(skip)]
    true_leg: usize,
    #[serde(skip)]
    sub_leg: Option<usize>,
}

impl LegInfo {
    /// Leg with the given types and no timing data.
    pub fn new(start_type: StartType, leg_type: LegType) -> Self {
        Self {
            start_type,
            leg_type,
            ..Self::default()
        }
    }

    /// 1-based true-leg number, valid after [`LegTable::apply`].
    pub fn true_leg(&self) -> usize {
        self.true_leg
    }

    /// 0-based sub-leg index within the true leg, `None` for the leg that
    /// opened it.
    pub fn sub_leg(&self) -> Option<usize> {
        self.sub_leg
    }
}

/// Ordered leg descriptors of one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegTable {
    legs: Vec<LegInfo>,
    changed: bool,
}

impl LegTable {
    /// Table with no legs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table built from descriptors; derived numbering is computed.
    pub fn from_legs(legs: Vec<LegInfo>) -> Self {
        let mut table = Self {
            legs,
            changed: false,
        };
        table.apply();
        table
    }

    /// Number of legs.
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// True when the class has no legs configured.
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// All descriptors in leg order.
    pub fn legs(&self) -> &[LegInfo] {
        &self.legs
    }

    /// Descriptor of `leg`.
    pub fn leg(&self, leg: usize) -> Option<&LegInfo> {
        self.legs.get(leg)
    }

    /// Grows with default legs or truncates to `n` legs.
    pub fn set_num_legs(&mut self, n: usize) {
        if n == self.legs.len() {
            return;
        }
        self.legs.resize_with(n, LegInfo::default);
        self.changed = true;
        self.apply();
    }

    /// Sets the leg type and renumbers.
    pub fn set_leg_type(&mut self, leg: usize, leg_type: LegType) -> Result<(), ClassError> {
        let info = self.leg_mut(leg)?;
        if info.leg_type != leg_type {
            info.leg_type = leg_type;
            self.changed = true;
            self.apply();
        }
        Ok(())
    }

    /// Sets the start type.
    pub fn set_start_type(&mut self, leg: usize, start_type: StartType) -> Result<(), ClassError> {
        let info = self.leg_mut(leg)?;
        if info.start_type != start_type {
            info.start_type = start_type;
            self.changed = true;
        }
        Ok(())
    }

    /// Sets the start data (clock time or count).
    pub fn set_start_data(&mut self, leg: usize, start_data: Seconds) -> Result<(), ClassError> {
        let info = self.leg_mut(leg)?;
        if info.start_data != start_data {
            info.start_data = start_data;
            self.changed = true;
        }
        Ok(())
    }

    /// Sets or clears the restart time.
    pub fn set_restart_time(&mut self, leg: usize, time: Option<Seconds>) -> Result<(), ClassError> {
        let info = self.leg_mut(leg)?;
        if info.restart_time != time {
            info.restart_time = time;
            self.changed = true;
        }
        Ok(())
    }

    /// Sets or clears the rope time.
    pub fn set_rope_time(&mut self, leg: usize, time: Option<Seconds>) -> Result<(), ClassError> {
        let info = self.leg_mut(leg)?;
        if info.rope_time != time {
            info.rope_time = time;
            self.changed = true;
        }
        Ok(())
    }

    /// Start type of `leg`.
    pub fn start_type(&self, leg: usize) -> Option<StartType> {
        self.legs.get(leg).map(|l| l.start_type)
    }

    /// Leg type of `leg`.
    pub fn leg_type(&self, leg: usize) -> Option<LegType> {
        self.legs.get(leg).map(|l| l.leg_type)
    }

    /// Start data of `leg`.
    pub fn start_data(&self, leg: usize) -> Option<Seconds> {
        self.legs.get(leg).map(|l| l.start_data)
    }

    /// Restart time of `leg`.
    pub fn restart_time(&self, leg: usize) -> Option<Seconds> {
        self.legs.get(leg).and_then(|l| l.restart_time)
    }

    /// Rope time of `leg`.
    pub fn rope_time(&self, leg: usize) -> Option<Seconds> {
        self.legs.get(leg).and_then(|l| l.rope_time)
    }

    /// 1-based true-leg number of `leg`.
    pub fn true_leg(&self, leg: usize) -> Option<usize> {
        self.legs.get(leg).map(|l| l.true_leg)
    }

    /// Sub-leg letter of `leg`, `None` for legs opening a true leg.
    pub fn sub_leg_letter(&self, leg: usize) -> Option<char> {
        self.legs
            .get(leg)?
            .sub_leg
            .map(|sub| char::from(b'a' + (sub % 26) as u8))
    }

    /// Display label such as `"1"`, `"1a"` or `"2"`.
    pub fn label(&self, leg: usize) -> Option<String> {
        let true_leg = self.true_leg(leg)?;
        Some(match self.sub_leg_letter(leg) {
            Some(letter) => format!("{true_leg}{letter}"),
            None => true_leg.to_string(),
        })
    }

    /// Legs belonging to the same true leg as `leg`, in order.
    pub fn true_leg_members(&self, leg: usize) -> std::ops::Range<usize> {
        let Some(true_leg) = self.true_leg(leg) else {
            return 0..0;
        };
        let first = self
            .legs
            .iter()
            .position(|l| l.true_leg == true_leg)
            .unwrap_or(leg);
        let end = self.legs[first..]
            .iter()
            .position(|l| l.true_leg != true_leg)
            .map_or(self.legs.len(), |offset| first + offset);
        first..end
    }

    /// Links `leg` to the earlier leg `target` so both are run by the same
    /// physical runner. `None` removes the link.
    pub fn link_duplicate_runner(&mut self, leg: usize, target: Option<usize>) -> Result<(), ClassError> {
        self.leg_mut(leg)?;
        let resolved = match target {
            Some(t) if t >= leg => return Err(ClassError::InvalidRunnerLink { leg, target: t }),
            Some(t) => Some(self.legs[t].duplicate_runner.unwrap_or(t)),
            None => None,
        };
        if self.legs[leg].duplicate_runner != resolved {
            self.legs[leg].duplicate_runner = resolved;
            self.changed = true;
            self.apply();
        }
        Ok(())
    }

    /// Leg whose runner also runs `leg`; `leg` itself when unlinked.
    pub fn runner_defining_leg(&self, leg: usize) -> Option<usize> {
        self.legs.get(leg).map(|l| l.duplicate_runner.unwrap_or(leg))
    }

    /// Checks that parallel legs with a change-over or pursuit start agree
    /// with the start type of the leg they run alongside.
    ///
    /// Non-strict: offending legs are reset to a drawn start and returned.
    /// Strict: the first offending leg is reported and nothing is changed.
    pub fn check_start_method(&mut self, strict: bool) -> Result<Vec<usize>, ClassError> {
        let offending = self.start_method_conflicts();
        if offending.is_empty() {
            return Ok(offending);
        }
        if strict {
            return Err(ClassError::InconsistentStartMethod { leg: offending[0] });
        }
        for &leg in &offending {
            warn!(leg, from = ?self.legs[leg].start_type, "parallel leg start reset to drawn lot");
            self.legs[leg].start_type = StartType::DrawnLot;
        }
        self.changed = true;
        Ok(offending)
    }

    /// Recomputes true-leg numbering and normalizes duplicate-runner links.
    pub fn apply(&mut self) {
        let mut true_leg = 0;
        let mut next_sub = 0;
        for info in &mut self.legs {
            if info.leg_type.opens_true_leg() || true_leg == 0 {
                true_leg += 1;
                next_sub = 0;
                info.sub_leg = None;
            } else {
                info.sub_leg = Some(next_sub);
                next_sub += 1;
            }
            info.true_leg = true_leg;
        }

        for k in 0..self.legs.len() {
            let Some(target) = self.legs[k].duplicate_runner else {
                continue;
            };
            if target >= k {
                warn!(leg = k, target, "duplicate runner link must point to an earlier leg; reset");
                self.legs[k].duplicate_runner = None;
                self.changed = true;
            } else if let Some(root) = self.legs[target].duplicate_runner {
                self.legs[k].duplicate_runner = Some(root);
            }
        }
    }

    /// True when any field changed since the last [`LegTable::take_changed`].
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Returns and clears the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn start_method_conflicts(&self) -> Vec<usize> {
        let mut current = StartType::FixedClock;
        let mut out = Vec::new();
        for (idx, info) in self.legs.iter().enumerate() {
            if !info.leg_type.is_parallel() {
                current = info.start_type;
            } else if matches!(info.start_type, StartType::MassChange | StartType::Pursuit)
                && info.start_type != current
            {
                out.push(idx);
            }
        }
        out
    }

    fn leg_mut(&mut self, leg: usize) -> Result<&mut LegInfo, ClassError> {
        let legs = self.legs.len();
        self.legs
            .get_mut(leg)
            .ok_or(ClassError::LegOutOfRange { leg, legs })
    }
}
