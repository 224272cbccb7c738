use super::weapon::Weapon;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FiringStage {
    #[default]
    Idle,
    Prefire,
    Firing,
}

/// Per-character weapon cycle.
///
/// `hold` counts down the time the current stage must last. Only a prefire
/// can be abandoned before its hold elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FiringState {
    pub stage: FiringStage,
    pub hold: f32,
    pub shots_fired: u32,
}

impl FiringState {
    pub fn is_prefiring(&self) -> bool {
        self.stage == FiringStage::Prefire
    }

    /// Switching weapons is only allowed once the cycle has fully settled.
    pub fn can_switch(&self) -> bool {
        self.stage == FiringStage::Idle && self.hold <= 0.0
    }

    /// Advances by `dt` ms. Returns `true` when a bullet should spawn; at
    /// most one bullet per step.
    pub fn step(&mut self, weapon: &Weapon, wants_fire: bool, moving: bool, dt: f32) -> bool {
        self.hold = (self.hold - dt).max(0.0);
        let allowed = wants_fire && !(weapon.requires_stationary && moving);

        match self.stage {
            FiringStage::Idle => {
                if !allowed || self.hold > 0.0 {
                    return false;
                }
                if weapon.prefire > 0.0 {
                    self.stage = FiringStage::Prefire;
                    self.hold = weapon.prefire;
                    return false;
                }
                self.stage = FiringStage::Firing;
            }
            FiringStage::Prefire => {
                // Letting go or starting to move cancels the wind-up.
                if !allowed {
                    self.stage = FiringStage::Idle;
                    self.hold = 0.0;
                    return false;
                }
                if self.hold > 0.0 {
                    return false;
                }
                self.stage = FiringStage::Firing;
            }
            FiringStage::Firing => {}
        }

        self.fire(weapon, wants_fire)
    }

    fn fire(&mut self, weapon: &Weapon, wants_fire: bool) -> bool {
        self.stage = FiringStage::Idle;
        if !wants_fire {
            return false;
        }
        self.shots_fired += 1;
        // Last shot of the burst starts the reload instead of the shot delay.
        if self.shots_fired >= weapon.shots {
            self.shots_fired = 0;
            self.hold = weapon.reload;
        } else {
            self.hold = weapon.rate;
        }
        true
    }
}
