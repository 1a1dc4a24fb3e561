use cputest_config::BoardConfig;
use serde::Serialize;

/// Clock sources a peripheral can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    Aclk,
    Smclk,
    /// External pin clock; never driven in simulation.
    External,
}

/// Board clock frequencies. Every peripheral ticks once per MCLK cycle and
/// derives its own source edges from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockTree {
    pub mclk_hz: u64,
    pub smclk_hz: u64,
    pub aclk_hz: u64,
}

impl Default for ClockTree {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for ClockTree {
    fn from(board: &BoardConfig) -> Self {
        Self {
            mclk_hz: board.mclk_hz,
            smclk_hz: board.smclk_hz,
            aclk_hz: board.aclk_hz,
        }
    }
}

impl ClockTree {
    pub fn hz(&self, source: ClockSource) -> u64 {
        match source {
            ClockSource::Aclk => self.aclk_hz,
            ClockSource::Smclk => self.smclk_hz,
            ClockSource::External => 0,
        }
    }
}

/// Converts MCLK cycles into edges of a slower source clock without drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EdgeDivider {
    phase: u64,
}

impl EdgeDivider {
    /// Advances one MCLK cycle; true when the source clock produced an edge.
    pub fn step(&mut self, clocks: &ClockTree, source: ClockSource) -> bool {
        let hz = clocks.hz(source);
        if hz == 0 || clocks.mclk_hz == 0 {
            return false;
        }
        self.phase += hz;
        if self.phase >= clocks.mclk_hz {
            self.phase -= clocks.mclk_hz;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }
}
