use serde::{Deserialize, Serialize};

/// Flat crit chance every character starts with, in percent.
pub const BASE_CRIT_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Intellect,
    Crit,
    Expertise,
    Haste,
    Spirit,
}

impl Stat {
    pub const ALL: [Stat; 5] = [
        Stat::Intellect,
        Stat::Crit,
        Stat::Expertise,
        Stat::Haste,
        Stat::Spirit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stat::Intellect => "intellect",
            Stat::Crit => "crit",
            Stat::Expertise => "expertise",
            Stat::Haste => "haste",
            Stat::Spirit => "spirit",
        }
    }
}

/// Per-point multipliers. Each hero archetype carries its own table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatCoefficients {
    pub intellect: f64,
    pub crit: f64,
    pub expertise: f64,
    pub haste: f64,
    pub spirit: f64,
}

/// Raw attribute points as invested by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatPoints {
    pub intellect: u32,
    pub crit: u32,
    pub expertise: u32,
    pub haste: u32,
    pub spirit: u32,
}

impl StatPoints {
    pub fn new(intellect: u32, crit: u32, expertise: u32, haste: u32, spirit: u32) -> Self {
        Self {
            intellect,
            crit,
            expertise,
            haste,
            spirit,
        }
    }

    pub fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Intellect => self.intellect,
            Stat::Crit => self.crit,
            Stat::Expertise => self.expertise,
            Stat::Haste => self.haste,
            Stat::Spirit => self.spirit,
        }
    }

    /// Copy with one dimension raised by `gain`, everything else untouched.
    pub fn with_gain(mut self, stat: Stat, gain: u32) -> Self {
        let slot = match stat {
            Stat::Intellect => &mut self.intellect,
            Stat::Crit => &mut self.crit,
            Stat::Expertise => &mut self.expertise,
            Stat::Haste => &mut self.haste,
            Stat::Spirit => &mut self.spirit,
        };
        *slot = slot.saturating_add(gain);
        self
    }
}

/// Combat-effective values. Everything except intellect is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedStats {
    pub intellect: f64,
    pub crit: f64,
    pub expertise: f64,
    pub haste: f64,
    pub spirit: f64,
}

impl DerivedStats {
    pub fn derive(points: StatPoints, coefficients: &StatCoefficients) -> Self {
        Self {
            intellect: points.intellect as f64 * coefficients.intellect,
            crit: points.crit as f64 * coefficients.crit + BASE_CRIT_PERCENT,
            expertise: points.expertise as f64 * coefficients.expertise,
            haste: points.haste as f64 * coefficients.haste,
            spirit: points.spirit as f64 * coefficients.spirit,
        }
    }
}

/// Points plus the values derived from them. The two are only ever
/// updated together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    coefficients: StatCoefficients,
    points: StatPoints,
    derived: DerivedStats,
}

impl Stats {
    pub fn new(points: StatPoints, coefficients: StatCoefficients) -> Self {
        Self {
            coefficients,
            points,
            derived: DerivedStats::derive(points, &coefficients),
        }
    }

    pub fn points(&self) -> StatPoints {
        self.points
    }

    pub fn derived(&self) -> &DerivedStats {
        &self.derived
    }

    pub fn coefficients(&self) -> &StatCoefficients {
        &self.coefficients
    }

    /// Replace all points and recompute every derived value from scratch.
    pub fn update(&mut self, points: StatPoints) {
        self.points = points;
        self.derived = DerivedStats::derive(points, &self.coefficients);
    }
}
